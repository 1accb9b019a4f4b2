use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Category a document is indexed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    File,
    Folder,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::File, DocumentType::Folder];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::File => "file",
            DocumentType::Folder => "folder",
        }
    }

    /// Parses the type name recorded by the index, if it is one we know.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "file" => Some(DocumentType::File),
            "folder" => Some(DocumentType::Folder),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute/value/unit triple attached to an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadatum {
    #[serde(default, deserialize_with = "null_as_default")]
    pub attribute: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
}

impl Metadatum {
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
            unit: unit.into(),
        }
    }
}

/// Access level granted to a user. The catalog emits unrecognized levels as
/// `null`; a level the index holds that is not one of these is kept verbatim
/// in [`Permission::Other`], which never equals a catalog value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    Own,
    Other(String),
}

impl Permission {
    pub fn as_str(&self) -> &str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Own => "own",
            Permission::Other(name) => name,
        }
    }
}

impl From<String> for Permission {
    fn from(name: String) -> Self {
        match name.as_str() {
            "read" => Permission::Read,
            "write" => Permission::Write,
            "own" => Permission::Own,
            _ => Permission::Other(name),
        }
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Permission::from)
    }
}

/// A `user#zone` and the access it holds on an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPermission {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default)]
    pub permission: Option<Permission>,
}

impl UserPermission {
    pub fn new(user: impl Into<String>, permission: Option<Permission>) -> Self {
        Self {
            user: user.into(),
            permission,
        }
    }
}

/// Denormalized view of a catalog file or folder, as stored in the index.
///
/// Field names are fixed by the index mapping. Missing or `null` fields read as
/// their zero value, so a projected document and an indexed one compare the
/// same whether a value was omitted or explicitly null.
///
/// Equality treats `metadata` and `user_permissions` as sets: order is ignored
/// and duplicate entries collapse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creator: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_modified: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_size: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Vec<Metadatum>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_permissions: Vec<UserPermission>,
}

impl PartialEq for IndexedDocument {
    fn eq(&self, other: &Self) -> bool {
        // User-modifiable fields, most likely to differ first
        if self.date_modified != other.date_modified
            || self.file_size != other.file_size
            || self.path != other.path
            || self.label != other.label
        {
            return false;
        }

        // Fields which shouldn't change for the same object
        if self.id != other.id
            || self.creator != other.creator
            || self.file_type != other.file_type
            || self.date_created != other.date_created
        {
            return false;
        }

        set_equal(&self.metadata, &other.metadata)
            && set_equal(&self.user_permissions, &other.user_permissions)
    }
}

impl Eq for IndexedDocument {}

fn set_equal<T: Eq + Hash>(one: &[T], two: &[T]) -> bool {
    let one: HashSet<&T> = one.iter().collect();
    let two: HashSet<&T> = two.iter().collect();
    one == two
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> IndexedDocument {
        IndexedDocument {
            id: "0f7e3c52-8d1a-11e8-9a2b-0242ac110002".to_string(),
            path: "/zone/home/alice/data.csv".to_string(),
            label: "data.csv".to_string(),
            creator: "alice#zone".to_string(),
            file_type: "generic".to_string(),
            date_created: 1_500_000_000_000,
            date_modified: 1_500_000_100_000,
            file_size: 4096,
            metadata: vec![
                Metadatum::new("color", "blue", ""),
                Metadatum::new("depth", "12", "m"),
                Metadatum::new("site", "north", ""),
            ],
            user_permissions: vec![
                UserPermission::new("alice#zone", Some(Permission::Own)),
                UserPermission::new("bob#zone", Some(Permission::Read)),
            ],
        }
    }

    #[test]
    fn equality_is_reflexive_and_symmetric() {
        let a = sample();
        let b = sample();
        assert!(a == a);
        assert!(a == b);
        assert!(b == a);
    }

    #[test]
    fn reordering_set_fields_keeps_documents_equal() {
        let a = sample();
        let mut b = sample();
        b.metadata.reverse();
        b.user_permissions.reverse();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_entries_collapse() {
        let a = sample();
        let mut b = sample();
        b.metadata.push(Metadatum::new("color", "blue", ""));
        assert_eq!(a, b);
    }

    #[test]
    fn any_scalar_change_breaks_equality() {
        let base = sample();
        let mutations: Vec<(&str, fn(&mut IndexedDocument))> = vec![
            ("dateModified", |d| d.date_modified += 1),
            ("fileSize", |d| d.file_size += 1),
            ("path", |d| d.path.push('x')),
            ("label", |d| d.label.push('x')),
            ("id", |d| d.id = "1".to_string()),
            ("creator", |d| d.creator = "carol#zone".to_string()),
            ("fileType", |d| d.file_type = "csv".to_string()),
            ("dateCreated", |d| d.date_created -= 1),
        ];
        for (field, mutate) in mutations {
            let mut changed = sample();
            mutate(&mut changed);
            assert!(base != changed, "changing {field} should break equality");
            assert!(changed != base, "changing {field} should break equality");
        }
    }

    #[test]
    fn set_membership_changes_break_equality() {
        let base = sample();

        let mut fewer = sample();
        fewer.metadata.pop();
        assert!(base != fewer);

        let mut unit_changed = sample();
        unit_changed.metadata[1].unit = "ft".to_string();
        assert!(base != unit_changed);

        let mut downgraded = sample();
        downgraded.user_permissions[0].permission = Some(Permission::Write);
        assert!(base != downgraded);
    }

    #[test]
    fn nulls_and_missing_fields_read_as_zero_values() {
        let doc: IndexedDocument = serde_json::from_value(json!({
            "id": "abc",
            "path": "/zone/home",
            "label": null,
            "fileType": null,
            "dateCreated": 10,
            "metadata": [{"attribute": "a", "value": "v", "unit": null}],
            "userPermissions": [{"user": "bob#zone", "permission": null}],
            "someOtherField": true
        }))
        .expect("document should deserialize");

        assert_eq!(doc.label, "");
        assert_eq!(doc.file_size, 0);
        assert_eq!(doc.metadata, vec![Metadatum::new("a", "v", "")]);
        assert_eq!(
            doc.user_permissions,
            vec![UserPermission::new("bob#zone", None)]
        );
    }

    #[test]
    fn unknown_permission_levels_are_kept_and_never_match() {
        let doc: IndexedDocument = serde_json::from_value(json!({
            "id": "abc",
            "userPermissions": [{"user": "bob#zone", "permission": "modify"}]
        }))
        .expect("document should deserialize");

        let kept = Some(Permission::Other("modify".to_string()));
        assert_eq!(doc.user_permissions[0].permission, kept);

        let mut from_catalog = doc.clone();
        from_catalog.user_permissions[0].permission = None;
        assert!(doc != from_catalog);

        let value = serde_json::to_value(&doc).expect("document should serialize");
        assert_eq!(value["userPermissions"][0]["permission"], json!("modify"));
    }

    #[test]
    fn null_arrays_equal_empty_arrays() {
        let from_nulls: IndexedDocument =
            serde_json::from_value(json!({"id": "x", "metadata": null, "userPermissions": null}))
                .expect("document should deserialize");
        let from_empty: IndexedDocument =
            serde_json::from_value(json!({"id": "x", "metadata": [], "userPermissions": []}))
                .expect("document should deserialize");
        assert_eq!(from_nulls, from_empty);
    }

    #[test]
    fn serializes_with_index_field_names() {
        let value = serde_json::to_value(sample()).expect("document should serialize");
        let object = value.as_object().expect("document is an object");
        for key in [
            "id",
            "path",
            "label",
            "creator",
            "fileType",
            "dateCreated",
            "dateModified",
            "fileSize",
            "metadata",
            "userPermissions",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(value["userPermissions"][0]["permission"], json!("own"));
    }

    #[test]
    fn document_type_names() {
        assert_eq!(DocumentType::from_name("file"), Some(DocumentType::File));
        assert_eq!(DocumentType::from_name("folder"), Some(DocumentType::Folder));
        assert_eq!(DocumentType::from_name("_doc"), None);
        assert_eq!(DocumentType::Folder.to_string(), "folder");
    }
}
