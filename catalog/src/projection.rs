//! SQL for the relations a read scope derives from the iRODS catalog schema.
//!
//! Each relation is a temporary table that lives only as long as the scope's
//! transaction. They are built in [`Relation::ALL`] order; later relations read
//! from earlier ones, and the per-kind row queries read from all of them.

use crate::scope::ObjectKind;

/// Metadata attribute holding an object's UUID.
pub const UUID_ATTRIBUTE: &str = "ipc_UUID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Metadata rows whose UUID value matches the prefix. Can include stale
    /// metadata no object points to any more.
    BaseObjectUuids,
    /// Objects carrying one of those UUIDs.
    ObjectUuids,
    /// Aggregated `user#zone` permissions per object.
    ObjectPerms,
    /// Aggregated metadata per object, without the UUID attribute.
    ObjectMetadata,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::BaseObjectUuids,
        Relation::ObjectUuids,
        Relation::ObjectPerms,
        Relation::ObjectMetadata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Relation::BaseObjectUuids => "base_object_uuids",
            Relation::ObjectUuids => "object_uuids",
            Relation::ObjectPerms => "object_perms",
            Relation::ObjectMetadata => "object_metadata",
        }
    }

    /// Statements that create and fill the relation. A `$1` placeholder, if
    /// present, takes the prefix.
    pub fn statements(self) -> &'static [&'static str] {
        match self {
            Relation::BaseObjectUuids => &[
                "CREATE TEMPORARY TABLE base_object_uuids (meta_id bigint NOT NULL, id text NOT NULL) ON COMMIT DROP",
                r#"
INSERT INTO base_object_uuids (meta_id, id)
SELECT meta.meta_id, lower(meta.meta_attr_value)
  FROM r_meta_main meta
 WHERE meta.meta_attr_name = 'ipc_UUID'
   AND lower(meta.meta_attr_value) LIKE lower($1) || '%'
"#,
            ],
            Relation::ObjectUuids => &[r#"
CREATE TEMPORARY TABLE object_uuids ON COMMIT DROP AS
SELECT map.object_id AS object_id, meta.id
  FROM r_objt_metamap map
  JOIN base_object_uuids meta ON map.meta_id = meta.meta_id
"#],
            Relation::ObjectPerms => &[r#"
CREATE TEMPORARY TABLE object_perms ON COMMIT DROP AS
SELECT a.object_id,
       json_agg(json_build_object(
                  'user', u.user_name || '#' || u.zone_name,
                  'permission', CASE a.access_type_id
                                  WHEN 1050 THEN 'read'
                                  WHEN 1120 THEN 'write'
                                  WHEN 1200 THEN 'own'
                                END)
                ORDER BY u.user_name, u.zone_name) AS user_permissions
  FROM r_objt_access a
  JOIN r_user_main u ON a.user_id = u.user_id
 WHERE a.object_id IN (SELECT object_id FROM object_uuids)
 GROUP BY a.object_id
"#],
            Relation::ObjectMetadata => &[r#"
CREATE TEMPORARY TABLE object_metadata ON COMMIT DROP AS
SELECT map.object_id,
       json_agg(json_build_object(
                  'attribute', m.meta_attr_name,
                  'value', m.meta_attr_value,
                  'unit', m.meta_attr_unit)
                ORDER BY m.meta_attr_name, m.meta_attr_value, m.meta_attr_unit) AS metadata
  FROM r_objt_metamap map
  JOIN r_meta_main m ON map.meta_id = m.meta_id
 WHERE m.meta_attr_name <> 'ipc_UUID'
   AND map.object_id IN (SELECT object_id FROM object_uuids)
 GROUP BY map.object_id
"#],
        }
    }

    /// Whether the relation's statements take the prefix as `$1`.
    pub fn binds_prefix(self) -> bool {
        self.statements().iter().any(|sql| sql.contains("$1"))
    }
}

/// Query producing `(id, document)` rows for one kind of object. Dates are
/// epoch milliseconds. Data objects with several replicas yield one row.
pub fn row_query(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::DataObject => {
            r#"
SELECT DISTINCT ON (d.data_id)
       ids.id,
       json_build_object(
         'id', ids.id,
         'path', c.coll_name || '/' || d.data_name,
         'label', d.data_name,
         'creator', d.data_owner_name || '#' || d.data_owner_zone,
         'fileType', d.data_type_name,
         'dateCreated', cast(d.create_ts AS bigint) * 1000,
         'dateModified', cast(d.modify_ts AS bigint) * 1000,
         'fileSize', d.data_size,
         'metadata', coalesce(meta.metadata, '[]'::json),
         'userPermissions', coalesce(perms.user_permissions, '[]'::json)
       )::text
  FROM object_uuids ids
  JOIN r_data_main d ON ids.object_id = d.data_id
  JOIN r_coll_main c ON d.coll_id = c.coll_id
  LEFT JOIN object_metadata meta ON meta.object_id = ids.object_id
  LEFT JOIN object_perms perms ON perms.object_id = ids.object_id
 ORDER BY d.data_id, d.data_repl_num
"#
        }
        ObjectKind::Collection => {
            r#"
SELECT DISTINCT ON (c.coll_id)
       ids.id,
       json_build_object(
         'id', ids.id,
         'path', c.coll_name,
         'label', regexp_replace(c.coll_name, '.*/', ''),
         'creator', c.coll_owner_name || '#' || c.coll_owner_zone,
         'fileType', ''::text,
         'dateCreated', cast(c.create_ts AS bigint) * 1000,
         'dateModified', cast(c.modify_ts AS bigint) * 1000,
         'fileSize', 0::bigint,
         'metadata', coalesce(meta.metadata, '[]'::json),
         'userPermissions', coalesce(perms.user_permissions, '[]'::json)
       )::text
  FROM object_uuids ids
  JOIN r_coll_main c ON ids.object_id = c.coll_id
  LEFT JOIN object_metadata meta ON meta.object_id = ids.object_id
  LEFT JOIN object_perms perms ON perms.object_id = ids.object_id
 ORDER BY c.coll_id
"#
        }
    }
}
