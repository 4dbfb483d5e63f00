//! Actor record loader.
//!
//! Records are sparse: every field has a default and the Base Stage fills in
//! missing abilities and skills on the first derivation.

use std::path::Path;

use rules_core::ActorRecord;

use crate::loaders::{DataFormat, LoadResult, read_file};

/// Loader for [`ActorRecord`]s from JSON or RON files.
pub struct RecordLoader;

impl RecordLoader {
    pub fn load(path: &Path) -> LoadResult<ActorRecord> {
        let content = read_file(path)?;
        match DataFormat::from_path(path)? {
            DataFormat::Json => Self::from_json_str(&content),
            DataFormat::Ron => Self::from_ron_str(&content),
            DataFormat::Toml => {
                anyhow::bail!("Record {} must be JSON or RON", path.display())
            }
        }
    }

    pub fn from_json_str(content: &str) -> LoadResult<ActorRecord> {
        let record: ActorRecord = DataFormat::Json.parse(content, "record")?;
        Self::check(record)
    }

    pub fn from_ron_str(content: &str) -> LoadResult<ActorRecord> {
        let record: ActorRecord = DataFormat::Ron.parse(content, "record")?;
        Self::check(record)
    }

    /// Item ids must be unique; updates address items by id.
    fn check(record: ActorRecord) -> LoadResult<ActorRecord> {
        if record.id.is_empty() {
            anyhow::bail!("Record has no id");
        }
        let mut seen = std::collections::BTreeSet::new();
        for item in &record.items {
            if !seen.insert(&item.id) {
                anyhow::bail!("Record '{}' has duplicate item id '{}'", record.id, item.id);
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use rules_core::{ActorKind, ItemKind};

    use super::*;

    #[test]
    fn sparse_json_uses_defaults() {
        let record = RecordLoader::from_json_str(
            r#"{
                "id": "kira",
                "kind": "character",
                "items": [
                    {
                        "id": "scout",
                        "system": { "type": "class", "identifier": "scout", "levels": 3, "hitDie": 8 }
                    }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.kind, ActorKind::Character);
        assert!(record.abilities.is_empty());
        assert_eq!(record.items.len(), 1);
        let ItemKind::Class(class) = &record.items[0].system else {
            panic!("expected a class item");
        };
        assert_eq!(class.levels, 3);
        assert_eq!(class.hit_die, 8);
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let err = RecordLoader::from_json_str(
            r#"{ "id": "kira", "items": [ { "id": "a" }, { "id": "a" } ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate item id"));
    }

    #[test]
    fn missing_id_is_rejected() {
        assert!(RecordLoader::from_json_str("{}").is_err());
    }
}
