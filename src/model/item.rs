use std::fmt;

use glam::Vec3;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::EngineError;

/// Stable identifier of a dataset record (and of the item built from it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque reference to something the scene collaborator draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// One dataset row, fields kept in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: ItemId,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<ItemId>, fields: IndexMap<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Build a record from a JSON object, taking its id from `id_field`.
    pub fn from_value(value: Value, id_field: &str) -> Result<Self, EngineError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(EngineError::Dataset(format!("expected an object, got `{other}`"))),
        };

        let id = match map.get(id_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(EngineError::Dataset(format!(
                    "field `{id_field}` must be a non-empty string or a number, got `{other}`"
                )))
            }
            None => return Err(EngineError::Dataset(format!("record without `{id_field}` field"))),
        };

        Ok(Self::new(id, map.into_iter().collect()))
    }

    /// Parse a JSON array of row objects. Duplicate ids are rejected.
    pub fn list_from_json(json: &str, id_field: &str) -> Result<Vec<Self>, EngineError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| EngineError::Dataset(format!("malformed JSON: {e}")))?;
        let Value::Array(rows) = value else {
            return Err(EngineError::Dataset("expected a JSON array of records".to_string()));
        };

        let mut seen = std::collections::HashSet::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Self::from_value(row, id_field)?;
            if !seen.insert(record.id.clone()) {
                return Err(EngineError::Dataset(format!("duplicate id `{}`", record.id)));
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// A record's spatial representation in the scene.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub position: Vec3,
    pub visual: VisualHandle,
    pub record: Record,
    pub(crate) highlighted: bool,
}

impl Item {
    pub fn new(record: Record, position: Vec3, visual: VisualHandle) -> Self {
        Self {
            id: record.id.clone(),
            position,
            visual,
            record,
            highlighted: false,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }
}

/// Registered items in insertion order. That order is the collision tie-break.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: IndexMap<ItemId, Item>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning the one it replaced (if any).
    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id.clone(), item)
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        self.items.shift_remove(id)
    }

    pub fn take_all(&mut self) -> Vec<Item> {
        self.items.drain(..).map(|(_, item)| item).collect()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_are_stringified_and_field_order_kept() {
        let records = Record::list_from_json(
            r#"[{"id": 7, "name": "seven", "area": 12.5}, {"id": "b", "zeta": 1, "alpha": 2}]"#,
            "id",
        )
        .expect("valid dataset");

        assert_eq!(records[0].id, ItemId::new("7"));
        assert_eq!(records[0].field("name"), Some(&Value::from("seven")));
        let keys: Vec<_> = records[1].fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "zeta", "alpha"]);
    }

    #[test]
    fn missing_or_duplicate_ids_are_rejected() {
        assert!(matches!(
            Record::list_from_json(r#"[{"name": "x"}]"#, "id"),
            Err(EngineError::Dataset(_))
        ));
        assert!(matches!(
            Record::list_from_json(r#"[{"id": 1}, {"id": "1"}]"#, "id"),
            Err(EngineError::Dataset(_))
        ));
        assert!(matches!(
            Record::list_from_json(r#"{"id": 1}"#, "id"),
            Err(EngineError::Dataset(_))
        ));
    }

    #[test]
    fn custom_id_field() {
        let records = Record::list_from_json(r#"[{"objectid": "A-1"}]"#, "objectid").unwrap();
        assert_eq!(records[0].id.as_str(), "A-1");
    }

    #[test]
    fn registry_keeps_insertion_order_after_removal() {
        let mut registry = ItemRegistry::new();
        for (n, id) in ["a", "b", "c"].into_iter().enumerate() {
            let record = Record::new(id, IndexMap::new());
            registry.insert(Item::new(record, Vec3::ZERO, VisualHandle(n as u64)));
        }
        registry.remove(&ItemId::new("b"));

        let ids: Vec<_> = registry.ids().map(ItemId::as_str).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
