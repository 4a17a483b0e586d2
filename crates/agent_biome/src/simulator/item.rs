//! Inert items that live in exactly one container at a time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::IdentityError;
use super::identity::compute_item_id;
use super::types::ItemId;

/// An inert object. Not `Clone`: moving an item between a cell
/// and an inventory slot is a remove followed by an insert.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        properties: BTreeMap<String, Value>,
    ) -> Result<Self, IdentityError> {
        let name = name.into();
        let id = compute_item_id(&name, weight, &properties)?;
        Ok(Self {
            id,
            name,
            weight,
            properties,
        })
    }

    /// An item without properties.
    pub fn plain(name: impl Into<String>, weight: f64) -> Result<Self, IdentityError> {
        Self::new(name, weight, BTreeMap::new())
    }
}

/// Remove the first item with `item_id` from `items`, preserving order.
pub(crate) fn take_by_id(items: &mut Vec<Item>, item_id: &str) -> Option<Item> {
    let index = items.iter().position(|item| item.id == item_id)?;
    Some(items.remove(index))
}
