//! Participants: people, organizations, locations, resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Properties;
use crate::types::EntityId;

/// A participant record. The type is free-form; properties are never validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changes applied by an entity update.
///
/// Keys in `properties` are merged into the stored map; a JSON `null` removes the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub entity_type: Option<String>,
    pub properties: Properties,
}

impl EntityPatch {
    /// Applies the property part of the patch to an existing map.
    pub fn merge_into(&self, target: &mut Properties) {
        for (key, value) in &self.properties {
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
