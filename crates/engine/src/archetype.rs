use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Template for spawnable item entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemArchetypeDef {
    pub name: String,
    #[serde(default)]
    pub sprite: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchetypeError {
    #[error("duplicate archetype name: {name}")]
    DuplicateName { name: String },
}

/// Name-keyed archetype lookup.
#[derive(Debug, Default)]
pub struct ArchetypeDatabase {
    archetypes: Vec<ItemArchetypeDef>,
    by_name: HashMap<String, usize>,
}

impl ArchetypeDatabase {
    pub fn from_defs(defs: Vec<ItemArchetypeDef>) -> Result<Self, ArchetypeError> {
        let mut database = Self::default();
        for def in defs {
            if database.by_name.contains_key(&def.name) {
                return Err(ArchetypeError::DuplicateName { name: def.name });
            }
            database.by_name.insert(def.name.clone(), database.archetypes.len());
            database.archetypes.push(def);
        }
        Ok(database)
    }

    pub fn get(&self, name: &str) -> Option<&ItemArchetypeDef> {
        self.by_name.get(name).map(|index| &self.archetypes[*index])
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
