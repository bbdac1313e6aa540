use crate::domain::model::CampusEntry;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BUILTIN_CAMPUSES: &str = include_str!("campuses.toml");

/// Recipients as written in configuration: one address or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Normalizes to a list; an empty single string means nobody.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::One(address) if address.trim().is_empty() => Vec::new(),
            Recipients::One(address) => vec![address],
            Recipients::Many(addresses) => addresses
                .into_iter()
                .filter(|a| !a.trim().is_empty())
                .collect(),
        }
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

/// One `[[campuses]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusRecord {
    pub name: String,
    #[serde(default)]
    pub recipients: Recipients,
    #[serde(default)]
    pub folder_id: String,
}

#[derive(Debug, Deserialize)]
struct CampusFile {
    #[serde(default)]
    campuses: Vec<CampusRecord>,
}

/// Immutable campus lookup, keyed by lower-cased campus name.
#[derive(Debug, Clone, Default)]
pub struct CampusDirectory {
    entries: HashMap<String, CampusEntry>,
}

impl CampusDirectory {
    pub fn new(records: Vec<CampusRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| {
                let entry = CampusEntry {
                    recipients: record.recipients.into_vec(),
                    folder_id: record.folder_id,
                };
                (record.name.to_lowercase(), entry)
            })
            .collect();
        Self { entries }
    }

    /// The directory embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Self::builtin_records()?))
    }

    pub fn builtin_records() -> Result<Vec<CampusRecord>> {
        let file: CampusFile = toml::from_str(BUILTIN_CAMPUSES)?;
        Ok(file.campuses)
    }

    /// Matches on the lower-cased name only; surrounding whitespace is part of
    /// the name. Unknown or empty names resolve to an empty entry, never an error.
    pub fn resolve(&self, campus: &str) -> CampusEntry {
        self.entries
            .get(&campus.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
