// THEORY:
// A `Zone` is one key of the shadow keyboard. Its identity is its ordinal
// position; the label (a note name such as "C#") is only for people and for
// mapping the zone to an output. The `ZoneTable` is built once from the ordered
// label list and never changes afterwards, so every per-frame structure can be a
// dense `Vec` indexed by `ZoneId` and nothing hashes strings on the hot path.

use crate::error::ShadowError;
use std::collections::HashMap;

pub type ZoneId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: ZoneId,
    pub label: String,
}

/// The ordered, immutable set of zones for a session.
#[derive(Debug, Clone)]
pub struct ZoneTable {
    zones: Vec<Zone>,
    by_label: HashMap<String, ZoneId>,
}

impl ZoneTable {
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, ShadowError> {
        if labels.is_empty() {
            return Err(ShadowError::InvalidConfig(
                "at least one zone label is required".to_string(),
            ));
        }

        let mut zones = Vec::with_capacity(labels.len());
        let mut by_label = HashMap::with_capacity(labels.len());
        for (id, label) in labels.iter().map(AsRef::as_ref).enumerate() {
            if label.trim().is_empty() {
                return Err(ShadowError::InvalidConfig(format!(
                    "zone {id} has an empty label"
                )));
            }
            if by_label.insert(label.to_string(), id).is_some() {
                return Err(ShadowError::InvalidConfig(format!(
                    "duplicate zone label {label:?}"
                )));
            }
            zones.push(Zone {
                id,
                label: label.to_string(),
            });
        }

        Ok(Self { zones, by_label })
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id)
    }

    /// Ordinal of the zone carrying `label`, if any.
    pub fn lookup(&self, label: &str) -> Option<ZoneId> {
        self.by_label.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }
}
