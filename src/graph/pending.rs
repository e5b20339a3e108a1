//! one2many fields waiting for the many2one they invert.

use std::collections::HashMap;

/// `(target, source, inverse_field)`
type BindingKey = (String, String, String);

/// Multimap of one2many field names keyed by where their many2one should live.
///
/// An entry `(target, source, field) -> [o2m, ...]` records that model
/// `source` declares one2many fields pointing at `target` whose inverse is
/// `target.field`, and that `target.field` has not been seen yet.
#[derive(Debug, Default)]
pub struct PendingBindings {
    entries: HashMap<BindingKey, Vec<String>>,
}

impl PendingBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `o2m_field`; a name already pending under the same key is ignored
    pub fn insert(&mut self, target: &str, source: &str, inverse_field: &str, o2m_field: &str) {
        let names = self
            .entries
            .entry((
                target.to_string(),
                source.to_string(),
                inverse_field.to_string(),
            ))
            .or_default();
        if !names.iter().any(|n| n == o2m_field) {
            names.push(o2m_field.to_string());
        }
    }

    /// Pending names for a key, without removing them
    pub fn get(&self, target: &str, source: &str, inverse_field: &str) -> Option<&[String]> {
        self.entries
            .get(&(
                target.to_string(),
                source.to_string(),
                inverse_field.to_string(),
            ))
            .map(Vec::as_slice)
    }

    /// Remove and return every name pending under the key, in insertion order
    pub fn drain(&mut self, target: &str, source: &str, inverse_field: &str) -> Vec<String> {
        self.entries
            .remove(&(
                target.to_string(),
                source.to_string(),
                inverse_field.to_string(),
            ))
            .unwrap_or_default()
    }

    /// Number of pending field names across all keys
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leftover entries as `(target, source, inverse_field, names)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &[String])> + '_ {
        self.entries
            .iter()
            .map(|((t, s, f), names)| (t.as_str(), s.as_str(), f.as_str(), names.as_slice()))
    }
}
