//! Types exchanged with the external translation service.

use std::collections::BTreeMap;

use crate::block::TextBlock;

/// A block reduced to what the translator sees.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockPayload {
    pub id: usize,
    pub text: String,
}

impl From<&TextBlock> for BlockPayload {
    fn from(block: &TextBlock) -> Self {
        Self {
            id: block.id,
            text: block.text.clone(),
        }
    }
}

/// The per-page unit sent to the translator.
///
/// `previous_pages` and `next_pages` are plain text supplied as context
/// only; they are never translated themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranslationRequest {
    pub page: usize,
    pub target_language: String,
    pub blocks: Vec<BlockPayload>,
    pub previous_pages: Vec<String>,
    pub next_pages: Vec<String>,
}

/// Translated text keyed by block id.
///
/// Ids absent from the map have no translation. An empty result signals
/// total failure for the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranslationResult {
    entries: BTreeMap<usize, String>,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a translation. Blank text is treated as no translation.
    pub fn insert(&mut self, id: usize, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.entries.insert(id, text);
        }
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(id, t)| (*id, t.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for TranslationResult {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        let mut result = TranslationResult::new();
        for (id, text) in iter {
            result.insert(id, text);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_entries_are_dropped() {
        let result: TranslationResult =
            [(0, "Bonjour"), (1, "   "), (2, "")].into_iter().collect();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0), Some("Bonjour"));
        assert_eq!(result.get(1), None);
    }

    #[test]
    fn iteration_is_in_id_order() {
        let result: TranslationResult = [(2, "c"), (0, "a"), (1, "b")].into_iter().collect();
        let ids: Vec<usize> = result.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn default_is_empty() {
        assert!(TranslationResult::default().is_empty());
    }
}
