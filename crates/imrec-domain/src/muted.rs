//! Muted items: hard negative overrides supplied by the host application

use serde::{Deserialize, Serialize};

/// Kind of entity a mute applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutedItemKind {
    Author,
    Venue,
    Category,
}

/// One muted entry from the external mute list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutedItem {
    pub value: String,
    pub kind: MutedItemKind,
}

/// Muted entries grouped by kind, lowercased for exact matching
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutedItems {
    pub authors: Vec<String>,
    pub venues: Vec<String>,
    pub categories: Vec<String>,
}

impl MutedItems {
    /// Group a flat mute list by kind, lowercasing values
    pub fn from_items(items: &[MutedItem]) -> Self {
        let mut muted = MutedItems::default();
        for item in items {
            let value = item.value.to_lowercase();
            match item.kind {
                MutedItemKind::Author => muted.authors.push(value),
                MutedItemKind::Venue => muted.venues.push(value),
                MutedItemKind::Category => muted.categories.push(value),
            }
        }
        muted
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.venues.is_empty() && self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_items_groups_and_lowercases() {
        let items = vec![
            MutedItem {
                value: "Smith".to_string(),
                kind: MutedItemKind::Author,
            },
            MutedItem {
                value: "Nature".to_string(),
                kind: MutedItemKind::Venue,
            },
        ];
        let muted = MutedItems::from_items(&items);
        assert_eq!(muted.authors, vec!["smith"]);
        assert_eq!(muted.venues, vec!["nature"]);
        assert!(muted.categories.is_empty());
    }
}
