//! Candidate document representation

use serde::{Deserialize, Serialize};

/// A candidate document as seen by the recommendation engine.
///
/// Documents are owned by an external store; this is the read-only
/// projection carrying exactly the metadata that scoring needs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Author family names, in publication order
    pub authors: Vec<String>,
    /// Journal or conference name
    pub venue: Option<String>,
    pub year: Option<i32>,
    /// Category tags (arXiv primary class, user tags)
    pub tags: Vec<String>,
    pub citation_count: i32,
    pub abstract_text: Option<String>,
    /// Whether the user has starred this document
    pub starred: bool,
    /// Whether this document matched a saved smart search
    pub in_smart_search: bool,
    /// Owning library, when known
    pub library_id: Option<String>,
}

impl Document {
    /// Create a new document with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            venue: None,
            year: None,
            tags: Vec::new(),
            citation_count: 0,
            abstract_text: None,
            starred: false,
            in_smart_search: false,
            library_id: None,
        }
    }

    /// Builder method to set authors
    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// Builder method to set the venue
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Builder method to set the year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builder method to set the citation count
    pub fn with_citations(mut self, count: i32) -> Self {
        self.citation_count = count;
        self
    }

    /// Builder method to set tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Builder method to set the abstract
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    /// The text used for embedding generation: title, authors, abstract.
    pub fn embedding_text(&self) -> String {
        let mut text = self.title.clone();
        if !self.authors.is_empty() {
            text.push_str(". Authors: ");
            text.push_str(&self.authors.join(", "));
        }
        if let Some(ref abstract_str) = self.abstract_text {
            text.push_str(". ");
            // Truncate long abstracts; the lead paragraph carries the signal
            let truncated = if abstract_str.len() > 1000 {
                let mut end = 1000;
                while !abstract_str.is_char_boundary(end) {
                    end -= 1;
                }
                &abstract_str[..end]
            } else {
                abstract_str.as_str()
            };
            text.push_str(truncated);
        }
        text
    }
}
