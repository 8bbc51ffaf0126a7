use crate::error::Result;
use scraper::Html;

pub(crate) mod html;
pub(crate) mod items;
pub(crate) mod npcs;
pub(crate) mod quests;
pub(crate) mod races;
pub(crate) mod recipes;
pub(crate) mod skills;
pub(crate) mod text;

/// Turns one page of a search listing into entries.
pub trait ListingParser {
    type Entry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<Self::Entry>>;
}

pub struct ListingPage<T> {
    pub entries: Vec<T>,
    /// The page carried the wiki's "Empty" marker row.
    pub exhausted: bool,
    /// Whether a "next" pagination link exists, for listings that render one.
    pub has_next: Option<bool>,
}

impl<T> ListingPage<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self {
            entries,
            exhausted: false,
            has_next: None,
        }
    }

    pub fn exhausted() -> Self {
        Self {
            entries: Vec::new(),
            exhausted: true,
            has_next: None,
        }
    }

    /// True when no further page should be requested.
    pub fn is_last(&self) -> bool {
        self.exhausted || self.entries.is_empty() || self.has_next == Some(false)
    }
}
