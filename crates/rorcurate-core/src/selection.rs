//! Which records are selected, and which are visible under the current filter.

use regex::{Regex, RegexBuilder};

use crate::record::{AffiliationRecord, DecisionStatus, strip_source_suffix};
use crate::ror_id::strip_diacritics;
use crate::store::RecordStore;

/// Text and status filter over the correctable records.
///
/// The text is matched case-insensitively, diacritics ignored, as a regular
/// expression against the record key followed by its original ROR ids. Text
/// that is not a valid pattern is matched literally.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pattern: Option<Regex>,
    statuses: Vec<DecisionStatus>,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new("", &[])
    }
}

impl RecordFilter {
    /// An empty `statuses` slice admits every status.
    pub fn new(text: &str, statuses: &[DecisionStatus]) -> Self {
        let text = strip_diacritics(text.trim());
        let pattern = (!text.is_empty()).then(|| {
            build(&text).unwrap_or_else(|_| {
                build(&regex::escape(&text)).unwrap_or_else(|_| match_nothing())
            })
        });
        Self {
            pattern,
            statuses: statuses.to_vec(),
        }
    }

    pub fn matches(&self, record: &AffiliationRecord) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
            return false;
        }
        let Some(pattern) = &self.pattern else {
            return true;
        };
        let key = strip_diacritics(strip_source_suffix(&record.raw_key));
        let haystack = std::iter::once(key.as_str())
            .chain(record.original_rors().iter().map(|r| r.ror_id.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        pattern.is_match(&haystack)
    }

    /// Matching correctable records in store order.
    pub fn visible<'a>(&self, store: &'a RecordStore) -> Vec<&'a AffiliationRecord> {
        store.correctable().filter(|r| self.matches(r)).collect()
    }
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn match_nothing() -> Regex {
    // A position cannot be both a word boundary and not one.
    Regex::new(r"\b\B").expect("valid pattern")
}

/// Ordered set of selected record ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if the store holds it as a correctable record.
    pub fn select(&mut self, store: &RecordStore, id: &str) -> bool {
        let eligible = store.get(id).is_some_and(|r| r.is_correctable());
        if !eligible || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| s != id);
        self.ids.len() != before
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, store: &RecordStore, id: &str) -> bool {
        if self.deselect(id) {
            false
        } else {
            self.select(store, id)
        }
    }

    /// Add every record currently visible under `filter`.
    pub fn select_all(&mut self, store: &RecordStore, filter: &RecordFilter) {
        for record in filter.visible(store) {
            self.select(store, &record.id);
        }
    }

    /// Drop selected ids the filter no longer shows.
    pub fn retain_visible(&mut self, store: &RecordStore, filter: &RecordFilter) {
        self.ids
            .retain(|id| store.get(id).is_some_and(|r| r.is_correctable() && filter.matches(r)));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
