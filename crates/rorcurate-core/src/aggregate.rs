//! Cross-selection summary of pending ROR changes.
//!
//! The aggregation is rebuilt from scratch on every call; selections are
//! small enough that incremental bookkeeping buys nothing.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::record::{AffiliationRecord, EditAction, RorAction, RorRef};
use crate::tracker;

/// Counts for one ROR id across the selected records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RorSummary {
    #[serde(flatten)]
    pub ror: RorRef,
    /// Selected records whose corrected list holds the id, whatever its action.
    pub count_affiliations: usize,
    pub added_by: usize,
    pub removed_by: usize,
}

impl RorSummary {
    /// Selected records that keep the id once pending removes are applied.
    pub fn holders(&self) -> usize {
        self.count_affiliations - self.removed_by
    }
}

/// Per-id summaries in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    selection_size: usize,
    entries: Vec<RorSummary>,
    index: HashMap<String, usize>,
}

impl Aggregation {
    pub fn get(&self, ror_id: &str) -> Option<&RorSummary> {
        self.index.get(ror_id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[RorSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of correctable records the aggregation was computed over.
    pub fn selection_size(&self) -> usize {
        self.selection_size
    }

    /// Whether every selected record holds `ror_id` with no remove pending.
    pub fn is_complete(&self, ror_id: &str) -> bool {
        self.get(ror_id)
            .is_some_and(|s| s.holders() == self.selection_size)
    }

    /// Merge a resolved ROR into the view.
    ///
    /// Unknown ids are appended with zero counts so they can be offered for
    /// addition; known ids only gain missing display metadata. Counts are
    /// never touched. Returns whether a new entry was created.
    pub fn stage(&mut self, ror: RorRef) -> bool {
        if let Some(&i) = self.index.get(&ror.ror_id) {
            self.entries[i].ror.fill_metadata(&ror);
            return false;
        }
        self.index.insert(ror.ror_id.clone(), self.entries.len());
        self.entries.push(RorSummary {
            ror,
            count_affiliations: 0,
            added_by: 0,
            removed_by: 0,
        });
        true
    }

    fn entry_mut(&mut self, ror: &RorRef) -> &mut RorSummary {
        let i = match self.index.get(&ror.ror_id) {
            Some(&i) => {
                self.entries[i].ror.fill_metadata(ror);
                i
            }
            None => {
                self.stage(ror.clone());
                self.entries.len() - 1
            }
        };
        &mut self.entries[i]
    }
}

/// Summarise the corrected ROR lists of `selected`.
pub fn aggregate<'a, I>(selected: I) -> Aggregation
where
    I: IntoIterator<Item = &'a AffiliationRecord>,
{
    let mut aggregation = Aggregation::default();
    for record in selected.into_iter().filter(|r| r.is_correctable()) {
        aggregation.selection_size += 1;
        for corrected in record.corrected_rors() {
            let entry = aggregation.entry_mut(&corrected.ror);
            entry.count_affiliations += 1;
            match corrected.action {
                RorAction::Add => entry.added_by += 1,
                RorAction::Remove => entry.removed_by += 1,
                RorAction::None => {}
            }
        }
    }
    aggregation
}

/// Add `ror` to every selected record that does not hold it yet.
///
/// Records with a pending remove for the same id are left alone, so they
/// still show up as divergent in the next aggregation. Returns how many
/// records gained the id.
pub fn propagate<'a, I>(ror: &RorRef, selected: I) -> usize
where
    I: IntoIterator<Item = &'a mut AffiliationRecord>,
{
    let mut added = 0;
    for record in selected {
        if !record.is_correctable() {
            continue;
        }
        let existing = record.corrected_entry(&ror.ror_id).map(|e| e.action);
        match existing {
            Some(RorAction::Remove) => {
                debug!(id = %record.id, ror_id = %ror.ror_id, "keeping pending remove during propagate");
            }
            Some(_) => {}
            None => {
                if tracker::apply_one(record, ror, EditAction::Add) {
                    added += 1;
                }
            }
        }
    }
    debug!(ror_id = %ror.ror_id, added, "propagated ROR");
    added
}

/// Most frequent original ROR ids across `records`, most frequent first.
///
/// Ties keep first-appearance order. Used to colour-code the top ids.
pub fn ror_ranking<'a, I>(records: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a AffiliationRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        for ror in record.original_rors() {
            let count = counts.entry(ror.ror_id.clone()).or_insert_with(|| {
                order.push(ror.ror_id.clone());
                0
            });
            *count += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|id| {
            let n = counts[&id];
            (id, n)
        })
        .collect();
    // Stable sort keeps first-appearance order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}
