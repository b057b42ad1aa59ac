//! Owner of the affiliation records for the current query.
//!
//! Other components get read-only views or address records by id; all
//! mutation goes through the methods here.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::StoreError;
use crate::aggregate::{self, Aggregation};
use crate::record::{AffiliationRecord, EditAction, RawAffiliation, RorAction, RorRef};
use crate::tracker::{self, Correction};

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<AffiliationRecord>,
    index: HashMap<String, usize>,
}

impl RecordStore {
    /// Load a query result, replacing nothing: a new query gets a new store.
    pub fn load(raw: Vec<RawAffiliation>) -> Result<Self, StoreError> {
        let mut records = Vec::with_capacity(raw.len());
        let mut index = HashMap::with_capacity(raw.len());
        for item in raw {
            if index.contains_key(&item.id) {
                return Err(StoreError::DuplicateId(item.id));
            }
            index.insert(item.id.clone(), records.len());
            records.push(AffiliationRecord::from_raw(item));
        }
        let store = Self { records, index };
        info!(
            total = store.len(),
            correctable = store.correctable().count(),
            "loaded affiliation records"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AffiliationRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn records(&self) -> &[AffiliationRecord] {
        &self.records
    }

    /// OpenAlex records, in load order.
    pub fn correctable(&self) -> impl Iterator<Item = &AffiliationRecord> {
        self.records.iter().filter(|r| r.is_correctable())
    }

    /// Records for `ids`, in store order, ids deduplicated.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<&AffiliationRecord>, StoreError> {
        let positions = self.positions(ids)?;
        Ok(self
            .records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| positions.contains(&i).then_some(r))
            .collect())
    }

    fn positions<S: AsRef<str>>(&self, ids: &[S]) -> Result<HashSet<usize>, StoreError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.index
                    .get(id)
                    .copied()
                    .ok_or_else(|| StoreError::UnknownRecord(id.to_string()))
            })
            .collect()
    }

    fn select_mut<S: AsRef<str>>(
        &mut self,
        ids: &[S],
    ) -> Result<impl Iterator<Item = &mut AffiliationRecord>, StoreError> {
        let positions = self.positions(ids)?;
        Ok(self
            .records
            .iter_mut()
            .enumerate()
            .filter_map(move |(i, r)| positions.contains(&i).then_some(r)))
    }

    fn record_mut(&mut self, id: &str) -> Result<&mut AffiliationRecord, StoreError> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| StoreError::UnknownRecord(id.to_string()))?;
        Ok(&mut self.records[i])
    }

    /// Apply an add or remove to the records named by `ids`.
    ///
    /// Returns how many records changed; non-OpenAlex records are skipped.
    pub fn apply_action<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        ror: &RorRef,
        action: EditAction,
    ) -> Result<usize, StoreError> {
        let changed = tracker::apply_action(self.select_mut(ids)?, ror, action);
        info!(ror_id = %ror.ror_id, ?action, requested = ids.len(), changed, "batch action");
        Ok(changed)
    }

    pub fn undo(&mut self, id: &str) -> Result<(), StoreError> {
        tracker::undo(self.record_mut(id)?);
        debug!(id, "undid corrections");
        Ok(())
    }

    /// Reset every record. Used when the whole working set is abandoned.
    pub fn undo_all(&mut self) {
        self.records.iter_mut().for_each(tracker::undo);
    }

    pub fn propagate<S: AsRef<str>>(&mut self, ror: &RorRef, ids: &[S]) -> Result<usize, StoreError> {
        let added = aggregate::propagate(ror, self.select_mut(ids)?);
        info!(ror_id = %ror.ror_id, added, "propagated ROR to selection");
        Ok(added)
    }

    pub fn toggle_removed(&mut self, id: &str, ror_id: &str) -> Result<Option<RorAction>, StoreError> {
        Ok(tracker::toggle_removed(self.record_mut(id)?, ror_id))
    }

    pub fn retract_add(&mut self, id: &str, ror_id: &str) -> Result<bool, StoreError> {
        Ok(tracker::retract_add(self.record_mut(id)?, ror_id))
    }

    pub fn aggregate<S: AsRef<str>>(&self, ids: &[S]) -> Result<Aggregation, StoreError> {
        Ok(aggregate::aggregate(self.select(ids)?))
    }

    /// All corrected records in load order, projected fresh on each call.
    pub fn corrections(&self) -> Vec<Correction> {
        let corrections = tracker::project_corrections(&self.records);
        debug!(count = corrections.len(), "projected corrections");
        corrections
    }
}
