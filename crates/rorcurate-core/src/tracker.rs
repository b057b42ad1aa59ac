//! Per-record correction state and the flat correction projection.
//!
//! Every edit goes through [`apply_action`], [`undo`], [`toggle_removed`] or
//! [`retract_add`]; each recomputes the correction flag from the original
//! and corrected lists afterwards. Records that are not OpenAlex-sourced are
//! skipped by all of them.

use std::collections::HashSet;

use tracing::debug;

use crate::record::{AffiliationRecord, CorrectedRor, EditAction, RorAction, RorRef};

/// A corrected affiliation, ready for the feedback serializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub affiliation_id: String,
    pub raw_affiliation_string: String,
    pub rors_in_openalex: Vec<RorRef>,
    pub corrected_rors: Vec<CorrectedRor>,
    pub works: Vec<String>,
}

/// Apply `action` for `ror` to every record. Returns how many records changed.
pub fn apply_action<'a, I>(records: I, ror: &RorRef, action: EditAction) -> usize
where
    I: IntoIterator<Item = &'a mut AffiliationRecord>,
{
    let mut changed = 0;
    for record in records {
        if !record.is_correctable() {
            debug!(id = %record.id, source = ?record.source, "skipping non-OpenAlex record");
            continue;
        }
        if apply_one(record, ror, action) {
            changed += 1;
        }
    }
    debug!(ror_id = %ror.ror_id, ?action, changed, "applied ROR action");
    changed
}

pub(crate) fn apply_one(record: &mut AffiliationRecord, ror: &RorRef, action: EditAction) -> bool {
    let in_original = record.is_original(&ror.ror_id);
    let pos = record
        .corrected_rors
        .iter()
        .position(|c| c.ror_id() == ror.ror_id);

    let changed = match (action, pos) {
        (EditAction::Add, Some(i)) => {
            let entry = &mut record.corrected_rors[i];
            entry.ror.fill_metadata(ror);
            if entry.action == RorAction::Remove {
                entry.action = restored_action(in_original);
                true
            } else {
                false
            }
        }
        (EditAction::Add, None) => {
            record.corrected_rors.push(CorrectedRor {
                ror: ror.clone(),
                action: restored_action(in_original),
            });
            true
        }
        (EditAction::Remove, Some(i)) => {
            let entry = &mut record.corrected_rors[i];
            if entry.action == RorAction::Remove {
                false
            } else {
                entry.action = RorAction::Remove;
                true
            }
        }
        (EditAction::Remove, None) => false,
    };

    recompute(record);
    changed
}

fn restored_action(in_original: bool) -> RorAction {
    if in_original {
        RorAction::None
    } else {
        RorAction::Add
    }
}

/// Reset a record to its loaded state. Idempotent.
pub fn undo(record: &mut AffiliationRecord) {
    record.corrected_rors = record
        .original_rors()
        .iter()
        .cloned()
        .map(CorrectedRor::unchanged)
        .collect();
    record.has_correction = false;
}

/// Flip a pending remove on one id back and forth.
///
/// Returns the new action, or `None` if the id is not in the corrected list
/// or the record is not correctable.
pub fn toggle_removed(record: &mut AffiliationRecord, ror_id: &str) -> Option<RorAction> {
    if !record.is_correctable() {
        return None;
    }
    let in_original = record.is_original(ror_id);
    let entry = record
        .corrected_rors
        .iter_mut()
        .find(|c| c.ror_id() == ror_id)?;
    entry.action = match entry.action {
        RorAction::Remove => restored_action(in_original),
        _ => RorAction::Remove,
    };
    let action = entry.action;
    recompute(record);
    Some(action)
}

/// Drop a pending add for `ror_id` from one record, leaving no trace.
pub fn retract_add(record: &mut AffiliationRecord, ror_id: &str) -> bool {
    if !record.is_correctable() {
        return false;
    }
    let before = record.corrected_rors.len();
    record
        .corrected_rors
        .retain(|c| !(c.ror_id() == ror_id && c.action == RorAction::Add));
    let removed = record.corrected_rors.len() != before;
    if removed {
        recompute(record);
    }
    removed
}

/// Whether the ids the record would end up linked to differ from the original ones.
pub fn compute_has_correction(record: &AffiliationRecord) -> bool {
    let effective: HashSet<&str> = record
        .corrected_rors
        .iter()
        .filter(|c| c.action != RorAction::Remove)
        .map(|c| c.ror_id())
        .collect();
    let original: HashSet<&str> = record
        .original_rors()
        .iter()
        .map(|r| r.ror_id.as_str())
        .collect();
    effective != original
}

fn recompute(record: &mut AffiliationRecord) {
    record.has_correction = compute_has_correction(record);
}

/// Every corrected OpenAlex record, in input order.
///
/// Removals of ids that were never linked upstream are left out of the
/// corrected list.
pub fn project_corrections<'a, I>(records: I) -> Vec<Correction>
where
    I: IntoIterator<Item = &'a AffiliationRecord>,
{
    records
        .into_iter()
        .filter(|r| r.is_correctable() && r.has_correction())
        .map(|record| Correction {
            affiliation_id: record.id.clone(),
            raw_affiliation_string: record.raw_affiliation_string().to_string(),
            rors_in_openalex: record.original_rors().to_vec(),
            corrected_rors: record
                .corrected_rors()
                .iter()
                .filter(|c| c.action != RorAction::Remove || record.is_original(c.ror_id()))
                .cloned()
                .collect(),
            works: record.works.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DecisionStatus, RawAffiliation, Source};

    fn record(id: &str, source: Source, rors: &[&str]) -> AffiliationRecord {
        AffiliationRecord::from_raw(RawAffiliation {
            id: id.into(),
            source,
            raw_key: id.into(),
            name: format!("Raw {id}"),
            display_name: None,
            rors: rors.iter().map(|r| RorRef::bare(r)).collect(),
            works: vec![],
            works_number: None,
            status: DecisionStatus::default(),
        })
    }

    fn ror(id: &str) -> RorRef {
        RorRef::bare(id)
    }

    const R1: &str = "0abc123de";
    const R2: &str = "02feahw73";

    #[test]
    fn add_is_idempotent() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R2), EditAction::Add);
        let once = a.corrected_rors().to_vec();
        let changed = apply_action([&mut a], &ror(R2), EditAction::Add);
        assert_eq!(changed, 0);
        assert_eq!(a.corrected_rors(), once.as_slice());
        assert!(a.has_correction());
    }

    #[test]
    fn add_of_original_id_is_a_noop() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        assert_eq!(apply_action([&mut a], &ror(R1), EditAction::Add), 0);
        assert!(!a.has_correction());
        assert_eq!(a.corrected_rors()[0].action, RorAction::None);
    }

    #[test]
    fn remove_of_absent_id_is_a_noop() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        assert_eq!(apply_action([&mut a], &ror(R2), EditAction::Remove), 0);
        assert_eq!(a.corrected_rors().len(), 1);
        assert!(!a.has_correction());
    }

    #[test]
    fn add_then_remove_of_new_id_is_neutral() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R2), EditAction::Add);
        apply_action([&mut a], &ror(R2), EditAction::Remove);
        // The retraction is recorded but does not count as a correction.
        assert_eq!(a.corrected_entry(R2).map(|c| c.action), Some(RorAction::Remove));
        assert!(!a.has_correction());
        assert!(project_corrections([&a]).is_empty());
    }

    #[test]
    fn remove_then_add_restores_original() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R1), EditAction::Remove);
        assert!(a.has_correction());
        apply_action([&mut a], &ror(R1), EditAction::Add);
        assert_eq!(a.corrected_rors()[0].action, RorAction::None);
        assert!(!a.has_correction());
    }

    #[test]
    fn add_fills_missing_metadata() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &RorRef::new(R1, "Somewhere", "FR"), EditAction::Add);
        assert_eq!(a.corrected_rors()[0].ror.ror_name, "Somewhere");
        assert!(a.original_rors()[0].ror_name.is_empty());
    }

    #[test]
    fn non_openalex_records_are_skipped() {
        let mut b = record("b", Source::Bso, &[]);
        let mut u = record("u", Source::User, &[]);
        assert_eq!(apply_action([&mut b, &mut u], &ror(R2), EditAction::Add), 0);
        assert!(b.corrected_rors().is_empty());
        assert!(toggle_removed(&mut b, R2).is_none());
        assert!(!retract_add(&mut u, R2));
    }

    #[test]
    fn undo_round_trip() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R2), EditAction::Add);
        apply_action([&mut a], &ror(R1), EditAction::Remove);
        undo(&mut a);
        assert_eq!(a.corrected_rors(), &[CorrectedRor::unchanged(ror(R1))]);
        assert!(!a.has_correction());
    }

    #[test]
    fn undo_restores_original_after_any_sequence() {
        const R3: &str = "05f82e368";

        #[derive(Clone, Copy)]
        enum Step {
            Add(&'static str),
            Remove(&'static str),
            Toggle(&'static str),
            Retract(&'static str),
        }
        use Step::*;

        let sequences: &[&[Step]] = &[
            &[],
            &[Add(R3)],
            &[Remove(R1)],
            &[Remove(R1), Remove(R2)],
            &[Add(R3), Remove(R3)],
            &[Remove(R1), Add(R1), Add(R3)],
            &[Toggle(R2), Add(R3), Toggle(R3)],
            &[Add(R3), Retract(R3), Remove(R1)],
            &[Toggle(R1), Toggle(R1), Add(R3), Retract(R3), Add(R3)],
            &[Remove(R2), Toggle(R2), Remove(R2), Retract(R2), Add(R1)],
        ];

        for (n, steps) in sequences.iter().enumerate() {
            let mut a = record("a", Source::OpenAlex, &[R1, R2]);
            for step in *steps {
                match *step {
                    Add(id) => {
                        apply_action([&mut a], &ror(id), EditAction::Add);
                    }
                    Remove(id) => {
                        apply_action([&mut a], &ror(id), EditAction::Remove);
                    }
                    Toggle(id) => {
                        toggle_removed(&mut a, id);
                    }
                    Retract(id) => {
                        retract_add(&mut a, id);
                    }
                }
            }
            undo(&mut a);
            assert_eq!(
                a.corrected_rors(),
                &[CorrectedRor::unchanged(ror(R1)), CorrectedRor::unchanged(ror(R2))],
                "sequence {n}"
            );
            assert!(!a.has_correction(), "sequence {n}");
            assert!(project_corrections([&a]).is_empty(), "sequence {n}");
        }
    }

    #[test]
    fn undo_without_prior_action_changes_nothing() {
        let mut a = record("a", Source::OpenAlex, &[R1, R2]);
        let before = a.corrected_rors().to_vec();
        undo(&mut a);
        undo(&mut a);
        assert_eq!(a.corrected_rors(), before.as_slice());
        assert!(!a.has_correction());
    }

    #[test]
    fn toggle_removed_flips_back_to_prior_state() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R2), EditAction::Add);
        assert_eq!(toggle_removed(&mut a, R1), Some(RorAction::Remove));
        assert_eq!(toggle_removed(&mut a, R1), Some(RorAction::None));
        assert_eq!(toggle_removed(&mut a, R2), Some(RorAction::Remove));
        assert_eq!(toggle_removed(&mut a, R2), Some(RorAction::Add));
        assert_eq!(toggle_removed(&mut a, "0zzzzzz99"), None);
    }

    #[test]
    fn retract_add_drops_only_pending_adds() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror(R2), EditAction::Add);
        assert!(!retract_add(&mut a, R1));
        assert!(retract_add(&mut a, R2));
        assert_eq!(a.corrected_rors().len(), 1);
        assert!(!a.has_correction());
    }

    #[test]
    fn projection_follows_input_order() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        let mut b = record("b", Source::OpenAlex, &[]);
        let c = record("c", Source::OpenAlex, &[R1]);
        apply_action([&mut b], &ror(R2), EditAction::Add);
        apply_action([&mut a], &ror(R1), EditAction::Remove);

        let rows = project_corrections([&a, &b, &c]);
        let ids: Vec<&str> = rows.iter().map(|r| r.affiliation_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(rows[0].raw_affiliation_string, "Raw a");
        assert_eq!(rows[0].rors_in_openalex, vec![ror(R1)]);
        assert_eq!(rows[0].corrected_rors[0].action, RorAction::Remove);
    }

    #[test]
    fn projection_hides_removal_of_never_linked_id() {
        let mut a = record("a", Source::OpenAlex, &[R1]);
        apply_action([&mut a], &ror("0zzzzzz99"), EditAction::Add);
        apply_action([&mut a], &ror("0zzzzzz99"), EditAction::Remove);
        apply_action([&mut a], &ror(R2), EditAction::Add);

        let rows = project_corrections([&a]);
        assert_eq!(rows.len(), 1);
        let ids: Vec<&str> = rows[0].corrected_rors.iter().map(|c| c.ror_id()).collect();
        assert_eq!(ids, [R1, R2]);
    }
}
