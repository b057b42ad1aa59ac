//! Edit scripts: a JSON list of UI actions replayed against a record store.

use std::collections::HashMap;

use rorcurate_core::{
    Aggregation, DecisionStatus, EditAction, RecordFilter, RecordStore, RorRef, Selection, StoreError,
    clean_ror,
};
use serde::Deserialize;
use tracing::{info, warn};

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditStep {
    Select { ids: Vec<String> },
    Deselect { ids: Vec<String> },
    Toggle { ids: Vec<String> },
    Filter {
        #[serde(default)]
        text: String,
        #[serde(default)]
        statuses: Vec<DecisionStatus>,
    },
    SelectVisible,
    ClearSelection,
    Add { ror_id: String },
    Remove { ror_id: String },
    Propagate { ror_id: String },
    Undo { id: String },
    ToggleRemoved { id: String, ror_id: String },
    RetractAdd { id: String, ror_id: String },
}

impl EditStep {
    /// The ROR id this step adds to records, if any.
    pub fn added_ror(&self) -> Option<&str> {
        match self {
            EditStep::Add { ror_id } | EditStep::Propagate { ror_id } => Some(ror_id.as_str()),
            _ => None,
        }
    }
}

/// Distinct valid ids that a script adds, in first-use order.
pub fn ids_to_resolve(steps: &[EditStep]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in steps.iter().filter_map(EditStep::added_ror).filter_map(clean_ror) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// State after a script has run.
pub struct ScriptOutcome {
    pub selection: Selection,
    /// Correctable records matching the last filter.
    pub visible: usize,
    pub aggregation: Aggregation,
    pub skipped: usize,
}

/// Replay `steps` against `store`.
///
/// Adds only use ids found in `resolved`; anything else is skipped with a
/// warning, as are malformed ROR ids and per-record toggles that match no
/// entry.
pub fn run_script(
    store: &mut RecordStore,
    steps: &[EditStep],
    resolved: &HashMap<String, RorRef>,
) -> Result<ScriptOutcome, StoreError> {
    let mut selection = Selection::new();
    let mut filter = RecordFilter::default();
    let mut skipped = 0;

    for (n, step) in steps.iter().enumerate() {
        match step {
            EditStep::Select { ids } => {
                for id in ids {
                    selection.select(store, id);
                }
            }
            EditStep::Deselect { ids } => {
                for id in ids {
                    selection.deselect(id);
                }
            }
            EditStep::Toggle { ids } => {
                for id in ids {
                    selection.toggle(store, id);
                }
            }
            EditStep::Filter { text, statuses } => {
                filter = RecordFilter::new(text, statuses);
                selection.retain_visible(store, &filter);
            }
            EditStep::SelectVisible => selection.select_all(store, &filter),
            EditStep::ClearSelection => selection.clear(),
            EditStep::Add { ror_id } => match lookup(resolved, ror_id) {
                Some(ror) => {
                    store.apply_action(selection.ids(), ror, EditAction::Add)?;
                }
                None => skipped += skip(n, ror_id),
            },
            EditStep::Remove { ror_id } => match clean_ror(ror_id) {
                Some(id) => {
                    store.apply_action(selection.ids(), &RorRef::bare(&id), EditAction::Remove)?;
                }
                None => skipped += skip(n, ror_id),
            },
            EditStep::Propagate { ror_id } => match lookup(resolved, ror_id) {
                Some(ror) => {
                    store.propagate(ror, selection.ids())?;
                }
                None => skipped += skip(n, ror_id),
            },
            EditStep::Undo { id } => store.undo(id)?,
            EditStep::ToggleRemoved { id, ror_id } => {
                let toggled = match clean_ror(ror_id) {
                    Some(clean) => store.toggle_removed(id, &clean)?.is_some(),
                    None => false,
                };
                if !toggled {
                    skipped += skip(n, ror_id);
                }
            }
            EditStep::RetractAdd { id, ror_id } => {
                let retracted = match clean_ror(ror_id) {
                    Some(clean) => store.retract_add(id, &clean)?,
                    None => false,
                };
                if !retracted {
                    skipped += skip(n, ror_id);
                }
            }
        }
    }

    let aggregation = store.aggregate(selection.ids())?;
    let visible = filter.visible(store).len();
    info!(
        steps = steps.len(),
        skipped,
        selected = selection.len(),
        visible,
        "edit script complete"
    );
    Ok(ScriptOutcome {
        selection,
        visible,
        aggregation,
        skipped,
    })
}

fn lookup<'a>(resolved: &'a HashMap<String, RorRef>, ror_id: &str) -> Option<&'a RorRef> {
    clean_ror(ror_id).and_then(|id| resolved.get(&id))
}

fn skip(step: usize, ror_id: &str) -> usize {
    warn!(step, ror_id, "skipping step: ROR id invalid, unresolved or not on the record");
    1
}
