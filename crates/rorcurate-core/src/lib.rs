//! Affiliation–ROR correction engine: record store, correction tracking,
//! batch aggregation, selection state and feedback payloads.

pub mod aggregate;
mod error;
pub mod feedback;
pub mod query;
pub mod record;
pub mod ror_id;
pub mod selection;
pub mod store;
pub mod tracker;

pub use aggregate::{Aggregation, RorSummary, aggregate, propagate, ror_ranking};
pub use error::StoreError;
pub use feedback::{ExportDocument, ExportRow, FeedbackRow, export_document, feedback_rows};
pub use query::{QueryContext, SearchTerm};
pub use record::{
    AffiliationRecord, CorrectedRor, DecisionStatus, EditAction, RawAffiliation, RorAction, RorRef,
    Source,
};
pub use ror_id::{clean_ror, is_ror, normalize};
pub use selection::{RecordFilter, Selection};
pub use store::RecordStore;
pub use tracker::{Correction, apply_action, project_corrections, undo};
