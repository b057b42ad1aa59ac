//! Correction feedback payload and export document.
//!
//! Pure shaping of [`Correction`]s; no filtering happens here. A row whose
//! corrected list ends up empty is still emitted.

use serde::{Deserialize, Serialize};

use crate::query::QueryContext;
use crate::record::{CorrectedRor, RorRef};
use crate::tracker::Correction;

/// One corrected affiliation as consumed by the feedback endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRow {
    pub affiliation_id: String,
    pub raw_affiliation_string: String,
    #[serde(rename = "rorsInOpenAlex")]
    pub rors_in_openalex: Vec<RorRef>,
    pub corrected_rors: Vec<CorrectedRor>,
}

impl From<&Correction> for FeedbackRow {
    fn from(c: &Correction) -> Self {
        Self {
            affiliation_id: c.affiliation_id.clone(),
            raw_affiliation_string: c.raw_affiliation_string.clone(),
            rors_in_openalex: c.rors_in_openalex.clone(),
            corrected_rors: c.corrected_rors.clone(),
        }
    }
}

/// A feedback row plus the works it was observed on, for file export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(flatten)]
    pub row: FeedbackRow,
    #[serde(rename = "worksOpenAlex")]
    pub works_openalex: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub query: QueryContext,
    /// RFC 3339 timestamp supplied by the caller.
    pub generated_at: String,
    pub corrections: Vec<ExportRow>,
}

pub fn feedback_rows(corrections: &[Correction]) -> Vec<FeedbackRow> {
    corrections.iter().map(FeedbackRow::from).collect()
}

pub fn export_document(
    corrections: &[Correction],
    query: QueryContext,
    generated_at: impl Into<String>,
) -> ExportDocument {
    ExportDocument {
        query,
        generated_at: generated_at.into(),
        corrections: corrections
            .iter()
            .map(|c| ExportRow {
                row: FeedbackRow::from(c),
                works_openalex: c.works.clone(),
            })
            .collect(),
    }
}
