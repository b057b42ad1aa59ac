//! Affiliation records and the ROR references attached to them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ror_id;

/// Where an affiliation record came from.
///
/// Only [`Source::OpenAlex`] records carry ROR linkage that can be corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    OpenAlex,
    #[serde(rename = "BSO", alias = "bso")]
    Bso,
    #[serde(rename = "user", alias = "User")]
    User,
}

/// Curation decision attached to a record, used by the status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    #[default]
    ToBeDecided,
    Validated,
    Excluded,
}

/// A ROR organisation as linked to an affiliation.
///
/// `ror_id` is the natural key; name and country are display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RorRef {
    pub ror_id: String,
    #[serde(default)]
    pub ror_name: String,
    #[serde(default)]
    pub ror_country: String,
}

impl RorRef {
    /// Build a reference, normalising `ror_id` when it is a well-formed id.
    pub fn new(ror_id: &str, ror_name: impl Into<String>, ror_country: impl Into<String>) -> Self {
        Self {
            ror_id: canonical_id(ror_id),
            ror_name: ror_name.into(),
            ror_country: ror_country.into(),
        }
    }

    /// Reference with no display metadata yet.
    pub fn bare(ror_id: &str) -> Self {
        Self::new(ror_id, "", "")
    }

    /// Copy display metadata from `other` where this one has none.
    pub(crate) fn fill_metadata(&mut self, other: &RorRef) {
        if self.ror_name.is_empty() {
            self.ror_name.clone_from(&other.ror_name);
        }
        if self.ror_country.is_empty() {
            self.ror_country.clone_from(&other.ror_country);
        }
    }
}

fn canonical_id(raw: &str) -> String {
    ror_id::clean_ror(raw).unwrap_or_else(|| raw.trim().to_string())
}

/// Pending edit tag on a corrected ROR entry.
///
/// `None` means "linked, unchanged", which is distinct from the id being
/// absent from the corrected list altogether.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RorAction {
    #[default]
    None,
    Add,
    Remove,
}

impl RorAction {
    pub fn is_none(&self) -> bool {
        matches!(self, RorAction::None)
    }
}

/// An edit the UI can request on a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Add,
    Remove,
}

/// One entry of a record's working ROR list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedRor {
    #[serde(flatten)]
    pub ror: RorRef,
    #[serde(default, skip_serializing_if = "RorAction::is_none")]
    pub action: RorAction,
}

impl CorrectedRor {
    pub fn unchanged(ror: RorRef) -> Self {
        Self {
            ror,
            action: RorAction::None,
        }
    }

    pub fn ror_id(&self) -> &str {
        &self.ror.ror_id
    }
}

/// An affiliation record as returned by the query layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAffiliation {
    pub id: String,
    pub source: Source,
    /// Normalised key, possibly suffixed with `[ source: X ]`.
    #[serde(alias = "key")]
    pub raw_key: String,
    /// Raw affiliation string as written in the publication.
    #[serde(default)]
    pub name: String,
    /// Highlighted HTML fragment for display.
    #[serde(default, alias = "nameHtml")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub rors: Vec<RorRef>,
    #[serde(default)]
    pub works: Vec<String>,
    #[serde(default)]
    pub works_number: Option<usize>,
    #[serde(default)]
    pub status: DecisionStatus,
}

/// A loaded affiliation with its original and working ROR linkage.
///
/// `original_rors` is fixed at load time. `corrected_rors` and the derived
/// correction flag only change through the tracker functions.
#[derive(Debug, Clone)]
pub struct AffiliationRecord {
    pub id: String,
    pub source: Source,
    pub raw_key: String,
    pub name: String,
    pub display_name: Option<String>,
    pub works: Vec<String>,
    pub works_number: usize,
    pub status: DecisionStatus,
    original_rors: Vec<RorRef>,
    pub(crate) corrected_rors: Vec<CorrectedRor>,
    pub(crate) has_correction: bool,
}

impl AffiliationRecord {
    /// Build a record from query output. Duplicate ROR ids are dropped,
    /// keeping the first occurrence.
    pub fn from_raw(raw: RawAffiliation) -> Self {
        let mut seen = HashSet::new();
        let original_rors: Vec<RorRef> = raw
            .rors
            .into_iter()
            .map(|r| RorRef::new(&r.ror_id, r.ror_name, r.ror_country))
            .filter(|r| seen.insert(r.ror_id.clone()))
            .collect();
        let corrected_rors = original_rors
            .iter()
            .cloned()
            .map(CorrectedRor::unchanged)
            .collect();
        let works_number = raw.works_number.unwrap_or(raw.works.len());

        Self {
            id: raw.id,
            source: raw.source,
            raw_key: raw.raw_key,
            name: raw.name,
            display_name: raw.display_name,
            works: raw.works,
            works_number,
            status: raw.status,
            original_rors,
            corrected_rors,
            has_correction: false,
        }
    }

    pub fn original_rors(&self) -> &[RorRef] {
        &self.original_rors
    }

    pub fn corrected_rors(&self) -> &[CorrectedRor] {
        &self.corrected_rors
    }

    pub fn has_correction(&self) -> bool {
        self.has_correction
    }

    pub fn is_correctable(&self) -> bool {
        self.source == Source::OpenAlex
    }

    pub fn is_original(&self, ror_id: &str) -> bool {
        self.original_rors.iter().any(|r| r.ror_id == ror_id)
    }

    pub(crate) fn corrected_entry(&self, ror_id: &str) -> Option<&CorrectedRor> {
        self.corrected_rors.iter().find(|c| c.ror_id() == ror_id)
    }

    /// The raw affiliation string, falling back to the key without its
    /// `[ source: X ]` suffix.
    pub fn raw_affiliation_string(&self) -> &str {
        if self.name.is_empty() {
            strip_source_suffix(&self.raw_key)
        } else {
            &self.name
        }
    }
}

/// `"universite paris [ source: OpenAlex ]"` → `"universite paris"`.
pub fn strip_source_suffix(key: &str) -> &str {
    match key.find("[ source: ") {
        Some(pos) if key.trim_end().ends_with(']') => key[..pos].trim_end(),
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, rors: &[&str]) -> RawAffiliation {
        RawAffiliation {
            id: id.into(),
            source: Source::OpenAlex,
            raw_key: format!("{id} [ source: OpenAlex ]"),
            name: String::new(),
            display_name: None,
            rors: rors.iter().map(|r| RorRef::bare(r)).collect(),
            works: vec!["W1".into(), "W2".into()],
            works_number: None,
            status: DecisionStatus::default(),
        }
    }

    #[test]
    fn corrected_starts_as_copy_of_original() {
        let record = AffiliationRecord::from_raw(raw("a", &["02feahw73", "0abc123de"]));
        assert_eq!(record.original_rors().len(), 2);
        assert!(record.corrected_rors().iter().all(|c| c.action.is_none()));
        assert!(!record.has_correction());
        assert_eq!(record.works_number, 2);
    }

    #[test]
    fn duplicate_and_link_form_ids_collapse() {
        let record = AffiliationRecord::from_raw(raw(
            "a",
            &["02feahw73", "https://ror.org/02feahw73", "02FEAHW73"],
        ));
        assert_eq!(record.original_rors().len(), 1);
        assert_eq!(record.original_rors()[0].ror_id, "02feahw73");
    }

    #[test]
    fn raw_string_falls_back_to_key() {
        let record = AffiliationRecord::from_raw(raw("cnrs paris", &[]));
        assert_eq!(record.raw_affiliation_string(), "cnrs paris");
    }

    #[test]
    fn source_serde_names() {
        let json = r#"{"id":"x","source":"BSO","key":"k"}"#;
        let parsed: RawAffiliation = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.source, Source::Bso);
        assert_eq!(parsed.raw_key, "k");
        assert_eq!(parsed.status, DecisionStatus::ToBeDecided);
    }

    #[test]
    fn unchanged_entry_omits_action() {
        let entry = CorrectedRor::unchanged(RorRef::new("02feahw73", "CNRS", "FR"));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"rorId": "02feahw73", "rorName": "CNRS", "rorCountry": "FR"})
        );
    }
}
