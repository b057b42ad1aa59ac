//! The search that produced the current working set.

use serde::{Deserialize, Serialize};

use crate::ror_id::{clean_ror, normalize};

/// Searched affiliation strings shorter than this are too vague to query on.
pub const DEFAULT_TAG_LIMIT: usize = 3;

/// One searched term after normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTerm {
    pub label: String,
    pub is_ror: bool,
    pub is_disabled: bool,
}

impl SearchTerm {
    pub fn new(term: &str, tag_limit: usize) -> Self {
        match clean_ror(term) {
            Some(id) => Self {
                label: id,
                is_ror: true,
                is_disabled: false,
            },
            None => {
                let label = normalize(term);
                let is_disabled = label.chars().count() < tag_limit;
                Self {
                    label,
                    is_ror: false,
                    is_disabled,
                }
            }
        }
    }
}

/// Query parameters echoed into exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub start_year: Option<u16>,
    pub end_year: Option<u16>,
    pub affiliations: Vec<SearchTerm>,
    pub deleted_affiliations: Vec<String>,
    pub ror_exclusions: Vec<String>,
    #[serde(default)]
    pub get_ror_children: bool,
}

impl QueryContext {
    /// Classify searched and deleted terms.
    ///
    /// Deleted terms that are ROR ids become exclusions; the rest are
    /// normalised affiliation strings. Empty terms are dropped.
    pub fn from_terms<A, D>(affiliations: &[A], deleted: &[D], tag_limit: usize) -> Self
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        let affiliations = affiliations
            .iter()
            .map(|t| SearchTerm::new(t.as_ref(), tag_limit))
            .filter(|t| !t.label.is_empty())
            .collect();

        let mut deleted_affiliations = Vec::new();
        let mut ror_exclusions = Vec::new();
        for term in deleted {
            let term = term.as_ref();
            match clean_ror(term) {
                Some(id) => ror_exclusions.push(id),
                None => {
                    let label = normalize(term);
                    if !label.is_empty() {
                        deleted_affiliations.push(label);
                    }
                }
            }
        }

        Self {
            affiliations,
            deleted_affiliations,
            ror_exclusions,
            ..Self::default()
        }
    }

    pub fn with_years(mut self, start_year: Option<u16>, end_year: Option<u16>) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    /// Record whether ROR lookups also pulled in child organisations.
    pub fn with_ror_children(mut self, get_ror_children: bool) -> Self {
        self.get_ror_children = get_ror_children;
        self
    }

    /// Terms sent to the bibliographic search as affiliation strings.
    pub fn affiliation_strings(&self) -> impl Iterator<Item = &str> {
        self.affiliations
            .iter()
            .filter(|t| !t.is_disabled)
            .map(|t| t.label.as_str())
    }

    /// Searched terms that are ROR ids.
    pub fn rors(&self) -> impl Iterator<Item = &str> {
        self.affiliations
            .iter()
            .filter(|t| t.is_ror)
            .map(|t| t.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_classified() {
        let ctx = QueryContext::from_terms(
            &["https://ror.org/02feahw73", "Université Paris", "IN", "  "],
            &["0abc123de", "Hôpital Necker"],
            DEFAULT_TAG_LIMIT,
        )
        .with_years(Some(2021), Some(2023));

        assert_eq!(ctx.affiliations.len(), 3);
        assert_eq!(ctx.rors().collect::<Vec<_>>(), ["02feahw73"]);
        assert_eq!(
            ctx.affiliation_strings().collect::<Vec<_>>(),
            ["02feahw73", "universite paris"]
        );
        assert!(ctx.affiliations[2].is_disabled);
        assert_eq!(ctx.ror_exclusions, ["0abc123de"]);
        assert_eq!(ctx.deleted_affiliations, ["hopital necker"]);
        assert_eq!(ctx.start_year, Some(2021));
    }

    #[test]
    fn context_serializes_camel_case() {
        let ctx = QueryContext::from_terms(&["cnrs"], &[] as &[&str], DEFAULT_TAG_LIMIT);
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["affiliations"][0]["isRor"], false);
        assert!(value.get("deletedAffiliations").is_some());
        assert!(value.get("rorExclusions").is_some());
        assert_eq!(value["getRorChildren"], false);
    }

    #[test]
    fn children_flag_is_exported() {
        let ctx = QueryContext::from_terms(&["02feahw73"], &[] as &[&str], DEFAULT_TAG_LIMIT)
            .with_ror_children(true);
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["getRorChildren"], true);
    }
}
