//! Lookup seam for ROR records and concurrent fan-out over it.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::future::join_all;
use rorcurate_core::{Aggregation, RorRef};
use tracing::{debug, warn};

use crate::RorError;

/// A registry organisation as returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RorRecord {
    pub ror_id: String,
    /// Display name first, then the other known names.
    pub names: Vec<String>,
    pub ror_country: String,
}

impl RorRecord {
    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn to_ror_ref(&self) -> RorRef {
        RorRef::new(&self.ror_id, self.display_name(), self.ror_country.clone())
    }
}

/// Resolves a ROR id into one or more registry records.
///
/// More than one record comes back when child organisations are included.
#[async_trait]
pub trait RorResolver: Send + Sync {
    async fn resolve(&self, ror_id: &str) -> Result<Vec<RorRecord>, RorError>;
}

/// Outcome of one lookup in a fan-out.
#[derive(Debug)]
pub struct Resolution {
    pub query: String,
    pub result: Result<Vec<RorRecord>, RorError>,
}

/// Resolve every id concurrently and wait for all of them.
///
/// A failed lookup does not affect the others; results come back in input
/// order.
pub async fn resolve_all<R, S>(resolver: &R, ids: &[S]) -> Vec<Resolution>
where
    R: RorResolver + ?Sized,
    S: AsRef<str>,
{
    let lookups = ids.iter().map(|id| async move {
        let query = id.as_ref().to_string();
        let result = resolver.resolve(&query).await;
        match &result {
            Ok(records) => debug!(query = %query, count = records.len(), "resolved ROR"),
            Err(e) => warn!(query = %query, error = %e, "ROR lookup failed"),
        }
        Resolution { query, result }
    });
    join_all(lookups).await
}

/// Successful records from a fan-out as references, first occurrence wins.
pub fn resolved_refs(resolutions: &[Resolution]) -> Vec<RorRef> {
    let mut seen = HashSet::new();
    resolutions
        .iter()
        .filter_map(|r| r.result.as_ref().ok())
        .flatten()
        .map(RorRecord::to_ror_ref)
        .filter(|r| seen.insert(r.ror_id.clone()))
        .collect()
}

/// Merge resolved records into an aggregation view.
///
/// Failed lookups leave the view untouched. Returns how many new ids were
/// staged.
pub fn stage_resolutions(aggregation: &mut Aggregation, resolutions: &[Resolution]) -> usize {
    resolved_refs(resolutions)
        .into_iter()
        .filter(|ror| aggregation.stage(ror.clone()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rorcurate_core::{DecisionStatus, RawAffiliation, RecordStore, Source};

    struct FakeRegistry;

    #[async_trait]
    impl RorResolver for FakeRegistry {
        async fn resolve(&self, ror_id: &str) -> Result<Vec<RorRecord>, RorError> {
            match ror_id {
                "02feahw73" => Ok(vec![RorRecord {
                    ror_id: "02feahw73".into(),
                    names: vec!["CNRS".into(), "Centre national de la recherche scientifique".into()],
                    ror_country: "FR".into(),
                }]),
                "05f82e368" => Ok(vec![RorRecord {
                    ror_id: "05f82e368".into(),
                    names: vec!["Université Paris Cité".into()],
                    ror_country: "FR".into(),
                }]),
                other => Err(RorError::NotFound(other.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let results = resolve_all(&FakeRegistry, &["02feahw73", "0zzzzzz99", "05f82e368"]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].query, "02feahw73");
        assert!(results[0].result.is_ok());
        assert!(matches!(results[1].result, Err(RorError::NotFound(_))));
        assert!(results[2].result.is_ok());

        let refs = resolved_refs(&results);
        let ids: Vec<&str> = refs.iter().map(|r| r.ror_id.as_str()).collect();
        assert_eq!(ids, ["02feahw73", "05f82e368"]);
        assert_eq!(refs[0].ror_name, "CNRS");
    }

    #[tokio::test]
    async fn failed_ids_are_never_staged() {
        let store = RecordStore::load(vec![RawAffiliation {
            id: "a".into(),
            source: Source::OpenAlex,
            raw_key: "cnrs".into(),
            name: String::new(),
            display_name: None,
            rors: vec![RorRef::bare("02feahw73")],
            works: vec![],
            works_number: None,
            status: DecisionStatus::default(),
        }])
        .unwrap();
        let mut agg = store.aggregate(&["a"]).unwrap();

        let results = resolve_all(&FakeRegistry, &["02feahw73", "0zzzzzz99", "05f82e368"]).await;
        assert_eq!(stage_resolutions(&mut agg, &results), 1);
        assert_eq!(agg.get("02feahw73").unwrap().ror.ror_name, "CNRS");
        assert_eq!(agg.get("02feahw73").unwrap().count_affiliations, 1);
        assert_eq!(agg.get("05f82e368").unwrap().count_affiliations, 0);
        assert!(agg.get("0zzzzzz99").is_none());
    }

    #[test]
    fn record_without_names_has_empty_display_name() {
        let record = RorRecord {
            ror_id: "02feahw73".into(),
            names: vec![],
            ror_country: String::new(),
        };
        assert_eq!(record.display_name(), "");
        assert_eq!(record.to_ror_ref().ror_id, "02feahw73");
    }
}
