//! HTTP client for the ROR registry API (v2).

use async_trait::async_trait;
use futures::future::join_all;
use rorcurate_core::clean_ror;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{RorError, RorRecord, RorResolver};

pub const DEFAULT_ROR_API: &str = "https://api.ror.org/v2";

/// Client for ROR organisation lookups and free-text search.
pub struct RorClient {
    client: reqwest::Client,
    base_url: String,
    include_children: bool,
}

#[derive(Debug, Deserialize)]
struct Organization {
    id: String,
    #[serde(default)]
    names: Vec<OrganizationName>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
struct OrganizationName {
    value: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    geonames_details: Option<GeonamesDetails>,
}

#[derive(Debug, Deserialize)]
struct GeonamesDetails {
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Organization>,
}

impl Organization {
    fn into_record(self) -> RorRecord {
        let ror_id = clean_ror(&self.id).unwrap_or(self.id);

        // ror_display first, then labels, aliases and acronyms in API order.
        let mut names: Vec<String> = Vec::with_capacity(self.names.len());
        let (display, rest): (Vec<_>, Vec<_>) = self
            .names
            .into_iter()
            .partition(|n| n.types.iter().any(|t| t == "ror_display"));
        for name in display.into_iter().chain(rest) {
            if !names.contains(&name.value) {
                names.push(name.value);
            }
        }

        let ror_country = self
            .locations
            .into_iter()
            .find_map(|l| l.geonames_details.and_then(|g| g.country_code))
            .unwrap_or_default();

        RorRecord {
            ror_id,
            names,
            ror_country,
        }
    }

    fn child_ids(&self) -> Vec<String> {
        self.relationships
            .iter()
            .filter(|r| r.kind.eq_ignore_ascii_case("child"))
            .filter_map(|r| clean_ror(&r.id))
            .collect()
    }
}

impl RorClient {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `https://api.ror.org/v2`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            include_children: false,
        }
    }

    /// Also return child organisations when resolving an id.
    pub fn with_children(mut self, include_children: bool) -> Self {
        self.include_children = include_children;
        self
    }

    async fn organization(&self, ror_id: &str) -> Result<Organization, RorError> {
        let url = format!("{}/organizations/{}", self.base_url, ror_id);

        info!(url = %url, "fetching ROR organization");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RorError::NotFound(ror_id.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RorError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Look up one id; invalid ids are rejected before any request is made.
    pub async fn resolve_id(&self, ror_id: &str) -> Result<RorRecord, RorError> {
        let id = clean_ror(ror_id).ok_or_else(|| RorError::InvalidId(ror_id.to_string()))?;
        Ok(self.organization(&id).await?.into_record())
    }

    /// Look up an id and, concurrently, every child organisation it lists.
    ///
    /// Children that fail to resolve are logged and skipped.
    pub async fn resolve_with_children(&self, ror_id: &str) -> Result<Vec<RorRecord>, RorError> {
        let id = clean_ror(ror_id).ok_or_else(|| RorError::InvalidId(ror_id.to_string()))?;
        let parent = self.organization(&id).await?;
        let child_ids = parent.child_ids();

        let mut records = vec![parent.into_record()];
        let children = join_all(child_ids.iter().map(|child| self.organization(child))).await;
        for (child, result) in child_ids.iter().zip(children) {
            match result {
                Ok(org) => records.push(org.into_record()),
                Err(e) => warn!(ror_id = %child, error = %e, "skipping unresolved child"),
            }
        }
        info!(ror_id = %id, count = records.len(), "resolved ROR with children");
        Ok(records)
    }

    /// Free-text search. No match is an empty result, not an error.
    pub async fn search(&self, text: &str) -> Result<Vec<RorRecord>, RorError> {
        let url = format!("{}/organizations", self.base_url);

        info!(url = %url, query = text, "searching ROR");
        let resp = self.client.get(&url).query(&[("query", text)]).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RorError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        let records: Vec<RorRecord> = parsed.items.into_iter().map(Organization::into_record).collect();
        info!(count = records.len(), "ROR search complete");
        Ok(records)
    }
}

#[async_trait]
impl RorResolver for RorClient {
    async fn resolve(&self, ror_id: &str) -> Result<Vec<RorRecord>, RorError> {
        if self.include_children {
            self.resolve_with_children(ror_id).await
        } else {
            Ok(vec![self.resolve_id(ror_id).await?])
        }
    }
}
