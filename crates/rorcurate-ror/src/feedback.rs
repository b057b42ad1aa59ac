//! HTTP client for submitting correction feedback.

use rorcurate_core::FeedbackRow;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
}

/// Posts feedback rows to a submission endpoint.
pub struct FeedbackClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    accepted: Option<u64>,
}

impl FeedbackClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Submit the rows as one JSON array.
    ///
    /// Returns the number of rows the endpoint reports as accepted. A
    /// successful reply without a readable count counts every row.
    pub async fn submit(&self, rows: &[FeedbackRow]) -> Result<u64, FeedbackError> {
        info!(url = %self.endpoint, count = rows.len(), "submitting correction feedback");
        let resp = self.client.post(&self.endpoint).json(rows).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedbackError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let accepted = accepted_count(&body, rows.len());
        info!(accepted, "feedback submitted");
        Ok(accepted)
    }
}

fn accepted_count(body: &str, submitted: usize) -> u64 {
    let submitted = submitted as u64;
    if body.trim().is_empty() {
        return submitted;
    }
    match serde_json::from_str::<SubmitResponse>(body) {
        Ok(parsed) => parsed.accepted.unwrap_or(submitted),
        Err(e) => {
            warn!(error = %e, "unreadable feedback reply, assuming all rows accepted");
            submitted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_from_reply() {
        assert_eq!(accepted_count(r#"{"accepted": 3}"#, 5), 3);
    }

    #[test]
    fn empty_reply_counts_all_rows() {
        assert_eq!(accepted_count("", 5), 5);
        assert_eq!(accepted_count("{}", 2), 2);
    }

    #[test]
    fn plain_text_success_counts_all_rows() {
        assert_eq!(accepted_count("ok", 4), 4);
        assert_eq!(accepted_count(r#"{"accepted": "many"}"#, 2), 2);
    }

    #[test]
    fn feedback_client_trims_trailing_slash() {
        let client = FeedbackClient::new("http://localhost:4000/api/feedback/".into());
        assert_eq!(client.endpoint, "http://localhost:4000/api/feedback");
    }
}
