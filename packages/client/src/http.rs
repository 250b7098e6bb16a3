//! `reqwest` implementation of [`ReportRepository`].
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation | Request |
//! |---|---|
//! | list | `GET /reports` |
//! | create | `POST /reports` |
//! | update | `PUT /reports/{id}` |
//! | delete | `DELETE /reports/{id}` |

use citywatch_report_models::{Report, ReportPayload};

use crate::{ClientError, ReportRepository, ensure_updatable};

/// Report repository backed by the REST API.
pub struct HttpReportRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportRepository {
    /// Creates a repository client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a repository client reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn reports_url(&self) -> String {
        format!("{}/reports", self.base_url)
    }

    fn report_url(&self, id: &str) -> String {
        format!("{}/reports/{id}", self.base_url)
    }
}

#[async_trait::async_trait]
impl ReportRepository for HttpReportRepository {
    async fn list(&self) -> Result<Vec<Report>, ClientError> {
        let url = self.reports_url();
        log::debug!("GET {url}");
        let resp = check_status(self.client.get(&url).send().await?).await?;
        parse_report_list(&resp.text().await?)
    }

    async fn create(&self, payload: &ReportPayload) -> Result<Report, ClientError> {
        let url = self.reports_url();
        log::debug!("POST {url} ({})", payload.report_type);
        let resp = check_status(self.client.post(&url).json(payload).send().await?).await?;
        parse_report(&resp.text().await?)
    }

    async fn update(&self, id: &str, payload: &ReportPayload) -> Result<Report, ClientError> {
        ensure_updatable(payload)?;

        let url = self.report_url(id);
        log::debug!("PUT {url}");
        let resp = check_status(self.client.put(&url).json(payload).send().await?).await?;
        parse_report(&resp.text().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let url = self.report_url(id);
        log::debug!("DELETE {url}");
        check_status(self.client.delete(&url).send().await?).await?;
        Ok(())
    }
}

/// Passes successful responses through and turns the rest into
/// [`ClientError::Status`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(String::from))
        .unwrap_or_else(|| "request failed".to_string());
    log::debug!("Repository error {status}: {message}");

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Extracts `error` or `message` from a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

/// Parses a report list. Entries that do not decode, such as reports with
/// a category this client does not know, are skipped with a warning.
fn parse_report_list(body: &str) -> Result<Vec<Report>, ClientError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let total = items.len();

    let reports: Vec<Report> = items
        .into_iter()
        .filter_map(|item| {
            let id = item
                .get("_id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<no id>")
                .to_string();
            serde_json::from_value(item)
                .inspect_err(|e| log::warn!("Skipping report {id}: {e}"))
                .ok()
        })
        .collect();

    log::debug!("Listed {} of {total} reports", reports.len());
    Ok(reports)
}

/// Parses a report returned bare or wrapped in a `report`/`data` envelope.
fn parse_report(body: &str) -> Result<Report, ClientError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let inner = ["report", "data"]
        .iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_object()))
        .cloned()
        .unwrap_or(value);
    Ok(serde_json::from_value(inner)?)
}
