//! REST query client for an authenticated Salesforce org.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crmreport_shared::{ReportError, Result, SalesforceConfig};

use crate::CrmSource;
use crate::session::{self, SalesforceAuth, SalesforceSession};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("crmreport/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single HTTP round-trip.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// One page of a SOQL query result.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    total_size: usize,
    done: bool,
    #[serde(default)]
    records: Vec<Value>,
    next_records_url: Option<String>,
}

/// Query client bound to one session.
pub struct SalesforceClient {
    http: Client,
    session: SalesforceSession,
    api_version: String,
}

impl SalesforceClient {
    /// Establish a session with the configured auth mode and build a client.
    #[instrument(skip_all, fields(auth = %auth.describe()))]
    pub async fn connect(config: &SalesforceConfig, auth: &SalesforceAuth) -> Result<Self> {
        let http = build_client()?;

        let session = match auth {
            SalesforceAuth::Credentials(credentials) => {
                let url = session::login_url(&credentials.domain, &config.api_version);
                session::login_with_credentials(&http, &url, credentials).await?
            }
            SalesforceAuth::CliSession { target_org } => session::session_from_cli(target_org).await?,
        };

        info!(instance = %session.instance_url, "connected to Salesforce");

        Ok(Self {
            http,
            session,
            api_version: config.api_version.clone(),
        })
    }

    /// Build a client around an existing session.
    pub fn with_session(session: SalesforceSession, api_version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            session,
            api_version: api_version.into(),
        })
    }

    /// The org this client talks to.
    pub fn instance_url(&self) -> &Url {
        &self.session.instance_url
    }

    fn query_url(&self, soql: &str) -> Result<Url> {
        let mut url = self
            .session
            .instance_url
            .join(&format!("/services/data/v{}/query", self.api_version))
            .map_err(|e| ReportError::extraction(format!("invalid query URL: {e}")))?;
        url.query_pairs_mut().append_pair("q", soql);
        Ok(url)
    }

    async fn fetch_page(&self, url: &Url) -> Result<QueryPage> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.session.access_token)
            .send()
            .await
            .map_err(|e| ReportError::extraction(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::extraction(format!(
                "query failed with HTTP {status}: {}",
                body.trim()
            )));
        }

        response
            .json::<QueryPage>()
            .await
            .map_err(|e| ReportError::extraction(format!("malformed query response: {e}")))
    }
}

impl CrmSource for SalesforceClient {
    /// Run a SOQL query and follow `nextRecordsUrl` until the result is complete.
    async fn query_all(&self, soql: &str) -> Result<Vec<Value>> {
        let mut url = self.query_url(soql)?;
        let mut records = Vec::new();

        loop {
            let page = self.fetch_page(&url).await?;
            debug!(
                total = page.total_size,
                batch = page.records.len(),
                done = page.done,
                "query page received"
            );
            records.extend(page.records);

            match page.next_records_url {
                Some(next) if !page.done => {
                    url = self.session.instance_url.join(&next).map_err(|e| {
                        ReportError::extraction(format!("invalid nextRecordsUrl '{next}': {e}"))
                    })?;
                }
                _ => break,
            }
        }

        Ok(records)
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| ReportError::Network(format!("failed to build HTTP client: {e}")))
}
