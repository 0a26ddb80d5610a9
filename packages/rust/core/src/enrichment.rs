//! Narrative generation gateway.
//!
//! Calls the Anthropic Messages API once per section. Failures never escape
//! this module: they come back as [`Narrative::Unavailable`] so the document
//! still renders, with the affected section visibly marked.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use tracing::{error, info, instrument};

use crmreport_shared::{ClaudeSettings, DataSummary, ReportError, Result};

use crate::pipeline::ProgressReporter;
use crate::prompts::{SectionKind, SectionPrompt};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("crmreport/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

/// Outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrative {
    Text(String),
    /// The service failed; carries the reason.
    Unavailable(String),
}

impl Narrative {
    /// Text to render. Unavailable sections render a fixed sentinel.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Unavailable(reason) => {
                format!("[Analysis unavailable due to API error: {reason}]")
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A text-generation backend.
pub trait NarrativeGenerator {
    /// One best-effort round-trip. Never fails; errors become [`Narrative::Unavailable`].
    fn generate(&self, system: &str, user: &str) -> impl Future<Output = Narrative> + Send;
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// The six narrative texts of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeSections {
    pub executive_summary: Narrative,
    pub pipeline_analysis: Narrative,
    pub client_insights: Narrative,
    pub staffing_overview: Narrative,
    pub margin_analysis: Narrative,
    pub recommendations: Narrative,
}

impl NarrativeSections {
    /// Build by asking `f` for each section.
    pub fn from_fn(mut f: impl FnMut(SectionKind) -> Narrative) -> Self {
        Self {
            executive_summary: f(SectionKind::ExecutiveSummary),
            pipeline_analysis: f(SectionKind::PipelineAnalysis),
            client_insights: f(SectionKind::ClientInsights),
            staffing_overview: f(SectionKind::StaffingOverview),
            margin_analysis: f(SectionKind::MarginAnalysis),
            recommendations: f(SectionKind::Recommendations),
        }
    }

    pub fn get(&self, kind: SectionKind) -> &Narrative {
        match kind {
            SectionKind::ExecutiveSummary => &self.executive_summary,
            SectionKind::PipelineAnalysis => &self.pipeline_analysis,
            SectionKind::ClientInsights => &self.client_insights,
            SectionKind::StaffingOverview => &self.staffing_overview,
            SectionKind::MarginAnalysis => &self.margin_analysis,
            SectionKind::Recommendations => &self.recommendations,
        }
    }

    /// Sections whose generation failed, in document order.
    pub fn degraded(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_unavailable())
            .collect()
    }
}

/// Generate every section in order, one call each.
#[instrument(skip_all, fields(sections = prompts.len()))]
pub async fn generate_sections<G: NarrativeGenerator>(
    generator: &G,
    prompts: &[SectionPrompt],
    progress: &dyn ProgressReporter,
) -> NarrativeSections {
    let total = prompts.len();
    let mut results: Vec<(SectionKind, Narrative)> = Vec::with_capacity(total);

    for (i, prompt) in prompts.iter().enumerate() {
        progress.section_started(prompt.section, i + 1, total);
        let narrative = generator.generate(&prompt.system, &prompt.user).await;
        if let Narrative::Unavailable(reason) = &narrative {
            error!(section = %prompt.section, %reason, "narrative generation failed");
        }
        results.push((prompt.section, narrative));
    }

    NarrativeSections::from_fn(|kind| {
        results
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| n.clone())
            .unwrap_or_else(|| Narrative::Unavailable("section was not generated".into()))
    })
}

/// Static stand-in text used when AI generation is skipped or not configured.
pub fn placeholder_sections(summary: &DataSummary, date: NaiveDate) -> NarrativeSections {
    let skipped = |topic: &str| {
        Narrative::Text(format!(
            "AI analysis skipped. Enable AI enrichment for {topic}."
        ))
    };

    NarrativeSections {
        executive_summary: Narrative::Text(format!(
            "This report provides a summary of Force Multiply CRM data as of {}.\n\n\
             The system currently tracks {} accounts, {} contacts, {} opportunities, \
             {} projects, and {} contractor engagements.\n\n\
             AI analysis was skipped for this report. Run without --skip-ai flag to \
             generate intelligent insights.",
            date.format("%B %d, %Y"),
            summary.total_accounts,
            summary.total_contacts,
            summary.total_opportunities,
            summary.total_projects,
            summary.total_engagements,
        )),
        pipeline_analysis: skipped("pipeline insights"),
        client_insights: skipped("client insights"),
        staffing_overview: skipped("staffing analysis"),
        margin_analysis: skipped("margin analysis"),
        recommendations: skipped("strategic recommendations"),
    }
}

// ---------------------------------------------------------------------------
// Claude client
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, serde::Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, serde::Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Anthropic Messages API client.
pub struct ClaudeClient {
    http: Client,
    settings: ClaudeSettings,
}

impl ClaudeClient {
    pub fn new(settings: ClaudeSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportError::Network(format!("failed to build HTTP client: {e}")))?;
        info!(model = %settings.model, "Claude client ready");
        Ok(Self { http, settings })
    }

    async fn call(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'));
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system,
            messages: [UserMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&raw)
                .map(|e| format!("{}: {}", e.error.kind, e.error.message))
                .unwrap_or_else(|_| raw.trim().to_string());
            return Err(ReportError::Generation(format!("HTTP {status}: {detail}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Generation(format!("malformed response: {e}")))?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ReportError::Generation("response contained no text".into()))
    }
}

impl NarrativeGenerator for ClaudeClient {
    async fn generate(&self, system: &str, user: &str) -> Narrative {
        match self.call(system, user).await {
            Ok(text) => Narrative::Text(text),
            Err(ReportError::Generation(reason)) => Narrative::Unavailable(reason),
            Err(other) => Narrative::Unavailable(other.to_string()),
        }
    }
}
