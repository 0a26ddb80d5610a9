//! Per-section prompt construction.
//!
//! Each prompt pairs a fixed role instruction with numeric summaries and a
//! bounded prefix of the relevant entity list. Only the first N records in
//! query order are embedded, so large datasets are partially visible to each
//! section. The bounds are the `*_LIMIT` constants below.

use serde::Serialize;

use crmreport_shared::{CrmData, ReportError, Result};

use crate::aggregate::{Aggregates, rated_engagements};
use crate::format::with_thousands;

/// Records per entity kind in the executive summary prompt.
pub const EXECUTIVE_LIMIT: usize = 10;
/// Opportunities in the pipeline prompt.
pub const PIPELINE_LIMIT: usize = 15;
/// Accounts in the client prompt.
pub const CLIENT_ACCOUNTS_LIMIT: usize = 15;
/// Key contacts in the client prompt.
pub const KEY_CONTACTS_LIMIT: usize = 10;
/// Engagements in the staffing and margin prompts.
pub const ENGAGEMENTS_LIMIT: usize = 15;
/// Available contractors in the staffing prompt.
pub const AVAILABLE_LIMIT: usize = 10;
/// Records per entity kind in the recommendations prompt.
pub const RECOMMENDATIONS_LIMIT: usize = 5;

/// The six narrative sections, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ExecutiveSummary,
    PipelineAnalysis,
    ClientInsights,
    StaffingOverview,
    MarginAnalysis,
    Recommendations,
}

impl SectionKind {
    pub const ALL: [Self; 6] = [
        Self::ExecutiveSummary,
        Self::PipelineAnalysis,
        Self::ClientInsights,
        Self::StaffingOverview,
        Self::MarginAnalysis,
        Self::Recommendations,
    ];

    /// Heading used in the rendered document.
    pub fn title(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::PipelineAnalysis => "Pipeline Analysis",
            Self::ClientInsights => "Client Insights",
            Self::StaffingOverview => "Staffing Overview",
            Self::MarginAnalysis => "Margin Analysis",
            Self::Recommendations => "Strategic Recommendations",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive_summary",
            Self::PipelineAnalysis => "pipeline_analysis",
            Self::ClientInsights => "client_insights",
            Self::StaffingOverview => "staffing_overview",
            Self::MarginAnalysis => "margin_analysis",
            Self::Recommendations => "recommendations",
        }
    }

    fn system_instruction(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => {
                "You are a senior business analyst for a Salesforce consulting firm.\n\
                 Your role is to provide clear, actionable executive summaries of CRM data.\n\
                 Focus on key metrics, trends, and business-critical insights.\n\
                 Write in a professional, concise style suitable for managing partners."
            }
            Self::PipelineAnalysis => {
                "You are a sales operations analyst for a consulting firm.\n\
                 Analyze sales pipeline data to identify trends, risks, and opportunities.\n\
                 Provide specific, data-driven insights."
            }
            Self::ClientInsights => {
                "You are a client success manager for a consulting firm.\n\
                 Analyze client accounts and contacts to identify relationship health and opportunities.\n\
                 Provide actionable recommendations for relationship management."
            }
            Self::StaffingOverview => {
                "You are a resource manager for a consulting firm that staffs contractors.\n\
                 Analyze contractor engagements to understand utilization, capacity, and staffing health.\n\
                 Provide operational insights for managing delivery resources."
            }
            Self::MarginAnalysis => {
                "You are a financial analyst for a consulting firm.\n\
                 Analyze billing rates, cost rates, and margins to assess profitability.\n\
                 Provide insights on margin health and improvement opportunities."
            }
            Self::Recommendations => {
                "You are a strategic advisor for a consulting firm.\n\
                 Based on comprehensive CRM data, provide actionable recommendations.\n\
                 Prioritize recommendations by impact and urgency.\n\
                 Be specific and practical."
            }
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-contained request for one narrative section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPrompt {
    pub section: SectionKind,
    pub system: String,
    pub user: String,
}

/// Build the six section prompts, in document order.
pub fn build_prompts(data: &CrmData) -> Result<Vec<SectionPrompt>> {
    let agg = Aggregates::compute(data);
    SectionKind::ALL
        .into_iter()
        .map(|section| {
            let user = match section {
                SectionKind::ExecutiveSummary => executive_summary(data)?,
                SectionKind::PipelineAnalysis => pipeline_analysis(data, &agg)?,
                SectionKind::ClientInsights => client_insights(data, &agg)?,
                SectionKind::StaffingOverview => staffing_overview(data, &agg)?,
                SectionKind::MarginAnalysis => margin_analysis(data, &agg)?,
                SectionKind::Recommendations => recommendations(data)?,
            };
            Ok(SectionPrompt {
                section,
                system: section.system_instruction().to_string(),
                user,
            })
        })
        .collect()
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ReportError::validation(format!("failed to serialize prompt data: {e}")))
}

fn head<T>(items: &[T], n: usize) -> &[T] {
    &items[..items.len().min(n)]
}

fn executive_summary(data: &CrmData) -> Result<String> {
    let s = data.summary();
    Ok(format!(
        "Analyze this CRM data and provide an executive summary (3-5 paragraphs).

Focus on:
- Overall business health
- Key client relationships
- Revenue pipeline status
- Staffing utilization
- Any concerns or highlights

CRM Data Summary:
- Total Accounts: {}
- Total Contacts: {}
- Total Opportunities: {}
- Total Projects: {}
- Total Contractor Engagements: {}

Accounts:
{}

Opportunities:
{}

Projects:
{}

Engagements:
{}
",
        s.total_accounts,
        s.total_contacts,
        s.total_opportunities,
        s.total_projects,
        s.total_engagements,
        json(head(&data.accounts, EXECUTIVE_LIMIT))?,
        json(head(&data.opportunities, EXECUTIVE_LIMIT))?,
        json(head(&data.projects, EXECUTIVE_LIMIT))?,
        json(head(&data.engagements, EXECUTIVE_LIMIT))?,
    ))
}

fn pipeline_analysis(data: &CrmData, agg: &Aggregates<'_>) -> Result<String> {
    Ok(format!(
        "Analyze this sales pipeline and provide insights (2-3 paragraphs).

Pipeline Metrics:
- Total Pipeline Value: ${}
- Opportunities by Stage: {}

Opportunities (first {} of {}):
{}

Focus on:
- Pipeline health and velocity
- Stage distribution analysis
- Deals requiring attention
- Expected close timeline
",
        with_thousands(agg.pipeline_total, 2),
        json(&agg.stages)?,
        data.opportunities.len().min(PIPELINE_LIMIT),
        data.opportunities.len(),
        json(head(&data.opportunities, PIPELINE_LIMIT))?,
    ))
}

fn client_insights(data: &CrmData, agg: &Aggregates<'_>) -> Result<String> {
    Ok(format!(
        "Analyze client relationships and provide insights (2-3 paragraphs).

Accounts ({} total):
{}

Contacts by Account:
{}

Key Contacts:
{}

Focus on:
- Client relationship depth
- Key stakeholder coverage
- Contract status (NDA/MSA)
- Relationship risks or gaps
",
        data.accounts.len(),
        json(head(&data.accounts, CLIENT_ACCOUNTS_LIMIT))?,
        json(&agg.contacts_by_account)?,
        json(head(&agg.key_contacts, KEY_CONTACTS_LIMIT))?,
    ))
}

fn staffing_overview(data: &CrmData, agg: &Aggregates<'_>) -> Result<String> {
    Ok(format!(
        "Analyze staffing and provide an overview (2-3 paragraphs).

Contractor Pool: {} contractors
Active Engagements: {}

Engagement Status Distribution:
{}

Current Engagements:
{}

Available Contractors:
{}

Focus on:
- Current utilization rates
- Contractor availability
- Upcoming engagement changes
- Capacity for new work
",
        agg.contractors.len(),
        data.engagements.len(),
        json(&agg.status_counts)?,
        json(head(&data.engagements, ENGAGEMENTS_LIMIT))?,
        json(head(&agg.available, AVAILABLE_LIMIT))?,
    ))
}

fn margin_analysis(data: &CrmData, agg: &Aggregates<'_>) -> Result<String> {
    let rated = rated_engagements(&data.engagements);
    Ok(format!(
        "Analyze margins and profitability (2-3 paragraphs).

Key Metrics:
- Average Margin: {:.1}%
- Average Bill Rate: ${:.2}/hr
- Average Cost Rate: ${:.2}/hr
- Engagements with margin data: {}

Engagement Details (with rates):
{}

Focus on:
- Overall margin health
- High/low margin engagements
- Rate benchmarking insights
- Margin improvement opportunities
",
        agg.rates.margin_percent,
        agg.rates.bill_rate,
        agg.rates.cost_rate,
        agg.rates.with_margin,
        json(head(&rated, ENGAGEMENTS_LIMIT))?,
    ))
}

fn recommendations(data: &CrmData) -> Result<String> {
    let s = data.summary();
    Ok(format!(
        "Based on all CRM data, provide 5-7 prioritized recommendations.

Data Summary:
- Accounts: {}
- Contacts: {}
- Opportunities: {}
- Projects: {}
- Engagements: {}

Key Data Points:
Accounts: {}
Opportunities: {}
Engagements: {}

Format each recommendation as:
[Priority: High/Medium/Low] - Recommendation title
Brief explanation and specific action steps.
",
        s.total_accounts,
        s.total_contacts,
        s.total_opportunities,
        s.total_projects,
        s.total_engagements,
        json(head(&data.accounts, RECOMMENDATIONS_LIMIT))?,
        json(head(&data.opportunities, RECOMMENDATIONS_LIMIT))?,
        json(head(&data.engagements, RECOMMENDATIONS_LIMIT))?,
    ))
}
