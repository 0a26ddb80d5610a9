//! CRM entity records and the dataset snapshot shared by every stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ReportId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one report run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Entity records
// ---------------------------------------------------------------------------

/// A client or partner organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    /// NDA on file.
    pub nda_signed: bool,
    /// Master services agreement on file.
    pub msa_signed: bool,
    pub notes: Option<String>,
}

/// A person, either a client-side contact or a contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub account_id: Option<String>,
    /// Denormalized owning account name; `None` when the lookup is empty.
    pub account_name: Option<String>,
    /// e.g. "Decision Maker", "Client Stakeholder", "Contractor".
    pub contact_role: Option<String>,
    /// Contractor availability, e.g. "Available".
    pub contractor_status: Option<String>,
    pub primary_skill: Option<String>,
    pub location: Option<String>,
    pub default_cost_rate: Option<f64>,
}

/// A sales opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    /// Absent amounts count as zero in pipeline sums.
    pub amount: Option<f64>,
    pub stage: Option<String>,
    /// Kept as the CRM sends it (`YYYY-MM-DD`), never parsed.
    pub close_date: Option<String>,
    pub probability: Option<f64>,
    pub description: Option<String>,
}

/// A delivery project, usually born from a won opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub opportunity_id: Option<String>,
    pub opportunity_name: Option<String>,
    pub status: Option<String>,
    pub budget: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// A contractor placed on client work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: String,
    pub name: String,
    pub contractor_id: Option<String>,
    pub contractor_name: Option<String>,
    pub opportunity_id: Option<String>,
    pub opportunity_name: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub client_account_id: Option<String>,
    pub client_account_name: Option<String>,
    pub engagement_role: Option<String>,
    pub engagement_status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub cost_rate: Option<f64>,
    pub bill_rate: Option<f64>,
    pub hours_per_week: Option<f64>,
    /// Pre-computed in the CRM; not derived from the rates.
    pub margin_percent: Option<f64>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// CrmData
// ---------------------------------------------------------------------------

/// Read-only snapshot of everything extracted for one report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmData {
    pub accounts: Vec<Account>,
    pub contacts: Vec<Contact>,
    pub opportunities: Vec<Opportunity>,
    pub projects: Vec<Project>,
    pub engagements: Vec<Engagement>,
    /// When the extraction pass finished.
    pub extracted_at: DateTime<Utc>,
}

impl CrmData {
    /// An empty snapshot taken now.
    pub fn empty() -> Self {
        Self {
            accounts: Vec::new(),
            contacts: Vec::new(),
            opportunities: Vec::new(),
            projects: Vec::new(),
            engagements: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Record counts per entity kind.
    pub fn summary(&self) -> DataSummary {
        DataSummary {
            total_accounts: self.accounts.len(),
            total_contacts: self.contacts.len(),
            total_opportunities: self.opportunities.len(),
            total_projects: self.projects.len(),
            total_engagements: self.engagements.len(),
        }
    }
}

/// Record counts per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSummary {
    pub total_accounts: usize,
    pub total_contacts: usize,
    pub total_opportunities: usize,
    pub total_projects: usize,
    pub total_engagements: usize,
}
