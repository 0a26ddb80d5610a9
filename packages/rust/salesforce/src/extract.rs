//! Bulk extraction of the five entity kinds into a [`CrmData`] snapshot.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument};

use crmreport_shared::{CrmData, ReportError, Result};

use crate::CrmSource;
use crate::records;

pub const ACCOUNTS_SOQL: &str = "SELECT Id, Name, Account_Type__c, Industry, Website, \
     NDA_Signed__c, MSA_Signed__c, Notes__c \
     FROM Account ORDER BY Name";

pub const CONTACTS_SOQL: &str = "SELECT Id, Name, Email, Phone, Title, AccountId, Account.Name, \
     Contact_Role__c, Contractor_Status__c, Primary_Skill_Area__c, Location__c, \
     Default_Cost_Rate__c \
     FROM Contact ORDER BY Name";

pub const OPPORTUNITIES_SOQL: &str = "SELECT Id, Name, AccountId, Account.Name, Amount, StageName, \
     CloseDate, Probability, Description \
     FROM Opportunity ORDER BY CloseDate DESC";

pub const PROJECTS_SOQL: &str = "SELECT Id, Name, Account__c, Account__r.Name, \
     Opportunity__c, Opportunity__r.Name, Project_Status__c, Budget__c, \
     Start_Date__c, End_Date__c, Description__c, Notes__c \
     FROM Project__c ORDER BY Start_Date__c DESC";

pub const ENGAGEMENTS_SOQL: &str = "SELECT Id, Name, Contractor__c, Contractor__r.Name, \
     Opportunity__c, Opportunity__r.Name, Project__c, Project__r.Name, \
     Client_Account__c, Client_Account__r.Name, Engagement_Role__c, Engagement_Status__c, \
     Start_Date__c, End_Date__c, Cost_Rate__c, Bill_Rate__c, Hours_Per_Week__c, \
     Margin_Percent__c, Notes__c \
     FROM Contractor_Engagement__c ORDER BY Start_Date__c DESC";

/// Run the five bulk queries in order and map every row.
///
/// Any query or mapping failure aborts the whole extraction.
#[instrument(skip_all)]
pub async fn extract_all<S: CrmSource>(source: &S) -> Result<CrmData> {
    info!("extracting CRM data");

    let accounts = map_rows(source.query_all(ACCOUNTS_SOQL).await?, records::account_from_row)?;
    let contacts = map_rows(source.query_all(CONTACTS_SOQL).await?, records::contact_from_row)?;
    let opportunities = map_rows(
        source.query_all(OPPORTUNITIES_SOQL).await?,
        records::opportunity_from_row,
    )?;
    let projects = map_rows(source.query_all(PROJECTS_SOQL).await?, records::project_from_row)?;
    let engagements = map_rows(
        source.query_all(ENGAGEMENTS_SOQL).await?,
        records::engagement_from_row,
    )?;

    let data = CrmData {
        accounts,
        contacts,
        opportunities,
        projects,
        engagements,
        extracted_at: Utc::now(),
    };

    let summary = data.summary();
    info!(
        accounts = summary.total_accounts,
        contacts = summary.total_contacts,
        opportunities = summary.total_opportunities,
        projects = summary.total_projects,
        engagements = summary.total_engagements,
        "extraction complete"
    );

    Ok(data)
}

fn map_rows<T>(rows: Vec<Value>, map: fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(map).collect()
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// An in-memory [`CrmSource`] keyed by the SOQL `FROM` object.
///
/// Used for offline runs and tests; queries for unknown objects return no rows.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tables: Vec<(String, Vec<Value>)>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rows returned for `object` (e.g. `Contractor_Engagement__c`).
    pub fn with_rows(mut self, object: &str, rows: Vec<Value>) -> Self {
        self.tables.push((object.to_string(), rows));
        self
    }
}

impl CrmSource for StaticSource {
    async fn query_all(&self, soql: &str) -> Result<Vec<Value>> {
        let object = from_object(soql)
            .ok_or_else(|| ReportError::extraction(format!("query has no FROM clause: {soql}")))?;
        Ok(self
            .tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(object))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

/// The object name following `FROM` in a SOQL statement.
fn from_object(soql: &str) -> Option<&str> {
    let mut words = soql.split_whitespace();
    words.find(|w| w.eq_ignore_ascii_case("FROM"))?;
    words.next()
}
