//! Row-to-record mapping for Salesforce query results.
//!
//! Query rows arrive as loosely typed JSON objects. Each mapper pulls the
//! named fields it knows about:
//! - `Id` and `Name` are required
//! - every other scalar is optional
//! - relationship lookups (`Account`, `Contractor__r`, ...) may be missing or
//!   `null`, in which case the denormalized name is `None`

use serde_json::Value;

use crmreport_shared::{
    Account, Contact, Engagement, Opportunity, Project, ReportError, Result,
};

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn required_str(row: &Value, field: &str, kind: &str) -> Result<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ReportError::extraction(format!("{kind} row is missing required field `{field}`")))
}

fn opt_str(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(String::from)
}

fn opt_f64(row: &Value, field: &str) -> Option<f64> {
    row.get(field).and_then(Value::as_f64)
}

fn flag(row: &Value, field: &str) -> bool {
    row.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// `Name` of a nested relationship object, if the lookup is populated.
fn related_name(row: &Value, relation: &str) -> Option<String> {
    row.get(relation)
        .filter(|r| r.is_object())
        .and_then(|r| r.get("Name"))
        .and_then(Value::as_str)
        .map(String::from)
}

// ---------------------------------------------------------------------------
// Mappers
// ---------------------------------------------------------------------------

pub(crate) fn account_from_row(row: &Value) -> Result<Account> {
    Ok(Account {
        id: required_str(row, "Id", "Account")?,
        name: required_str(row, "Name", "Account")?,
        account_type: opt_str(row, "Account_Type__c"),
        industry: opt_str(row, "Industry"),
        website: opt_str(row, "Website"),
        nda_signed: flag(row, "NDA_Signed__c"),
        msa_signed: flag(row, "MSA_Signed__c"),
        notes: opt_str(row, "Notes__c"),
    })
}

pub(crate) fn contact_from_row(row: &Value) -> Result<Contact> {
    Ok(Contact {
        id: required_str(row, "Id", "Contact")?,
        name: required_str(row, "Name", "Contact")?,
        email: opt_str(row, "Email"),
        phone: opt_str(row, "Phone"),
        title: opt_str(row, "Title"),
        account_id: opt_str(row, "AccountId"),
        account_name: related_name(row, "Account"),
        contact_role: opt_str(row, "Contact_Role__c"),
        contractor_status: opt_str(row, "Contractor_Status__c"),
        primary_skill: opt_str(row, "Primary_Skill_Area__c"),
        location: opt_str(row, "Location__c"),
        default_cost_rate: opt_f64(row, "Default_Cost_Rate__c"),
    })
}

pub(crate) fn opportunity_from_row(row: &Value) -> Result<Opportunity> {
    Ok(Opportunity {
        id: required_str(row, "Id", "Opportunity")?,
        name: required_str(row, "Name", "Opportunity")?,
        account_id: opt_str(row, "AccountId"),
        account_name: related_name(row, "Account"),
        amount: opt_f64(row, "Amount"),
        stage: opt_str(row, "StageName"),
        close_date: opt_str(row, "CloseDate"),
        probability: opt_f64(row, "Probability"),
        description: opt_str(row, "Description"),
    })
}

pub(crate) fn project_from_row(row: &Value) -> Result<Project> {
    Ok(Project {
        id: required_str(row, "Id", "Project")?,
        name: required_str(row, "Name", "Project")?,
        account_id: opt_str(row, "Account__c"),
        account_name: related_name(row, "Account__r"),
        opportunity_id: opt_str(row, "Opportunity__c"),
        opportunity_name: related_name(row, "Opportunity__r"),
        status: opt_str(row, "Project_Status__c"),
        budget: opt_f64(row, "Budget__c"),
        start_date: opt_str(row, "Start_Date__c"),
        end_date: opt_str(row, "End_Date__c"),
        description: opt_str(row, "Description__c"),
        notes: opt_str(row, "Notes__c"),
    })
}

pub(crate) fn engagement_from_row(row: &Value) -> Result<Engagement> {
    Ok(Engagement {
        id: required_str(row, "Id", "Engagement")?,
        name: required_str(row, "Name", "Engagement")?,
        contractor_id: opt_str(row, "Contractor__c"),
        contractor_name: related_name(row, "Contractor__r"),
        opportunity_id: opt_str(row, "Opportunity__c"),
        opportunity_name: related_name(row, "Opportunity__r"),
        project_id: opt_str(row, "Project__c"),
        project_name: related_name(row, "Project__r"),
        client_account_id: opt_str(row, "Client_Account__c"),
        client_account_name: related_name(row, "Client_Account__r"),
        engagement_role: opt_str(row, "Engagement_Role__c"),
        engagement_status: opt_str(row, "Engagement_Status__c"),
        start_date: opt_str(row, "Start_Date__c"),
        end_date: opt_str(row, "End_Date__c"),
        cost_rate: opt_f64(row, "Cost_Rate__c"),
        bill_rate: opt_f64(row, "Bill_Rate__c"),
        hours_per_week: opt_f64(row, "Hours_Per_Week__c"),
        margin_percent: opt_f64(row, "Margin_Percent__c"),
        notes: opt_str(row, "Notes__c"),
    })
}
