//! Salesforce access and entity extraction.
//!
//! This crate provides:
//! - [`session`]: credentials (SOAP) and `sf` CLI session establishment
//! - [`SalesforceClient`]: REST `query_all` over an authenticated session
//! - [`extract_all`]: the five bulk queries mapped into a [`crmreport_shared::CrmData`] snapshot
//!
//! Everything downstream of extraction only sees the [`CrmSource`] trait.

mod client;
mod extract;
mod records;
pub mod session;

use std::future::Future;

use serde_json::Value;

use crmreport_shared::Result;

pub use client::SalesforceClient;
pub use extract::{
    ACCOUNTS_SOQL, CONTACTS_SOQL, ENGAGEMENTS_SOQL, OPPORTUNITIES_SOQL, PROJECTS_SOQL,
    StaticSource, extract_all,
};
pub use session::{Credentials, SalesforceAuth, SalesforceSession};

/// A bulk-query capability over an already-authenticated CRM.
pub trait CrmSource {
    /// Run `soql` and return every matching row as a JSON object.
    fn query_all(&self, soql: &str) -> impl Future<Output = Result<Vec<Value>>> + Send;
}
