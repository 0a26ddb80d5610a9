//! Pure summary statistics over a [`CrmData`] snapshot.

use indexmap::IndexMap;

use crmreport_shared::{Contact, CrmData, Engagement, Opportunity};

/// Bucket for stages and statuses that are absent.
pub const UNKNOWN_LABEL: &str = "Unknown";
/// Bucket for contacts without a denormalized account name.
pub const NO_ACCOUNT_LABEL: &str = "No Account";

/// Roles that count as key client-side contacts.
pub const KEY_CONTACT_ROLES: [&str; 2] = ["Decision Maker", "Client Stakeholder"];
pub const CONTRACTOR_ROLE: &str = "Contractor";
pub const AVAILABLE_STATUS: &str = "Available";

/// Sum of opportunity amounts; absent amounts count as zero.
pub fn pipeline_total(opportunities: &[Opportunity]) -> f64 {
    opportunities.iter().filter_map(|o| o.amount).sum()
}

/// Summed amount per stage, in first-seen stage order.
pub fn stage_distribution(opportunities: &[Opportunity]) -> IndexMap<String, f64> {
    let mut stages = IndexMap::new();
    for opp in opportunities {
        let stage = opp.stage.as_deref().unwrap_or(UNKNOWN_LABEL);
        *stages.entry(stage.to_string()).or_insert(0.0) += opp.amount.unwrap_or(0.0);
    }
    stages
}

/// Number of contacts per account name, in first-seen order.
pub fn contacts_by_account(contacts: &[Contact]) -> IndexMap<String, usize> {
    let mut groups = IndexMap::new();
    for contact in contacts {
        let account = contact.account_name.as_deref().unwrap_or(NO_ACCOUNT_LABEL);
        *groups.entry(account.to_string()).or_insert(0) += 1;
    }
    groups
}

fn has_role(contact: &Contact, role: &str) -> bool {
    contact.contact_role.as_deref() == Some(role)
}

/// Contacts whose role is one of [`KEY_CONTACT_ROLES`].
pub fn key_contacts(contacts: &[Contact]) -> Vec<&Contact> {
    contacts
        .iter()
        .filter(|c| KEY_CONTACT_ROLES.iter().any(|role| has_role(c, role)))
        .collect()
}

/// Engagement count per status, in first-seen order.
pub fn engagement_status_counts(engagements: &[Engagement]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for eng in engagements {
        let status = eng.engagement_status.as_deref().unwrap_or(UNKNOWN_LABEL);
        *counts.entry(status.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Contacts whose role is [`CONTRACTOR_ROLE`].
pub fn contractor_pool(contacts: &[Contact]) -> Vec<&Contact> {
    contacts
        .iter()
        .filter(|c| has_role(c, CONTRACTOR_ROLE))
        .collect()
}

/// Contractors whose status is [`AVAILABLE_STATUS`].
pub fn available_contractors<'a>(pool: &[&'a Contact]) -> Vec<&'a Contact> {
    pool.iter()
        .copied()
        .filter(|c| c.contractor_status.as_deref() == Some(AVAILABLE_STATUS))
        .collect()
}

/// Mean over present values; zero when there are none.
pub fn mean_of_present(values: impl IntoIterator<Item = Option<f64>>) -> (f64, usize) {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        (0.0, 0)
    } else {
        (sum / count as f64, count)
    }
}

/// Engagement rate averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateAverages {
    pub margin_percent: f64,
    pub bill_rate: f64,
    pub cost_rate: f64,
    /// How many engagements carry a margin value.
    pub with_margin: usize,
}

pub fn rate_averages(engagements: &[Engagement]) -> RateAverages {
    let (margin_percent, with_margin) = mean_of_present(engagements.iter().map(|e| e.margin_percent));
    let (bill_rate, _) = mean_of_present(engagements.iter().map(|e| e.bill_rate));
    let (cost_rate, _) = mean_of_present(engagements.iter().map(|e| e.cost_rate));
    RateAverages {
        margin_percent,
        bill_rate,
        cost_rate,
        with_margin,
    }
}

/// Engagements that carry a non-zero bill or cost rate.
pub fn rated_engagements(engagements: &[Engagement]) -> Vec<&Engagement> {
    let nonzero = |v: Option<f64>| v.is_some_and(|x| x != 0.0);
    engagements
        .iter()
        .filter(|e| nonzero(e.bill_rate) || nonzero(e.cost_rate))
        .collect()
}

/// Convenience bundle of every aggregate the prompts use.
#[derive(Debug, Clone)]
pub struct Aggregates<'a> {
    pub pipeline_total: f64,
    pub stages: IndexMap<String, f64>,
    pub contacts_by_account: IndexMap<String, usize>,
    pub key_contacts: Vec<&'a Contact>,
    pub status_counts: IndexMap<String, usize>,
    pub contractors: Vec<&'a Contact>,
    pub available: Vec<&'a Contact>,
    pub rates: RateAverages,
}

impl<'a> Aggregates<'a> {
    pub fn compute(data: &'a CrmData) -> Self {
        let contractors = contractor_pool(&data.contacts);
        let available = available_contractors(&contractors);
        Self {
            pipeline_total: pipeline_total(&data.opportunities),
            stages: stage_distribution(&data.opportunities),
            contacts_by_account: contacts_by_account(&data.contacts),
            key_contacts: key_contacts(&data.contacts),
            status_counts: engagement_status_counts(&data.engagements),
            contractors,
            available,
            rates: rate_averages(&data.engagements),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn pipeline_total_skips_missing_amounts() {
        let opps = vec![
            opportunity("1", Some("Prospecting"), Some(10_000.0)),
            opportunity("2", Some("Prospecting"), None),
            opportunity("3", Some("Closed Won"), Some(2_500.5)),
        ];
        assert_eq!(pipeline_total(&opps), 12_500.5);
        assert_eq!(pipeline_total(&[]), 0.0);
    }

    #[test]
    fn stage_distribution_keeps_first_seen_order() {
        let opps = vec![
            opportunity("1", Some("Negotiation"), Some(5.0)),
            opportunity("2", None, Some(7.0)),
            opportunity("3", Some("Prospecting"), None),
            opportunity("4", Some("Negotiation"), Some(1.0)),
        ];
        let stages = stage_distribution(&opps);
        let keys: Vec<&str> = stages.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Negotiation", "Unknown", "Prospecting"]);
        assert_eq!(stages["Negotiation"], 6.0);
        assert_eq!(stages["Unknown"], 7.0);
        assert_eq!(stages["Prospecting"], 0.0);
    }

    #[test]
    fn contacts_group_under_no_account() {
        let contacts = vec![
            contact("1", Some("Acme"), None, None),
            contact("2", None, None, None),
            contact("3", Some("Acme"), None, None),
        ];
        let groups = contacts_by_account(&contacts);
        assert_eq!(groups["Acme"], 2);
        assert_eq!(groups[NO_ACCOUNT_LABEL], 1);
    }

    #[test]
    fn role_filters() {
        let contacts = vec![
            contact("1", None, Some("Decision Maker"), None),
            contact("2", None, Some("Contractor"), Some("Available")),
            contact("3", None, Some("Contractor"), Some("Engaged")),
            contact("4", None, Some("Client Stakeholder"), None),
            contact("5", None, None, Some("Available")),
        ];
        let key: Vec<&str> = key_contacts(&contacts).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(key, vec!["1", "4"]);

        let pool = contractor_pool(&contacts);
        assert_eq!(pool.len(), 2);
        let available = available_contractors(&pool);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, "2");
    }

    #[test]
    fn status_histogram_counts_unknown() {
        let engs = vec![
            engagement("1", Some("Active"), None, None, None),
            engagement("2", None, None, None, None),
            engagement("3", Some("Active"), None, None, None),
        ];
        let counts = engagement_status_counts(&engs);
        assert_eq!(counts["Active"], 2);
        assert_eq!(counts[UNKNOWN_LABEL], 1);
    }

    #[test]
    fn averages_use_present_values_only() {
        let engs = vec![
            engagement("1", None, Some(150.0), Some(100.0), Some(33.3)),
            engagement("2", None, None, Some(80.0), None),
            engagement("3", None, Some(130.0), None, Some(40.0)),
        ];
        let rates = rate_averages(&engs);
        assert_eq!(rates.bill_rate, 140.0);
        assert_eq!(rates.cost_rate, 90.0);
        assert!((rates.margin_percent - 36.65).abs() < 1e-9);
        assert_eq!(rates.with_margin, 2);
    }

    #[test]
    fn averages_are_zero_without_values() {
        let engs = vec![engagement("1", None, None, None, None)];
        assert_eq!(rate_averages(&engs), RateAverages::default());
        assert_eq!(rate_averages(&[]), RateAverages::default());
    }

    #[test]
    fn rated_engagements_ignore_zero_rates() {
        let engs = vec![
            engagement("1", None, Some(0.0), None, None),
            engagement("2", None, None, Some(90.0), None),
            engagement("3", None, None, None, None),
        ];
        let rated: Vec<&str> = rated_engagements(&engs).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(rated, vec!["2"]);
    }
}
