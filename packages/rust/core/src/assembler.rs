//! Document assembly: narrative text and raw data into layout blocks.
//!
//! The block sequence is a pure function of its inputs (the report date is
//! passed in), so identical inputs always produce identical documents.

use chrono::NaiveDate;

use crmreport_pdf::{Block, INCH, MetricCell, MetricGrid, Table};
use crmreport_shared::{CrmData, DataSummary, ReportLabels};

use crate::enrichment::NarrativeSections;
use crate::format::{currency, truncate};
use crate::prompts::SectionKind;

/// Rows shown per appendix table.
pub const APPENDIX_ROW_LIMIT: usize = 15;

const APPENDIX_TITLE: &str = "Appendix: Data Summary";
const MISSING: &str = "-";

// ---------------------------------------------------------------------------
// Paragraph classification
// ---------------------------------------------------------------------------

/// How one narrative paragraph is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphKind {
    /// `# Heading` or `**Heading**`, markers stripped.
    Header(String),
    /// A `[Priority: ...]` recommendation item.
    EmphasizedBody(String),
    /// `-` / `*` list; one entry per non-empty line, markers stripped.
    BulletLines(Vec<String>),
    /// Plain text, not yet escaped.
    Body(String),
}

/// Classify a trimmed, non-empty paragraph. First matching rule wins.
pub fn classify_paragraph(para: &str) -> ParagraphKind {
    if para.starts_with('#') {
        return ParagraphKind::Header(para.trim_start_matches('#').trim().to_string());
    }
    if para.len() >= 4 && para.starts_with("**") && para.ends_with("**") {
        return ParagraphKind::Header(para.trim_matches('*').trim().to_string());
    }
    if para.starts_with("[Priority:") {
        return ParagraphKind::EmphasizedBody(para.to_string());
    }
    if para.starts_with('-') || para.starts_with('*') {
        let lines = para
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*']).trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        return ParagraphKind::BulletLines(lines);
    }
    ParagraphKind::Body(para.to_string())
}

/// Escape `&`, `<` and `>`. Ampersand goes first so the entities it
/// introduces are not escaped again.
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Blocks for one narrative section: header, classified paragraphs, trailing gap.
pub fn section_blocks(title: &str, content: &str) -> Vec<Block> {
    let mut blocks = vec![Block::SectionHeader(title.to_string())];

    for para in content.trim().split("\n\n").map(str::trim) {
        if para.is_empty() {
            continue;
        }
        match classify_paragraph(para) {
            ParagraphKind::Header(text) => blocks.push(Block::SubsectionHeader(text)),
            ParagraphKind::EmphasizedBody(text) => {
                blocks.push(Block::Spacer(6.0));
                blocks.push(Block::EmphasizedBody(text));
            }
            ParagraphKind::BulletLines(lines) => {
                blocks.extend(lines.into_iter().map(Block::BulletItem));
            }
            ParagraphKind::Body(text) => blocks.push(Block::Body(escape_markup(&text))),
        }
    }

    blocks.push(Block::Spacer(12.0));
    blocks
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Assemble the full report in its fixed section order.
pub fn assemble(
    sections: &NarrativeSections,
    data: &CrmData,
    labels: &ReportLabels,
    date: NaiveDate,
) -> Vec<Block> {
    let mut blocks = cover_page(&data.summary(), labels, date);
    blocks.push(Block::PageBreak);

    let section = |kind: SectionKind| section_blocks(kind.title(), &sections.get(kind).as_text());

    blocks.extend(section(SectionKind::ExecutiveSummary));
    blocks.push(Block::PageBreak);
    blocks.extend(section(SectionKind::PipelineAnalysis));
    blocks.extend(section(SectionKind::ClientInsights));
    blocks.push(Block::PageBreak);
    blocks.extend(section(SectionKind::StaffingOverview));
    blocks.extend(section(SectionKind::MarginAnalysis));
    blocks.push(Block::PageBreak);
    blocks.extend(section(SectionKind::Recommendations));
    blocks.push(Block::PageBreak);

    blocks.extend(appendix(data));
    blocks
}

fn cover_page(summary: &DataSummary, labels: &ReportLabels, date: NaiveDate) -> Vec<Block> {
    let metric = |value: usize, label: &str| MetricCell::new(value.to_string(), label);
    let grid = MetricGrid {
        rows: vec![
            vec![
                metric(summary.total_accounts, "Accounts"),
                metric(summary.total_contacts, "Contacts"),
                metric(summary.total_opportunities, "Opportunities"),
            ],
            vec![
                metric(summary.total_projects, "Projects"),
                metric(summary.total_engagements, "Engagements"),
                MetricCell::blank(),
            ],
        ],
        column_width: 2.2 * INCH,
        row_height: 0.9 * INCH,
    };

    vec![
        Block::Spacer(1.5 * INCH),
        Block::Title(labels.title.clone()),
        Block::SectionHeader(labels.subtitle.clone()),
        Block::Spacer(0.5 * INCH),
        Block::Body(format!("Generated: {}", date.format("%B %d, %Y"))),
        Block::Spacer(INCH),
        Block::MetricGrid(grid),
        Block::Spacer(INCH),
        Block::Caption(labels.attribution.clone()),
    ]
}

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(MISSING)
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn appendix(data: &CrmData) -> Vec<Block> {
    let mut blocks = vec![Block::SectionHeader(APPENDIX_TITLE.to_string())];

    if !data.accounts.is_empty() {
        let mut table = Table::new(&["Name", "Type", "Industry", "NDA", "MSA"], &[2.0, 1.2, 1.5, 0.6, 0.6]);
        for acc in data.accounts.iter().take(APPENDIX_ROW_LIMIT) {
            table.push_row(vec![
                truncate(&acc.name, 30),
                or_missing(acc.account_type.as_deref()).to_string(),
                or_missing(acc.industry.as_deref()).to_string(),
                yes_no(acc.nda_signed),
                yes_no(acc.msa_signed),
            ]);
        }
        blocks.push(Block::SubsectionHeader("Accounts".into()));
        blocks.push(Block::Table(table));
        blocks.push(Block::Spacer(12.0));
    }

    if !data.opportunities.is_empty() {
        let mut table = Table::new(
            &["Name", "Account", "Stage", "Amount", "Close Date"],
            &[1.8, 1.4, 1.2, 0.9, 0.9],
        );
        for opp in data.opportunities.iter().take(APPENDIX_ROW_LIMIT) {
            table.push_row(vec![
                truncate(&opp.name, 25),
                truncate(or_missing(opp.account_name.as_deref()), 20),
                or_missing(opp.stage.as_deref()).to_string(),
                opp.amount.map_or_else(|| MISSING.to_string(), currency),
                or_missing(opp.close_date.as_deref()).to_string(),
            ]);
        }
        blocks.push(Block::SubsectionHeader("Opportunities".into()));
        blocks.push(Block::Table(table));
        blocks.push(Block::Spacer(12.0));
    }

    if !data.engagements.is_empty() {
        let mut table = Table::new(
            &["Contractor", "Client", "Role", "Status", "Margin"],
            &[1.5, 1.4, 1.2, 1.0, 0.8],
        );
        for eng in data.engagements.iter().take(APPENDIX_ROW_LIMIT) {
            table.push_row(vec![
                truncate(or_missing(eng.contractor_name.as_deref()), 20),
                truncate(or_missing(eng.client_account_name.as_deref()), 18),
                truncate(or_missing(eng.engagement_role.as_deref()), 15),
                truncate(or_missing(eng.engagement_status.as_deref()), 12),
                eng.margin_percent
                    .map_or_else(|| MISSING.to_string(), |m| format!("{m:.1}%")),
            ]);
        }
        blocks.push(Block::SubsectionHeader("Contractor Engagements".into()));
        blocks.push(Block::Table(table));
        blocks.push(Block::Spacer(12.0));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use crmreport_shared::Account;

    use super::*;
    use crate::aggregate::fixtures::*;
    use crate::enrichment::{Narrative, placeholder_sections};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn account(name: &str) -> Account {
        Account {
            id: format!("001{name}"),
            name: name.into(),
            account_type: None,
            industry: Some("Healthcare".into()),
            website: None,
            nda_signed: true,
            msa_signed: false,
            notes: None,
        }
    }

    #[test]
    fn classifies_headers() {
        assert_eq!(classify_paragraph("## Key Risks"), ParagraphKind::Header("Key Risks".into()));
        assert_eq!(classify_paragraph("**Key Risks**"), ParagraphKind::Header("Key Risks".into()));
    }

    #[test]
    fn classifies_priority_items() {
        let para = "[Priority: High] - Close the Acme renewal\nSchedule a call this week.";
        assert_eq!(classify_paragraph(para), ParagraphKind::EmphasizedBody(para.into()));
    }

    #[test]
    fn bullet_paragraph_splits_per_line() {
        assert_eq!(
            classify_paragraph("- item one\n- item two"),
            ParagraphKind::BulletLines(vec!["item one".into(), "item two".into()])
        );
        assert_eq!(
            classify_paragraph("* a\n\n  -- b"),
            ParagraphKind::BulletLines(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn bold_prefix_without_closing_marker_is_a_bullet() {
        assert_eq!(
            classify_paragraph("**Note:** margins are thin"),
            ParagraphKind::BulletLines(vec!["Note:** margins are thin".into()])
        );
    }

    #[test]
    fn escapes_ampersand_first() {
        assert_eq!(escape_markup("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_markup("&lt;"), "&amp;lt;");
    }

    #[test]
    fn section_renders_each_paragraph_kind() {
        let content = "\nIntro text with R&D.\n\n**Key Risks**\n\n- item one\n- item two\n\n[Priority: High] - Act now\n";
        let blocks = section_blocks("Pipeline Analysis", content);
        assert_eq!(
            blocks,
            vec![
                Block::SectionHeader("Pipeline Analysis".into()),
                Block::Body("Intro text with R&amp;D.".into()),
                Block::SubsectionHeader("Key Risks".into()),
                Block::BulletItem("item one".into()),
                Block::BulletItem("item two".into()),
                Block::Spacer(6.0),
                Block::EmphasizedBody("[Priority: High] - Act now".into()),
                Block::Spacer(12.0),
            ]
        );
    }

    #[test]
    fn unavailable_section_renders_sentinel_as_body() {
        let blocks = section_blocks(
            "Margin Analysis",
            &Narrative::Unavailable("timeout".into()).as_text(),
        );
        assert_eq!(
            blocks[1],
            Block::Body("[Analysis unavailable due to API error: timeout]".into())
        );
    }

    #[test]
    fn assembly_is_deterministic() {
        let mut data = CrmData::empty();
        data.opportunities = vec![opportunity("1", Some("Prospecting"), Some(1.0))];
        let sections = placeholder_sections(&data.summary(), date());
        let labels = ReportLabels::default();

        assert_eq!(
            assemble(&sections, &data, &labels, date()),
            assemble(&sections, &data, &labels, date())
        );
    }

    #[test]
    fn empty_dataset_with_ai_skipped() {
        let data = CrmData::empty();
        let sections = placeholder_sections(&data.summary(), date());
        let blocks = assemble(&sections, &data, &ReportLabels::default(), date());

        let grid = blocks
            .iter()
            .find_map(|b| match b {
                Block::MetricGrid(g) => Some(g),
                _ => None,
            })
            .unwrap();
        let values: Vec<&str> = grid
            .rows
            .iter()
            .flatten()
            .filter(|c| !c.is_blank())
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(values, vec!["0"; 5]);

        let headers: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::SectionHeader(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            headers,
            vec![
                "CRM Intelligence Report",
                "Executive Summary",
                "Pipeline Analysis",
                "Client Insights",
                "Staffing Overview",
                "Margin Analysis",
                "Strategic Recommendations",
                APPENDIX_TITLE,
            ]
        );

        for topic in [
            "pipeline insights",
            "client insights",
            "staffing analysis",
            "margin analysis",
            "strategic recommendations",
        ] {
            let expected = format!("AI analysis skipped. Enable AI enrichment for {topic}.");
            assert!(blocks.contains(&Block::Body(expected)));
        }

        assert!(!blocks.iter().any(|b| matches!(b, Block::Table(_))));
        assert_eq!(blocks.last(), Some(&Block::SectionHeader(APPENDIX_TITLE.into())));
        assert_eq!(blocks.iter().filter(|b| **b == Block::PageBreak).count(), 5);
    }

    #[test]
    fn appendix_formats_and_truncates() {
        let mut data = CrmData::empty();
        data.accounts = (0..20)
            .map(|i| account(&format!("Enterprise Holdings International Group {i}")))
            .collect();
        data.opportunities = vec![
            opportunity("1", None, None),
            opportunity("2", Some("Closed Won"), Some(0.0)),
            opportunity("3", Some("Negotiation"), Some(1_234_567.0)),
        ];
        data.engagements = vec![engagement("1", Some("Active"), None, None, Some(42.34))];

        let blocks = appendix(&data);
        let tables: Vec<&Table> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(tables.len(), 3);

        let accounts = tables[0];
        assert_eq!(accounts.rows.len(), APPENDIX_ROW_LIMIT);
        assert_eq!(accounts.rows[0][0].chars().count(), 30);
        assert_eq!(accounts.rows[0][1..], ["-", "Healthcare", "Yes", "No"]);

        let opps = tables[1];
        assert_eq!(opps.rows[0][2], "-");
        assert_eq!(opps.rows[0][3], "-");
        assert_eq!(opps.rows[1][3], "$0");
        assert_eq!(opps.rows[2][3], "$1,234,567");

        let engs = tables[2];
        assert_eq!(engs.rows[0], vec!["Grace Hopper", "Acme", "Developer", "Active", "42.3%"]);
    }
}
