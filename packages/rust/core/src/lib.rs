//! Report pipeline orchestration and domain logic.
//!
//! This crate turns an extracted CRM snapshot into a finished report:
//! aggregation, per-section prompts, narrative generation and document
//! assembly, tied together by [`pipeline::run_report`].

pub mod aggregate;
pub mod assembler;
pub mod enrichment;
pub mod format;
pub mod pipeline;
pub mod prompts;

pub use enrichment::{ClaudeClient, Narrative, NarrativeGenerator, NarrativeSections};
pub use pipeline::{ProgressReporter, ReportConfig, ReportResult, SilentProgress, run_report};
pub use prompts::{SectionKind, SectionPrompt};
