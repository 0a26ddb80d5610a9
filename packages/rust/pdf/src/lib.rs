//! Report rendering: block model, pagination and PDF output.
//!
//! Callers build a flat list of [`Block`]s; [`render_to_file`] paginates it
//! onto US Letter pages, stamps the footer on every page and writes the PDF
//! atomically.

mod blocks;
mod layout;
mod writer;

use std::path::Path;

use tracing::{info, instrument};

use crmreport_shared::Result;

pub use blocks::{
    Align, Block, Font, GRID_COLOR, INCH, MetricCell, MetricGrid, RgbColor, SHADE_COLOR,
    TABLE_HEADER_COLOR, TABLE_TEXT_COLOR, Table, TextStyle, unescape_markup,
};
pub use layout::{DrawOp, Page, PageGeometry, Paginator, page_footer, text_width, wrap_text};
pub use writer::{to_pdf_bytes, write_atomic};

/// Lay out `blocks` and write them to `path` as a PDF. Returns the page count.
#[instrument(skip_all, fields(path = %path.display(), blocks = blocks.len()))]
pub fn render_to_file(
    blocks: &[Block],
    path: &Path,
    footer_label: &str,
    title: &str,
) -> Result<usize> {
    let geometry = PageGeometry::LETTER;
    let pages = Paginator::new(geometry).paginate(blocks, page_footer(footer_label, geometry));
    let bytes = to_pdf_bytes(&pages, geometry, title)?;
    write_atomic(path, &bytes)?;

    info!(pages = pages.len(), bytes = bytes.len(), "rendered PDF");
    Ok(pages.len())
}
