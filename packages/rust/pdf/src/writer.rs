//! PDF serialization of laid-out pages and atomic file output.

use std::path::Path;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
    Rgb,
};
use tracing::debug;

use crmreport_shared::{ReportError, Result};

use crate::blocks::{Font, RgbColor};
use crate::layout::{DrawOp, Page, PageGeometry};

const LAYER_NAME: &str = "Layer 1";

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn color(c: RgbColor) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(c.0) / 255.0,
        f32::from(c.1) / 255.0,
        f32::from(c.2) / 255.0,
        None,
    ))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
        }
    }
}

/// Serialize `pages` into a PDF document.
pub fn to_pdf_bytes(pages: &[Page], geometry: PageGeometry, title: &str) -> Result<Vec<u8>> {
    let width = mm(geometry.width);
    let height = mm(geometry.height);
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, LAYER_NAME);

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("failed to load font: {e}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("failed to load font: {e}")))?,
    };

    for (i, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, LAYER_NAME)
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        draw_page(&layer, page, &fonts);
    }

    doc.save_to_bytes()
        .map_err(|e| ReportError::Render(format!("failed to serialize PDF: {e}")))
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) {
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color: c,
                text,
            } => {
                layer.set_fill_color(color(*c));
                layer.use_text(text.as_str(), *size, mm(*x), mm(*y), fonts.get(*font));
            }
            DrawOp::Line {
                from,
                to,
                width,
                color: c,
            } => {
                layer.set_outline_color(color(*c));
                layer.set_outline_thickness(*width);
                layer.add_line(Line {
                    points: vec![
                        (Point::new(mm(from.0), mm(from.1)), false),
                        (Point::new(mm(to.0), mm(to.1)), false),
                    ],
                    is_closed: false,
                });
            }
            DrawOp::Fill {
                x,
                y,
                width,
                height,
                color: c,
            } => {
                layer.set_fill_color(color(*c));
                let corners = [(*x, *y), (x + width, *y), (x + width, y + height), (*x, y + height)];
                layer.add_polygon(Polygon {
                    rings: vec![
                        corners
                            .iter()
                            .map(|(px, py)| (Point::new(mm(*px), mm(*py)), false))
                            .collect(),
                    ],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                });
            }
        }
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| ReportError::validation(format!("not a file path: {}", path.display())))?
        .to_string_lossy();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| ReportError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ReportError::io(path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Block, Table};
    use crate::layout::Paginator;

    #[test]
    fn serializes_multi_page_document() {
        let blocks = vec![
            Block::Title("Report".into()),
            Block::PageBreak,
            Block::Body("Second page".into()),
        ];
        let pages = Paginator::default().paginate(&blocks, |_| {});
        let bytes = to_pdf_bytes(&pages, PageGeometry::LETTER, "Report").expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn serializes_filled_table_backgrounds() {
        let mut table = Table::new(&["Account", "Stage"], &[2.5, 1.5]);
        table.push_row(vec!["Acme".into(), "Closed Won".into()]);
        table.push_row(vec!["Globex".into(), "Prospecting".into()]);
        let pages = Paginator::default().paginate(&[Block::Table(table)], |_| {});
        assert!(pages[0].ops.iter().any(|op| matches!(op, DrawOp::Fill { .. })));

        let bytes = to_pdf_bytes(&pages, PageGeometry::LETTER, "Report").expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn atomic_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.pdf");

        write_atomic(&target, b"%PDF-1.3 test").expect("write");

        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.3 test");
        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pdf");
        std::fs::write(&target, b"old").unwrap();

        write_atomic(&target, b"new").expect("write");
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
