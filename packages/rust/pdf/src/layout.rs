//! Pagination: flows layout blocks top-to-bottom onto fixed-size pages.
//!
//! The paginator produces positioned draw operations only. Page furniture
//! such as footers is added by the per-page callback passed to
//! [`Paginator::paginate`], so it never appears in the block stream.

use crate::blocks::{
    Align, Block, Font, GRID_COLOR, INCH, MetricGrid, RgbColor, SHADE_COLOR,
    TABLE_HEADER_COLOR, TABLE_TEXT_COLOR, Table, TextStyle, unescape_markup,
};

/// Table body font size.
const TABLE_BODY_SIZE: f32 = 8.0;
/// Table header font size.
const TABLE_HEADER_SIZE: f32 = 9.0;
/// Horizontal cell padding.
const CELL_PADDING_X: f32 = 6.0;
/// Vertical padding above and below body cells.
const BODY_PADDING_Y: f32 = 4.0;
/// Vertical padding above and below header cells.
const HEADER_PADDING_Y: f32 = 8.0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Page size and margins, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// US Letter with 0.75in margins.
    pub const LETTER: Self = Self {
        width: 8.5 * INCH,
        height: 11.0 * INCH,
        margin: 0.75 * INCH,
    };

    fn frame_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn bottom(&self) -> f32 {
        self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::LETTER
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A positioned drawing primitive. Coordinates are points from the bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: RgbColor,
        text: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: RgbColor,
    },
    /// Filled rectangle anchored at its bottom-left corner.
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: RgbColor,
    },
}

/// One laid-out page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    fn new(number: usize) -> Self {
        Self {
            number,
            ops: Vec::new(),
        }
    }

    /// All text drawn on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Line { .. } | DrawOp::Fill { .. } => None,
        })
    }
}

/// Centered footer reading `<label> - Page <n>`, 0.5in above the page edge.
pub fn page_footer(label: &str, geometry: PageGeometry) -> impl FnMut(&mut Page) + '_ {
    move |page: &mut Page| {
        let style = TextStyle::FOOTER;
        let text = format!("{label} - Page {}", page.number);
        let width = text_width(&text, style.size, style.font);
        page.ops.push(DrawOp::Text {
            x: (geometry.width - width) / 2.0,
            y: 0.5 * INCH,
            size: style.size,
            font: style.font,
            color: style.color,
            text,
        });
    }
}

// ---------------------------------------------------------------------------
// Text metrics
// ---------------------------------------------------------------------------

/// Approximate advance width of `text` in a Helvetica face.
///
/// Built-in PDF fonts ship without metrics here, so widths are estimated from
/// character classes. Close enough for wrapping and centering.
pub fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            ' ' | 'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' | ':' | ';' | 'I' => 0.278,
            'f' | 't' | 'r' | '(' | ')' | '-' | '[' | ']' | '/' => 0.333,
            'm' | 'M' | 'W' | '%' => 0.833,
            'w' => 0.722,
            c if c.is_ascii_digit() => 0.556,
            c if c.is_uppercase() => 0.667,
            _ => 0.556,
        })
        .sum();
    let bold_factor = match font {
        Font::Regular => 1.0,
        Font::Bold => 1.06,
    };
    em * size * bold_factor
}

/// Greedy word wrap. Words wider than the line are placed on their own line.
pub fn wrap_text(text: &str, max_width: f32, size: f32, font: Font) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width(&candidate, size, font) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// Paginator
// ---------------------------------------------------------------------------

/// Flows blocks onto pages of a fixed geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    geometry: PageGeometry,
}

impl Paginator {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    /// Lay out `blocks`, calling `on_page` once for every finished page.
    ///
    /// Always yields at least one page. A page break on an empty page is a no-op.
    pub fn paginate<F>(&self, blocks: &[Block], mut on_page: F) -> Vec<Page>
    where
        F: FnMut(&mut Page),
    {
        let mut flow = Flow::new(self.geometry);

        for block in blocks {
            match block {
                Block::PageBreak => flow.break_page(),
                Block::Spacer(height) => flow.space(*height),
                Block::MetricGrid(grid) => flow.metric_grid(grid),
                Block::Table(table) => flow.table(table),
                Block::Title(text)
                | Block::SectionHeader(text)
                | Block::SubsectionHeader(text)
                | Block::Body(text)
                | Block::EmphasizedBody(text)
                | Block::Caption(text) => {
                    if let Some(style) = block.text_style() {
                        flow.paragraph(&unescape_markup(text), style, None);
                    }
                }
                Block::BulletItem(text) => {
                    flow.paragraph(&unescape_markup(text), TextStyle::BULLET, Some("-"));
                }
            }
        }

        let mut pages = flow.finish();
        for page in &mut pages {
            on_page(page);
        }
        pages
    }
}

/// Background treatment of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Header,
    Shaded,
    Plain,
}

/// Mutable layout cursor.
struct Flow {
    geometry: PageGeometry,
    pages: Vec<Page>,
    current: Page,
    /// Distance of the cursor from the bottom of the page.
    y: f32,
    /// A spacer ran past the bottom margin. The next page opens only once
    /// something is drawn, so trailing space never produces a blank page.
    overflowed: bool,
}

impl Flow {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Page::new(1),
            y: geometry.top(),
            overflowed: false,
        }
    }

    fn at_page_top(&self) -> bool {
        self.current.ops.is_empty()
    }

    fn new_page(&mut self) {
        let next = Page::new(self.current.number + 1);
        self.pages.push(std::mem::replace(&mut self.current, next));
        self.y = self.geometry.top();
        self.overflowed = false;
    }

    fn break_page(&mut self) {
        if self.at_page_top() {
            self.y = self.geometry.top();
            self.overflowed = false;
        } else {
            self.new_page();
        }
    }

    /// Called before drawing a block: settle a pending spacer overflow.
    fn resume(&mut self) {
        if self.overflowed {
            self.break_page();
        }
    }

    /// Make sure `height` points fit below the cursor.
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < self.geometry.bottom() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn space(&mut self, height: f32) {
        self.y -= height;
        if self.y < self.geometry.bottom() {
            self.overflowed = true;
        }
    }

    fn paragraph(&mut self, text: &str, style: TextStyle, bullet: Option<&str>) {
        let left = self.geometry.margin + style.indent;
        let bullet_gap = if bullet.is_some() { 10.0 } else { 0.0 };
        let width = self.geometry.frame_width() - style.indent - bullet_gap;
        let lines = wrap_text(text, width, style.size, style.font);
        if lines.is_empty() {
            return;
        }

        self.resume();
        if !self.at_page_top() {
            self.y -= style.space_before;
        }

        for (i, line) in lines.into_iter().enumerate() {
            self.ensure_room(style.leading);
            let baseline = self.y - style.size;

            if i == 0 {
                if let Some(glyph) = bullet {
                    self.text(left, baseline, style, glyph.to_string());
                }
            }

            let x = match style.align {
                Align::Left => left + bullet_gap,
                Align::Center => {
                    left + (width - text_width(&line, style.size, style.font)).max(0.0) / 2.0
                }
            };
            self.text(x, baseline, style, line);
            self.y -= style.leading;
        }

        if style.underline_rule {
            let rule_y = self.y - 2.0;
            self.rule(
                (self.geometry.margin, rule_y),
                (self.geometry.width - self.geometry.margin, rule_y),
                1.0,
                GRID_COLOR,
            );
            self.y -= 4.0;
        }

        self.y -= style.space_after;
    }

    fn metric_grid(&mut self, grid: &MetricGrid) {
        let cols = grid.rows.iter().map(Vec::len).max().unwrap_or(0);
        let total_height = grid.row_height * grid.rows.len() as f32;
        let total_width = grid.column_width * cols as f32;
        if cols == 0 {
            return;
        }

        self.resume();
        self.ensure_room(total_height);
        let left = self.geometry.margin + (self.geometry.frame_width() - total_width).max(0.0) / 2.0;
        let top = self.y;
        self.fill(left, top - total_height, total_width, total_height, SHADE_COLOR);

        for (r, row) in grid.rows.iter().enumerate() {
            let row_top = top - grid.row_height * r as f32;
            let center_y = row_top - grid.row_height / 2.0;
            for (c, cell) in row.iter().enumerate() {
                if cell.is_blank() {
                    continue;
                }
                let center_x = left + grid.column_width * (c as f32 + 0.5);
                let value = TextStyle::METRIC_VALUE;
                let label = TextStyle::METRIC_LABEL;
                self.centered(center_x, center_y + 2.0, value, &cell.value);
                self.centered(center_x, center_y - label.leading, label, &cell.label);
            }
        }

        // Box and inner grid.
        for r in 0..=grid.rows.len() {
            let y = top - grid.row_height * r as f32;
            self.rule((left, y), (left + total_width, y), 0.5, GRID_COLOR);
        }
        for c in 0..=cols {
            let x = left + grid.column_width * c as f32;
            self.rule((x, top), (x, top - total_height), 0.5, GRID_COLOR);
        }

        self.y = top - total_height;
    }

    fn table(&mut self, table: &Table) {
        let header_height = TABLE_HEADER_SIZE + 2.0 * HEADER_PADDING_Y;
        let row_height = TABLE_BODY_SIZE + 2.0 * BODY_PADDING_Y;

        self.resume();
        self.ensure_room(header_height + row_height);
        self.table_row(&table.header, &table.column_widths, header_height, RowKind::Header);
        for (i, row) in table.rows.iter().enumerate() {
            self.ensure_room(row_height);
            let kind = if i % 2 == 0 {
                RowKind::Shaded
            } else {
                RowKind::Plain
            };
            self.table_row(row, &table.column_widths, row_height, kind);
        }
    }

    fn table_row(&mut self, cells: &[String], widths: &[f32], height: f32, kind: RowKind) {
        let header = kind == RowKind::Header;
        let (size, font, color, padding) = if header {
            (TABLE_HEADER_SIZE, Font::Bold, RgbColor::WHITE, HEADER_PADDING_Y)
        } else {
            (TABLE_BODY_SIZE, Font::Regular, TABLE_TEXT_COLOR, BODY_PADDING_Y)
        };
        let left = self.geometry.margin;
        let right = left + widths.iter().sum::<f32>();
        let top = self.y;
        let baseline = top - padding - size;

        let background = match kind {
            RowKind::Header => Some(TABLE_HEADER_COLOR),
            RowKind::Shaded => Some(SHADE_COLOR),
            RowKind::Plain => None,
        };
        if let Some(fill) = background {
            self.fill(left, top - height, right - left, height, fill);
        }

        let mut x = left;
        for (cell, width) in cells.iter().zip(widths) {
            self.current.ops.push(DrawOp::Text {
                x: x + CELL_PADDING_X,
                y: baseline,
                size,
                font,
                color,
                text: cell.clone(),
            });
            x += width;
        }

        let rule_width = if header { 1.0 } else { 0.5 };
        self.rule((left, top), (right, top), rule_width, GRID_COLOR);
        self.rule((left, top - height), (right, top - height), rule_width, GRID_COLOR);
        let mut x = left;
        self.rule((x, top), (x, top - height), 0.5, GRID_COLOR);
        for width in widths {
            x += width;
            self.rule((x, top), (x, top - height), 0.5, GRID_COLOR);
        }

        self.y = top - height;
    }

    fn centered(&mut self, center_x: f32, y: f32, style: TextStyle, text: &str) {
        if text.is_empty() {
            return;
        }
        let width = text_width(text, style.size, style.font);
        self.text(center_x - width / 2.0, y, style, text.to_string());
    }

    fn text(&mut self, x: f32, y: f32, style: TextStyle, text: String) {
        self.current.ops.push(DrawOp::Text {
            x,
            y,
            size: style.size,
            font: style.font,
            color: style.color,
            text,
        });
    }

    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: RgbColor) {
        self.current.ops.push(DrawOp::Fill {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: RgbColor) {
        self.current.ops.push(DrawOp::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::MetricCell;

    fn body(text: &str) -> Block {
        Block::Body(text.into())
    }

    #[test]
    fn wrap_respects_width() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let lines = wrap_text(text, 100.0, 10.0, Font::Regular);
        assert!(lines.len() > 1);
        for line in &lines {
            let single_word = !line.contains(' ');
            assert!(single_word || text_width(line, 10.0, Font::Regular) <= 100.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_collapses_internal_newlines() {
        assert_eq!(wrap_text("one\ntwo", 500.0, 10.0, Font::Regular), vec!["one two"]);
        assert!(wrap_text("   ", 500.0, 10.0, Font::Regular).is_empty());
    }

    #[test]
    fn empty_document_still_has_one_page() {
        let pages = Paginator::default().paginate(&[], |_| {});
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
    }

    #[test]
    fn page_breaks_split_pages_but_not_twice() {
        let blocks = vec![
            body("first"),
            Block::PageBreak,
            Block::PageBreak,
            body("second"),
            Block::PageBreak,
        ];
        let pages = Paginator::default().paginate(&blocks, |_| {});
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].texts().collect::<Vec<_>>(), vec!["first"]);
        assert_eq!(pages[1].texts().collect::<Vec<_>>(), vec!["second"]);
    }

    #[test]
    fn long_content_overflows_onto_new_pages() {
        let blocks: Vec<Block> = (0..120).map(|i| body(&format!("paragraph {i}"))).collect();
        let pages = Paginator::default().paginate(&blocks, |_| {});
        assert!(pages.len() > 1);
        let count: usize = pages.iter().map(|p| p.texts().count()).sum();
        assert_eq!(count, 120);
    }

    #[test]
    fn footer_callback_runs_per_page() {
        let blocks = vec![body("a"), Block::PageBreak, body("b"), Block::PageBreak, body("c")];
        let pages = Paginator::default().paginate(
            &blocks,
            page_footer("Force Multiply CRM Report", PageGeometry::LETTER),
        );
        assert_eq!(pages.len(), 3);
        for page in &pages {
            let expected = format!("Force Multiply CRM Report - Page {}", page.number);
            assert!(page.texts().any(|t| t == expected));
        }
    }

    #[test]
    fn body_entities_are_decoded_when_drawn() {
        let pages = Paginator::default().paginate(&[body("R&amp;D &lt;core&gt;")], |_| {});
        assert_eq!(pages[0].texts().collect::<Vec<_>>(), vec!["R&D <core>"]);
    }

    #[test]
    fn bullet_items_draw_glyph_and_indent() {
        let pages = Paginator::default().paginate(&[Block::BulletItem("item one".into())], |_| {});
        let texts: Vec<&str> = pages[0].texts().collect();
        assert_eq!(texts, vec!["-", "item one"]);

        let xs: Vec<f32> = pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert!(xs[0] > PageGeometry::LETTER.margin);
        assert!(xs[1] > xs[0]);
    }

    #[test]
    fn metric_grid_skips_blank_cells() {
        let grid = MetricGrid {
            rows: vec![vec![MetricCell::new("3", "Accounts"), MetricCell::blank()]],
            column_width: 2.2 * INCH,
            row_height: 0.9 * INCH,
        };
        let pages = Paginator::default().paginate(&[Block::MetricGrid(grid)], |_| {});
        assert_eq!(pages[0].texts().collect::<Vec<_>>(), vec!["3", "Accounts"]);
    }

    #[test]
    fn table_draws_header_and_rows() {
        let mut table = Table::new(&["Name", "Stage"], &[2.0, 1.0]);
        table.push_row(vec!["Acme".into(), "Closed Won".into()]);
        let pages = Paginator::default().paginate(&[Block::Table(table)], |_| {});
        let texts: Vec<&str> = pages[0].texts().collect();
        assert_eq!(texts, vec!["Name", "Stage", "Acme", "Closed Won"]);
    }

    fn fills(page: &Page) -> Vec<RgbColor> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn table_header_is_filled_and_rows_alternate() {
        let mut table = Table::new(&["Name"], &[2.5]);
        for name in ["Acme", "Globex", "Initech"] {
            table.push_row(vec![name.into()]);
        }
        let pages = Paginator::default().paginate(&[Block::Table(table)], |_| {});

        assert_eq!(fills(&pages[0]), vec![TABLE_HEADER_COLOR, SHADE_COLOR, SHADE_COLOR]);

        let header = pages[0].ops.iter().find_map(|op| match op {
            DrawOp::Text { text, color, font, .. } if text == "Name" => Some((*color, *font)),
            _ => None,
        });
        assert_eq!(header, Some((RgbColor::WHITE, Font::Bold)));

        // Fills precede the text they sit under.
        let first_fill = pages[0].ops.iter().position(|op| matches!(op, DrawOp::Fill { .. }));
        let first_text = pages[0].ops.iter().position(|op| matches!(op, DrawOp::Text { .. }));
        assert!(first_fill < first_text);
    }

    #[test]
    fn metric_grid_has_shaded_background() {
        let grid = MetricGrid {
            rows: vec![vec![MetricCell::new("3", "Accounts"), MetricCell::new("5", "Contacts")]],
            column_width: 2.2 * INCH,
            row_height: 0.9 * INCH,
        };
        let pages = Paginator::default().paginate(&[Block::MetricGrid(grid)], |_| {});
        assert_eq!(fills(&pages[0]), vec![SHADE_COLOR]);
        match pages[0].ops.first() {
            Some(DrawOp::Fill { width, height, .. }) => {
                assert!((width - 4.4 * INCH).abs() < 0.01);
                assert!((height - 0.9 * INCH).abs() < 0.01);
            }
            other => panic!("expected background fill first, got {other:?}"),
        }
    }

    #[test]
    fn trailing_spacer_never_adds_a_blank_page() {
        for lead in 0..4 {
            for rows in 25..45 {
                let mut blocks: Vec<Block> = (0..lead).map(|i| body(&format!("lead {i}"))).collect();
                blocks.push(Block::SubsectionHeader("Active Pipeline".into()));
                let mut table = Table::new(&["Name", "Stage"], &[2.5, 1.5]);
                for r in 0..rows {
                    table.push_row(vec![format!("Deal {r}"), "Prospecting".into()]);
                }
                blocks.push(Block::Table(table));
                blocks.push(Block::Spacer(12.0));

                let pages = Paginator::default().paginate(&blocks, |_| {});
                for page in &pages {
                    assert!(
                        page.texts().count() > 0,
                        "page {} of {} is blank with {lead} lead paragraphs and {rows} rows",
                        page.number,
                        pages.len()
                    );
                }
            }
        }
    }

    #[test]
    fn content_after_overflowing_spacer_starts_next_page() {
        let blocks = vec![body("top"), Block::Spacer(2000.0), body("after")];
        let pages = Paginator::default().paginate(&blocks, |_| {});
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].texts().collect::<Vec<_>>(), vec!["after"]);

        let baseline = pages[1].ops.iter().find_map(|op| match op {
            DrawOp::Text { y, .. } => Some(*y),
            _ => None,
        });
        let top = PageGeometry::LETTER.height - PageGeometry::LETTER.margin;
        assert_eq!(baseline, Some(top - TextStyle::BODY.size));
    }
}
