//! Layout block model and the fixed report style sheet.

/// Points per inch.
pub const INCH: f32 = 72.0;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const WHITE: Self = Self(0xff, 0xff, 0xff);
}

/// The two built-in faces the report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Paragraph style: font, spacing and color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub indent: f32,
    pub align: Align,
    pub color: RgbColor,
    /// Draw a light rule under the text.
    pub underline_rule: bool,
}

impl TextStyle {
    const fn base(font: Font, size: f32, color: RgbColor) -> Self {
        Self {
            font,
            size,
            leading: size * 1.2,
            space_before: 0.0,
            space_after: 0.0,
            indent: 0.0,
            align: Align::Left,
            color,
            underline_rule: false,
        }
    }

    pub const TITLE: Self = Self {
        space_after: 30.0,
        align: Align::Center,
        ..Self::base(Font::Bold, 24.0, RgbColor(0x1a, 0x36, 0x5d))
    };

    pub const SECTION_HEADER: Self = Self {
        space_before: 20.0,
        space_after: 12.0,
        underline_rule: true,
        ..Self::base(Font::Bold, 16.0, RgbColor(0x2c, 0x52, 0x82))
    };

    pub const SUBSECTION_HEADER: Self = Self {
        space_before: 15.0,
        space_after: 8.0,
        ..Self::base(Font::Bold, 13.0, RgbColor(0x4a, 0x55, 0x68))
    };

    pub const BODY: Self = Self {
        leading: 14.0,
        space_before: 6.0,
        space_after: 6.0,
        ..Self::base(Font::Regular, 10.0, RgbColor(0x2d, 0x37, 0x48))
    };

    pub const EMPHASIZED_BODY: Self = Self {
        font: Font::Bold,
        ..Self::BODY
    };

    pub const BULLET: Self = Self {
        indent: 18.0,
        ..Self::BODY
    };

    pub const METRIC_VALUE: Self = Self {
        align: Align::Center,
        ..Self::base(Font::Regular, 18.0, RgbColor(0x2b, 0x6c, 0xb0))
    };

    pub const METRIC_LABEL: Self = Self {
        align: Align::Center,
        ..Self::base(Font::Regular, 9.0, RgbColor(0x71, 0x80, 0x96))
    };

    pub const FOOTER: Self = Self {
        align: Align::Center,
        ..Self::base(Font::Regular, 8.0, RgbColor(0xa0, 0xae, 0xc0))
    };
}

/// Grid and header colors shared by tables and the metric grid.
pub const GRID_COLOR: RgbColor = RgbColor(0xe2, 0xe8, 0xf0);
pub const TABLE_HEADER_COLOR: RgbColor = RgbColor(0x2c, 0x52, 0x82);
pub const TABLE_TEXT_COLOR: RgbColor = RgbColor(0x2d, 0x37, 0x48);
/// Metric grid background and every other table body row.
pub const SHADE_COLOR: RgbColor = RgbColor(0xf7, 0xfa, 0xfc);

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// One metric on the cover grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCell {
    pub value: String,
    pub label: String,
}

impl MetricCell {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// An empty placeholder cell.
    pub fn blank() -> Self {
        Self::new("", "")
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.label.is_empty()
    }
}

/// Rows of metric cells drawn as a boxed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGrid {
    pub rows: Vec<Vec<MetricCell>>,
    pub column_width: f32,
    pub row_height: f32,
}

/// A fixed-column table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Column widths in points.
    pub column_widths: Vec<f32>,
}

impl Table {
    /// Build a table from widths given in inches.
    pub fn new(header: &[&str], widths_in: &[f32]) -> Self {
        Self {
            header: header.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
            column_widths: widths_in.iter().map(|w| w * INCH).collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// One rendering unit consumed by the paginator.
///
/// Text payloads are markup-safe: `&`, `<` and `>` may appear as entities and
/// are decoded when drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Vertical gap in points.
    Spacer(f32),
    Title(String),
    SectionHeader(String),
    SubsectionHeader(String),
    Body(String),
    /// Bold body paragraph (recommendation items).
    EmphasizedBody(String),
    /// Indented body line with a bullet glyph; text excludes the marker.
    BulletItem(String),
    MetricGrid(MetricGrid),
    /// Small centered label.
    Caption(String),
    Table(Table),
    PageBreak,
}

impl Block {
    /// Style for text-bearing blocks.
    pub fn text_style(&self) -> Option<TextStyle> {
        match self {
            Self::Title(_) => Some(TextStyle::TITLE),
            Self::SectionHeader(_) => Some(TextStyle::SECTION_HEADER),
            Self::SubsectionHeader(_) => Some(TextStyle::SUBSECTION_HEADER),
            Self::Body(_) => Some(TextStyle::BODY),
            Self::EmphasizedBody(_) => Some(TextStyle::EMPHASIZED_BODY),
            Self::BulletItem(_) => Some(TextStyle::BULLET),
            Self::Caption(_) => Some(TextStyle::METRIC_LABEL),
            Self::Spacer(_) | Self::MetricGrid(_) | Self::Table(_) | Self::PageBreak => None,
        }
    }
}

/// Decode the three entities body text may carry. `&amp;` goes last so that
/// `&amp;lt;` yields the literal `&lt;`.
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_widths_convert_from_inches() {
        let table = Table::new(&["Name", "Type"], &[2.0, 0.5]);
        assert_eq!(table.column_widths, vec![144.0, 36.0]);
        assert_eq!(table.header, vec!["Name", "Type"]);
    }

    #[test]
    fn unescape_reverses_entities() {
        assert_eq!(unescape_markup("A &amp; B &lt;tag&gt;"), "A & B <tag>");
        assert_eq!(unescape_markup("&amp;lt;"), "&lt;");
    }

    #[test]
    fn styles_follow_block_kind() {
        assert_eq!(Block::Body("x".into()).text_style(), Some(TextStyle::BODY));
        assert_eq!(
            Block::EmphasizedBody("x".into()).text_style().map(|s| s.font),
            Some(Font::Bold)
        );
        assert!(Block::PageBreak.text_style().is_none());
        assert_eq!(TextStyle::BULLET.indent, 18.0);
    }
}
