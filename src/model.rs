use std::collections::{BTreeSet, HashSet};

use crate::docx::{Package, escape_xml};
use crate::error::FormatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

#[derive(Clone, Debug)]
pub struct Style {
    pub id: String,
    /// UI name: built-in lowercase names ("heading 1") are exposed the way
    /// Word shows them ("Heading 1").
    pub name: String,
    pub kind: StyleKind,
    /// Style id of the parent, not its name.
    pub based_on: Option<String>,
    pub is_default: bool,
    /// The `<w:style>` element as written in the source styles part.
    pub(crate) xml: String,
    /// Set when the style was pulled in from another document and still has to
    /// be appended to this document's styles part on write.
    pub(crate) imported: bool,
}

impl Style {
    pub fn paragraph(id: &str, name: &str) -> Self {
        Self::synthesized(id, name, StyleKind::Paragraph, None)
    }

    pub fn character(id: &str, name: &str) -> Self {
        Self::synthesized(id, name, StyleKind::Character, None)
    }

    pub fn based_on(self, parent_id: &str) -> Self {
        Self::synthesized(&self.id, &self.name, self.kind, Some(parent_id))
    }

    fn synthesized(id: &str, name: &str, kind: StyleKind, based_on: Option<&str>) -> Self {
        let type_attr = match kind {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
            StyleKind::Numbering => "numbering",
        };
        let mut xml = format!(
            r#"<w:style w:type="{type_attr}" w:styleId="{}"><w:name w:val="{}"/>"#,
            escape_xml(id),
            escape_xml(name)
        );
        if let Some(parent) = based_on {
            xml.push_str(&format!(r#"<w:basedOn w:val="{}"/>"#, escape_xml(parent)));
        }
        xml.push_str("</w:style>");
        Style {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            based_on: based_on.map(str::to_string),
            is_default: false,
            xml,
            imported: false,
        }
    }
}

/// A loaded word-processing document: style table plus the arena of
/// top-level body paragraphs, addressed by index.
#[derive(Clone, Debug)]
pub struct Document {
    pub styles: Vec<Style>,
    pub paragraphs: Vec<Paragraph>,
    pub(crate) package: Package,
}

impl Document {
    /// Minimal empty document with `Normal`, `Title` and `Heading 1`..`Heading 9`.
    pub fn blank() -> Self {
        crate::docx::blank()
    }

    pub fn style(&self, id: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.id == id)
    }

    pub fn style_named(&self, name: &str, kind: StyleKind) -> Option<&Style> {
        self.styles
            .iter()
            .find(|s| s.kind == kind && s.name == name)
    }

    pub fn default_paragraph_style(&self) -> Option<&Style> {
        self.styles
            .iter()
            .find(|s| s.kind == StyleKind::Paragraph && s.is_default)
    }

    /// The paragraph's own style, falling back to the default paragraph style
    /// when it has none or names an id this document does not define.
    pub fn paragraph_style(&self, paragraph: &Paragraph) -> Option<&Style> {
        paragraph
            .style_id
            .as_deref()
            .and_then(|id| self.style(id))
            .filter(|s| s.kind == StyleKind::Paragraph)
            .or_else(|| self.default_paragraph_style())
    }

    /// Compacts the arena, dropping every index in `indices`. Out-of-range
    /// indices are ignored. Returns how many paragraphs were removed.
    pub fn remove_paragraphs(&mut self, indices: &BTreeSet<usize>) -> usize {
        let before = self.paragraphs.len();
        let mut idx = 0;
        self.paragraphs.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
        before - self.paragraphs.len()
    }

    /// Deep copy that keeps styles, page setup and package parts but no body
    /// paragraphs.
    pub fn without_paragraphs(&self) -> Document {
        Document {
            styles: self.styles.clone(),
            paragraphs: Vec::new(),
            package: self.package.clone(),
        }
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.paragraphs.push(paragraph);
    }

    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Makes style `id` available in this document, copying it (and any
    /// missing `basedOn` ancestors) from `source` when needed.
    pub(crate) fn import_style(&mut self, source: &Document, id: &str) -> Result<(), FormatError> {
        if self.style(id).is_some() {
            return Ok(());
        }
        let mut seen = HashSet::new();
        let mut next = Some(id.to_string());
        while let Some(current) = next.take() {
            if !seen.insert(current.clone()) || self.style(&current).is_some() {
                break;
            }
            let Some(style) = source.style(&current) else {
                if current == id {
                    return Err(FormatError::MissingStyle(id.to_string()));
                }
                // Dangling basedOn in the source.
                break;
            };
            let mut style = style.clone();
            style.imported = true;
            style.is_default = false;
            next = style.based_on.clone();
            log::debug!("Importing style '{}' ({})", style.name, style.id);
            self.styles.push(style);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineSpacing {
    Auto(f32),    // multiplier (e.g. 1.0 = single, 1.15 = default)
    Exact(u32),   // fixed height in twips
    AtLeast(u32), // minimum height in twips
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    /// Twips; negative values are a hanging indent.
    pub first_line_indent: Option<i32>,
    pub keep_together: Option<bool>,
    pub keep_with_next: Option<bool>,
    pub left_indent: Option<i32>,
    pub right_indent: Option<i32>,
    pub line_spacing: Option<LineSpacing>,
    pub space_before: Option<u32>,
    pub space_after: Option<u32>,
}

/// `w:shd` with its raw attribute values ("clear", "auto", "FFFF00", ...).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shading {
    pub pattern: Option<String>,
    pub color: Option<String>,
    pub fill: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub style_id: Option<String>,
    pub runs: Vec<Run>,
    pub format: ParagraphFormat,
    pub shading: Option<Shading>,
}

impl Paragraph {
    pub fn new(text: &str) -> Self {
        Paragraph {
            runs: vec![Run::new(text)],
            ..Default::default()
        }
    }

    pub fn styled(style_id: &str, text: &str) -> Self {
        Paragraph {
            style_id: Some(style_id.to_string()),
            ..Paragraph::new(text)
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertAlign {
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Underline {
    None,
    Single,
    /// Any other `w:u` value ("double", "wave", ...).
    Styled(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Rgb([u8; 3]),
    /// Theme color reference such as "accent1" or "text1".
    Theme(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<Underline>,
    pub all_caps: Option<bool>,
    pub double_strike: Option<bool>,
    pub emboss: Option<bool>,
    pub imprint: Option<bool>,
    pub outline: Option<bool>,
    pub shadow: Option<bool>,
    pub small_caps: Option<bool>,
    pub strike: Option<bool>,
    pub vertical_align: Option<VertAlign>,
    pub font_name: Option<String>,
    /// Half-points, as stored in `w:sz`.
    pub font_size: Option<u32>,
    pub color: Option<Color>,
    pub highlight: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub style_id: Option<String>,
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: &str) -> Self {
        Run {
            text: text.to_string(),
            ..Default::default()
        }
    }
}
