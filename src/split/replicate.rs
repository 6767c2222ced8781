//! Builds one output document per section.
//!
//! Formatting is copied through closed tables of attribute descriptors rather
//! than by probing: [`RunFormatting`] and [`ParagraphFormatting`] expose each
//! attribute the source has (`get` returns `None` when it does not) and
//! validate what the destination accepts (`set` returns [`FormatError`]).
//! Every attribute is copied on its own; a rejected one is reported and the
//! rest of the run or paragraph is still copied.

use crate::docx::STYLES_PART;
use crate::error::{Error, FormatError};
use crate::model::{
    Alignment, Color, Document, LineSpacing, Paragraph, ParagraphFormat, Run, RunFormat,
    StyleKind, Underline, VertAlign,
};

use super::SplitObserver;
use super::partition::Section;

/// Word's largest indent and paragraph spacing: 22 inches.
const MAX_TWIPS: i32 = 31_680;

const THEME_COLORS: &[&str] = &[
    "dark1",
    "light1",
    "dark2",
    "light2",
    "accent1",
    "accent2",
    "accent3",
    "accent4",
    "accent5",
    "accent6",
    "hyperlink",
    "followedHyperlink",
    "background1",
    "text1",
    "background2",
    "text2",
    "none",
];

const HIGHLIGHT_COLORS: &[&str] = &[
    "yellow",
    "green",
    "cyan",
    "magenta",
    "red",
    "blue",
    "darkYellow",
    "darkGreen",
    "darkCyan",
    "darkMagenta",
    "darkRed",
    "darkBlue",
    "lightGray",
    "darkGray",
    "black",
    "white",
    "none",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunAttribute {
    Bold,
    Italic,
    Underline,
    AllCaps,
    DoubleStrike,
    Emboss,
    Imprint,
    Outline,
    Shadow,
    SmallCaps,
    Strike,
    Subscript,
    Superscript,
    FontName,
    FontSize,
    Color,
    Highlight,
}

impl RunAttribute {
    pub fn name(self) -> &'static str {
        match self {
            RunAttribute::Bold => "bold",
            RunAttribute::Italic => "italic",
            RunAttribute::Underline => "underline",
            RunAttribute::AllCaps => "all caps",
            RunAttribute::DoubleStrike => "double strike",
            RunAttribute::Emboss => "emboss",
            RunAttribute::Imprint => "imprint",
            RunAttribute::Outline => "outline",
            RunAttribute::Shadow => "shadow",
            RunAttribute::SmallCaps => "small caps",
            RunAttribute::Strike => "strike",
            RunAttribute::Subscript => "subscript",
            RunAttribute::Superscript => "superscript",
            RunAttribute::FontName => "font name",
            RunAttribute::FontSize => "font size",
            RunAttribute::Color => "font color",
            RunAttribute::Highlight => "highlight color",
        }
    }
}

pub const CORE_RUN_ATTRIBUTES: &[RunAttribute] = &[
    RunAttribute::Bold,
    RunAttribute::Italic,
    RunAttribute::Underline,
];

pub const EXTENDED_RUN_ATTRIBUTES: &[RunAttribute] = &[
    RunAttribute::AllCaps,
    RunAttribute::DoubleStrike,
    RunAttribute::Emboss,
    RunAttribute::Imprint,
    RunAttribute::Outline,
    RunAttribute::Shadow,
    RunAttribute::SmallCaps,
    RunAttribute::Strike,
    RunAttribute::Subscript,
    RunAttribute::Superscript,
];

pub const FONT_ATTRIBUTES: &[RunAttribute] = &[
    RunAttribute::FontName,
    RunAttribute::FontSize,
    RunAttribute::Color,
    RunAttribute::Highlight,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParagraphAttribute {
    Alignment,
    FirstLineIndent,
    KeepTogether,
    KeepWithNext,
    LeftIndent,
    LineSpacing,
    RightIndent,
    SpaceAfter,
    SpaceBefore,
}

impl ParagraphAttribute {
    pub fn name(self) -> &'static str {
        match self {
            ParagraphAttribute::Alignment => "alignment",
            ParagraphAttribute::FirstLineIndent => "first line indent",
            ParagraphAttribute::KeepTogether => "keep together",
            ParagraphAttribute::KeepWithNext => "keep with next",
            ParagraphAttribute::LeftIndent => "left indent",
            ParagraphAttribute::LineSpacing => "line spacing",
            ParagraphAttribute::RightIndent => "right indent",
            ParagraphAttribute::SpaceAfter => "space after",
            ParagraphAttribute::SpaceBefore => "space before",
        }
    }
}

pub const PARAGRAPH_FORMAT_ATTRIBUTES: &[ParagraphAttribute] = &[
    ParagraphAttribute::Alignment,
    ParagraphAttribute::FirstLineIndent,
    ParagraphAttribute::KeepTogether,
    ParagraphAttribute::KeepWithNext,
    ParagraphAttribute::LeftIndent,
    ParagraphAttribute::LineSpacing,
    ParagraphAttribute::RightIndent,
    ParagraphAttribute::SpaceAfter,
    ParagraphAttribute::SpaceBefore,
];

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Toggle(bool),
    Underline(Underline),
    Text(String),
    HalfPoints(u32),
    Color(Color),
    Alignment(Alignment),
    Twips(i32),
    LineSpacing(LineSpacing),
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Toggle(_) => "an on/off value",
            AttributeValue::Underline(_) => "an underline style",
            AttributeValue::Text(_) => "text",
            AttributeValue::HalfPoints(_) => "a size",
            AttributeValue::Color(_) => "a color",
            AttributeValue::Alignment(_) => "an alignment",
            AttributeValue::Twips(_) => "a length",
            AttributeValue::LineSpacing(_) => "a line spacing",
        }
    }
}

fn mismatch(attribute: &'static str, value: &AttributeValue) -> FormatError {
    FormatError::Mismatch {
        attribute,
        value: value.kind(),
    }
}

fn twips_in_range(attribute: &'static str, value: i32, min: i32) -> Result<i32, FormatError> {
    if (min..=MAX_TWIPS).contains(&value) {
        Ok(value)
    } else {
        Err(FormatError::OutOfRange {
            attribute,
            value: value.into(),
        })
    }
}

/// Read/write access to run formatting, one attribute at a time.
pub trait RunFormatting {
    /// `None` when the attribute is not set on this run.
    fn get(&self, attr: RunAttribute) -> Option<AttributeValue>;
    fn set(&mut self, attr: RunAttribute, value: AttributeValue) -> Result<(), FormatError>;
}

impl RunFormat {
    fn toggle_mut(&mut self, attr: RunAttribute) -> Option<&mut Option<bool>> {
        match attr {
            RunAttribute::Bold => Some(&mut self.bold),
            RunAttribute::Italic => Some(&mut self.italic),
            RunAttribute::AllCaps => Some(&mut self.all_caps),
            RunAttribute::DoubleStrike => Some(&mut self.double_strike),
            RunAttribute::Emboss => Some(&mut self.emboss),
            RunAttribute::Imprint => Some(&mut self.imprint),
            RunAttribute::Outline => Some(&mut self.outline),
            RunAttribute::Shadow => Some(&mut self.shadow),
            RunAttribute::SmallCaps => Some(&mut self.small_caps),
            RunAttribute::Strike => Some(&mut self.strike),
            _ => None,
        }
    }

    fn set_vertical(&mut self, align: VertAlign, on: bool) {
        if on {
            self.vertical_align = Some(align);
        } else if self.vertical_align == Some(align) {
            self.vertical_align = None;
        }
    }
}

impl RunFormatting for RunFormat {
    fn get(&self, attr: RunAttribute) -> Option<AttributeValue> {
        match attr {
            RunAttribute::Underline => self.underline.clone().map(AttributeValue::Underline),
            RunAttribute::Subscript => self
                .vertical_align
                .map(|v| AttributeValue::Toggle(v == VertAlign::Subscript)),
            RunAttribute::Superscript => self
                .vertical_align
                .map(|v| AttributeValue::Toggle(v == VertAlign::Superscript)),
            RunAttribute::FontName => self.font_name.clone().map(AttributeValue::Text),
            RunAttribute::FontSize => self.font_size.map(AttributeValue::HalfPoints),
            RunAttribute::Color => self.color.clone().map(AttributeValue::Color),
            RunAttribute::Highlight => self.highlight.clone().map(AttributeValue::Text),
            toggle => {
                let value = match toggle {
                    RunAttribute::Bold => self.bold,
                    RunAttribute::Italic => self.italic,
                    RunAttribute::AllCaps => self.all_caps,
                    RunAttribute::DoubleStrike => self.double_strike,
                    RunAttribute::Emboss => self.emboss,
                    RunAttribute::Imprint => self.imprint,
                    RunAttribute::Outline => self.outline,
                    RunAttribute::Shadow => self.shadow,
                    RunAttribute::SmallCaps => self.small_caps,
                    _ => self.strike,
                };
                value.map(AttributeValue::Toggle)
            }
        }
    }

    fn set(&mut self, attr: RunAttribute, value: AttributeValue) -> Result<(), FormatError> {
        match (attr, value) {
            (RunAttribute::Underline, AttributeValue::Underline(u)) => self.underline = Some(u),
            (RunAttribute::Subscript, AttributeValue::Toggle(on)) => {
                self.set_vertical(VertAlign::Subscript, on)
            }
            (RunAttribute::Superscript, AttributeValue::Toggle(on)) => {
                self.set_vertical(VertAlign::Superscript, on)
            }
            (RunAttribute::FontName, AttributeValue::Text(name)) => {
                if name.trim().is_empty() {
                    return Err(FormatError::Mismatch {
                        attribute: attr.name(),
                        value: "an empty name",
                    });
                }
                self.font_name = Some(name);
            }
            (RunAttribute::FontSize, AttributeValue::HalfPoints(size)) => {
                if !(2..=3276).contains(&size) {
                    return Err(FormatError::FontSize(size));
                }
                self.font_size = Some(size);
            }
            (RunAttribute::Color, AttributeValue::Color(color)) => {
                if let Color::Theme(theme) = &color
                    && !THEME_COLORS.contains(&theme.as_str())
                {
                    return Err(FormatError::ThemeColor(theme.clone()));
                }
                self.color = Some(color);
            }
            (RunAttribute::Highlight, AttributeValue::Text(name)) => {
                if !HIGHLIGHT_COLORS.contains(&name.as_str()) {
                    return Err(FormatError::Highlight(name));
                }
                self.highlight = Some(name);
            }
            (toggle, AttributeValue::Toggle(on)) => match self.toggle_mut(toggle) {
                Some(slot) => *slot = Some(on),
                None => return Err(mismatch(toggle.name(), &AttributeValue::Toggle(on))),
            },
            (attr, value) => return Err(mismatch(attr.name(), &value)),
        }
        Ok(())
    }
}

/// Read/write access to paragraph format properties, one at a time.
pub trait ParagraphFormatting {
    fn get(&self, attr: ParagraphAttribute) -> Option<AttributeValue>;
    fn set(&mut self, attr: ParagraphAttribute, value: AttributeValue) -> Result<(), FormatError>;
}

impl ParagraphFormatting for ParagraphFormat {
    fn get(&self, attr: ParagraphAttribute) -> Option<AttributeValue> {
        match attr {
            ParagraphAttribute::Alignment => self.alignment.map(AttributeValue::Alignment),
            ParagraphAttribute::FirstLineIndent => {
                self.first_line_indent.map(AttributeValue::Twips)
            }
            ParagraphAttribute::KeepTogether => self.keep_together.map(AttributeValue::Toggle),
            ParagraphAttribute::KeepWithNext => self.keep_with_next.map(AttributeValue::Toggle),
            ParagraphAttribute::LeftIndent => self.left_indent.map(AttributeValue::Twips),
            ParagraphAttribute::LineSpacing => self.line_spacing.map(AttributeValue::LineSpacing),
            ParagraphAttribute::RightIndent => self.right_indent.map(AttributeValue::Twips),
            ParagraphAttribute::SpaceAfter => self
                .space_after
                .map(|v| AttributeValue::Twips(v.min(i32::MAX as u32) as i32)),
            ParagraphAttribute::SpaceBefore => self
                .space_before
                .map(|v| AttributeValue::Twips(v.min(i32::MAX as u32) as i32)),
        }
    }

    fn set(&mut self, attr: ParagraphAttribute, value: AttributeValue) -> Result<(), FormatError> {
        let name = attr.name();
        match (attr, value) {
            (ParagraphAttribute::Alignment, AttributeValue::Alignment(a)) => {
                self.alignment = Some(a)
            }
            (ParagraphAttribute::FirstLineIndent, AttributeValue::Twips(v)) => {
                self.first_line_indent = Some(twips_in_range(name, v, -MAX_TWIPS)?)
            }
            (ParagraphAttribute::KeepTogether, AttributeValue::Toggle(on)) => {
                self.keep_together = Some(on)
            }
            (ParagraphAttribute::KeepWithNext, AttributeValue::Toggle(on)) => {
                self.keep_with_next = Some(on)
            }
            (ParagraphAttribute::LeftIndent, AttributeValue::Twips(v)) => {
                self.left_indent = Some(twips_in_range(name, v, -MAX_TWIPS)?)
            }
            (ParagraphAttribute::RightIndent, AttributeValue::Twips(v)) => {
                self.right_indent = Some(twips_in_range(name, v, -MAX_TWIPS)?)
            }
            (ParagraphAttribute::SpaceAfter, AttributeValue::Twips(v)) => {
                self.space_after = Some(twips_in_range(name, v, 0)? as u32)
            }
            (ParagraphAttribute::SpaceBefore, AttributeValue::Twips(v)) => {
                self.space_before = Some(twips_in_range(name, v, 0)? as u32)
            }
            (ParagraphAttribute::LineSpacing, AttributeValue::LineSpacing(spacing)) => {
                match spacing {
                    LineSpacing::Auto(multiple) if !(multiple.is_finite() && multiple > 0.0) => {
                        return Err(FormatError::LineSpacing(multiple));
                    }
                    LineSpacing::Exact(t) | LineSpacing::AtLeast(t) if t > MAX_TWIPS as u32 => {
                        return Err(FormatError::OutOfRange {
                            attribute: name,
                            value: t.into(),
                        });
                    }
                    _ => {}
                }
                self.line_spacing = Some(spacing);
            }
            (_, value) => return Err(mismatch(name, &value)),
        }
        Ok(())
    }
}

/// Copies every attribute in `attrs` that `source` has onto `target`.
/// Returns the attributes that were refused, with the reason.
pub fn copy_run_attributes(
    source: &impl RunFormatting,
    target: &mut impl RunFormatting,
    attrs: &[RunAttribute],
) -> Vec<(RunAttribute, FormatError)> {
    let mut refused = Vec::new();
    for &attr in attrs {
        let Some(value) = source.get(attr) else {
            continue;
        };
        if let Err(e) = target.set(attr, value) {
            refused.push((attr, e));
        }
    }
    refused
}

pub fn copy_paragraph_attributes(
    source: &impl ParagraphFormatting,
    target: &mut impl ParagraphFormatting,
    attrs: &[ParagraphAttribute],
) -> Vec<(ParagraphAttribute, FormatError)> {
    let mut refused = Vec::new();
    for &attr in attrs {
        let Some(value) = source.get(attr) else {
            continue;
        };
        if let Err(e) = target.set(attr, value) {
            refused.push((attr, e));
        }
    }
    refused
}

/// Turns a [`Section`] of `source` into a standalone document shaped by
/// `template`.
pub struct Replicator<'a> {
    source: &'a Document,
    template: &'a Document,
    observer: &'a dyn SplitObserver,
}

impl<'a> Replicator<'a> {
    pub fn new(
        source: &'a Document,
        template: &'a Document,
        observer: &'a dyn SplitObserver,
    ) -> Self {
        Replicator {
            source,
            template,
            observer,
        }
    }

    /// The template's styles and page setup with the section's heading and
    /// non-blank content paragraphs. Attribute problems are reported and
    /// skipped; only a structurally unusable section is an error.
    pub fn replicate(&self, section: &Section<'_>) -> Result<Document, Error> {
        if section.title.trim().is_empty() {
            return Err(Error::Section {
                title: section.safe_title.clone(),
                reason: "heading text is empty".into(),
            });
        }

        let mut doc = self.template.without_paragraphs();
        let heading = self.heading_paragraph(&mut doc, section);
        doc.push_paragraph(heading);

        for para in &section.content {
            if para.is_blank() || para.text() == section.title {
                continue;
            }
            let copy = self.copy_paragraph(&mut doc, para, &section.safe_title);
            doc.push_paragraph(copy);
        }
        log::debug!(
            "Section '{}' replicated with {} paragraphs",
            section.safe_title,
            doc.paragraphs.len()
        );
        Ok(doc)
    }

    fn warn(&self, section: &str, what: &str, err: &FormatError) {
        let message = format!("Section '{section}': could not copy {what}: {err}");
        log::warn!("{message}");
        self.observer.status(&message);
    }

    fn heading_paragraph(&self, doc: &mut Document, section: &Section<'_>) -> Paragraph {
        let name = format!("Heading {}", section.level);
        let style_id = if let Some(style) = doc.style_named(&name, StyleKind::Paragraph) {
            style.id.clone()
        } else if let Some(style) = self.source.style_named(&name, StyleKind::Paragraph) {
            let id = style.id.clone();
            match self.copy_style(doc, &id) {
                Ok(id) => id,
                Err(e) => {
                    self.warn(&section.safe_title, "heading style", &e);
                    format!("Heading{}", section.level)
                }
            }
        } else {
            log::debug!("Neither template nor source defines '{name}'");
            format!("Heading{}", section.level)
        };
        Paragraph::styled(&style_id, &section.title)
    }

    /// A style the template lacks can only be imported when the template has
    /// a styles part to append it to.
    fn copy_style(&self, doc: &mut Document, id: &str) -> Result<String, FormatError> {
        if doc.style(id).is_none() && !doc.package.contains(STYLES_PART) {
            return Err(FormatError::NoStylesPart(id.to_string()));
        }
        doc.import_style(self.source, id)?;
        Ok(id.to_string())
    }

    fn copy_run(&self, doc: &mut Document, run: &Run, section: &str) -> Run {
        let mut target = Run::new(&run.text);
        for tier in [CORE_RUN_ATTRIBUTES, EXTENDED_RUN_ATTRIBUTES, FONT_ATTRIBUTES] {
            for (attr, err) in copy_run_attributes(&run.format, &mut target.format, tier) {
                self.warn(section, attr.name(), &err);
            }
        }
        if let Some(id) = &run.style_id {
            match self.copy_style(doc, id) {
                Ok(id) => target.style_id = Some(id),
                Err(e) => self.warn(section, "run style", &e),
            }
        }
        target
    }

    fn copy_paragraph(&self, doc: &mut Document, para: &Paragraph, section: &str) -> Paragraph {
        let mut target = Paragraph::default();
        for run in &para.runs {
            let copy = self.copy_run(doc, run, section);
            target.runs.push(copy);
        }

        if let Some(id) = &para.style_id {
            match self.copy_style(doc, id) {
                Ok(id) => target.style_id = Some(id),
                Err(e) => self.warn(section, "paragraph style", &e),
            }
        }
        target.shading = para.shading.clone();
        for (attr, err) in
            copy_paragraph_attributes(&para.format, &mut target.format, PARAGRAPH_FORMAT_ATTRIBUTES)
        {
            self.warn(section, attr.name(), &err);
        }
        target
    }
}
