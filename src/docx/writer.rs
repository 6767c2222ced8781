//! Serializes a [`Document`] back into a DOCX package.
//!
//! Every part of the document's package is copied through unchanged except
//! `word/document.xml`, which is regenerated from the paragraph arena, and
//! `word/styles.xml`, which gains the definitions of any imported styles.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::Error;
use crate::model::{
    Alignment, Color, Document, LineSpacing, Paragraph, ParagraphFormat, Run, RunFormat,
    Underline, VertAlign,
};

use super::{DOCUMENT_PART, STYLES_PART};

pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn write(doc: &Document, path: &Path) -> Result<(), Error> {
    let bytes = to_bytes(doc)?;
    std::fs::write(path, bytes).map_err(|e| Error::io_at(path, e))
}

pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, Error> {
    let document_xml = document_xml(doc);
    let styles_xml = styles_xml(doc)?;

    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in doc.package.parts() {
        let data = match name {
            DOCUMENT_PART => document_xml.as_bytes(),
            STYLES_PART => styles_xml.as_deref().unwrap_or(data),
            _ => data,
        };
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }
    if !doc.package.contains(DOCUMENT_PART) {
        zip.start_file(DOCUMENT_PART, options)?;
        zip.write_all(document_xml.as_bytes())?;
    }

    zip.finish()?;
    Ok(buffer.into_inner())
}

pub(crate) fn document_xml(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.package.document_head.len() + 256 * doc.paragraphs.len());
    out.push_str(&doc.package.document_head);
    out.push_str("<w:body>");
    for paragraph in &doc.paragraphs {
        write_paragraph(&mut out, paragraph);
    }
    if let Some(sect_pr) = &doc.package.section_properties {
        out.push_str(sect_pr);
    }
    out.push_str("</w:body></w:document>");
    out
}

/// `None` when no style was imported and the template's part can be copied
/// byte for byte.
fn styles_xml(doc: &Document) -> Result<Option<Vec<u8>>, Error> {
    let imported: Vec<_> = doc.styles.iter().filter(|s| s.imported).collect();
    if imported.is_empty() {
        return Ok(None);
    }
    let xml = doc.package.text(STYLES_PART)?.ok_or_else(|| {
        Error::InvalidDocx(format!(
            "no styles part to import '{}' into",
            imported[0].id
        ))
    })?;
    let close = xml
        .rfind("</w:styles>")
        .ok_or_else(|| Error::InvalidDocx("styles part has no closing </w:styles>".into()))?;

    let mut out = String::with_capacity(xml.len() + imported.iter().map(|s| s.xml.len()).sum::<usize>());
    out.push_str(&xml[..close]);
    for style in imported {
        out.push_str(&style.xml);
    }
    out.push_str(&xml[close..]);
    Ok(Some(out.into_bytes()))
}

fn toggle(out: &mut String, tag: &str, value: Option<bool>) {
    match value {
        Some(true) => out.push_str(&format!("<w:{tag}/>")),
        Some(false) => out.push_str(&format!(r#"<w:{tag} w:val="0"/>"#)),
        None => {}
    }
}

fn alignment_val(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
        Alignment::Distribute => "distribute",
    }
}

fn write_paragraph_properties(out: &mut String, paragraph: &Paragraph) {
    let ParagraphFormat {
        alignment,
        first_line_indent,
        keep_together,
        keep_with_next,
        left_indent,
        right_indent,
        line_spacing,
        space_before,
        space_after,
    } = &paragraph.format;

    let mut ppr = String::new();
    // Child order follows CT_PPr.
    if let Some(id) = &paragraph.style_id {
        ppr.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, escape_xml(id)));
    }
    toggle(&mut ppr, "keepNext", *keep_with_next);
    toggle(&mut ppr, "keepLines", *keep_together);
    if let Some(shd) = &paragraph.shading {
        ppr.push_str(&format!(
            r#"<w:shd w:val="{}""#,
            escape_xml(shd.pattern.as_deref().unwrap_or("clear"))
        ));
        if let Some(color) = &shd.color {
            ppr.push_str(&format!(r#" w:color="{}""#, escape_xml(color)));
        }
        if let Some(fill) = &shd.fill {
            ppr.push_str(&format!(r#" w:fill="{}""#, escape_xml(fill)));
        }
        ppr.push_str("/>");
    }
    if space_before.is_some() || space_after.is_some() || line_spacing.is_some() {
        ppr.push_str("<w:spacing");
        if let Some(before) = space_before {
            ppr.push_str(&format!(r#" w:before="{before}""#));
        }
        if let Some(after) = space_after {
            ppr.push_str(&format!(r#" w:after="{after}""#));
        }
        match line_spacing {
            Some(LineSpacing::Auto(multiple)) => ppr.push_str(&format!(
                r#" w:line="{}" w:lineRule="auto""#,
                (multiple * 240.0).round() as u32
            )),
            Some(LineSpacing::Exact(twips)) => {
                ppr.push_str(&format!(r#" w:line="{twips}" w:lineRule="exact""#))
            }
            Some(LineSpacing::AtLeast(twips)) => {
                ppr.push_str(&format!(r#" w:line="{twips}" w:lineRule="atLeast""#))
            }
            None => {}
        }
        ppr.push_str("/>");
    }
    if left_indent.is_some() || right_indent.is_some() || first_line_indent.is_some() {
        ppr.push_str("<w:ind");
        if let Some(left) = left_indent {
            ppr.push_str(&format!(r#" w:left="{left}""#));
        }
        if let Some(right) = right_indent {
            ppr.push_str(&format!(r#" w:right="{right}""#));
        }
        match first_line_indent {
            Some(indent) if *indent < 0 => {
                ppr.push_str(&format!(r#" w:hanging="{}""#, indent.unsigned_abs()))
            }
            Some(indent) => ppr.push_str(&format!(r#" w:firstLine="{indent}""#)),
            None => {}
        }
        ppr.push_str("/>");
    }
    if let Some(alignment) = alignment {
        ppr.push_str(&format!(r#"<w:jc w:val="{}"/>"#, alignment_val(*alignment)));
    }

    if !ppr.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&ppr);
        out.push_str("</w:pPr>");
    }
}

fn write_paragraph(out: &mut String, paragraph: &Paragraph) {
    out.push_str("<w:p>");
    write_paragraph_properties(out, paragraph);
    for run in &paragraph.runs {
        write_run(out, run);
    }
    out.push_str("</w:p>");
}

fn write_run_properties(out: &mut String, run: &Run) {
    let RunFormat {
        bold,
        italic,
        underline,
        all_caps,
        double_strike,
        emboss,
        imprint,
        outline,
        shadow,
        small_caps,
        strike,
        vertical_align,
        font_name,
        font_size,
        color,
        highlight,
    } = &run.format;

    let mut rpr = String::new();
    // Child order follows CT_RPr.
    if let Some(id) = &run.style_id {
        rpr.push_str(&format!(r#"<w:rStyle w:val="{}"/>"#, escape_xml(id)));
    }
    if let Some(name) = font_name {
        let name = escape_xml(name);
        rpr.push_str(&format!(r#"<w:rFonts w:ascii="{name}" w:hAnsi="{name}"/>"#));
    }
    toggle(&mut rpr, "b", *bold);
    toggle(&mut rpr, "i", *italic);
    toggle(&mut rpr, "caps", *all_caps);
    toggle(&mut rpr, "smallCaps", *small_caps);
    toggle(&mut rpr, "strike", *strike);
    toggle(&mut rpr, "dstrike", *double_strike);
    toggle(&mut rpr, "outline", *outline);
    toggle(&mut rpr, "shadow", *shadow);
    toggle(&mut rpr, "emboss", *emboss);
    toggle(&mut rpr, "imprint", *imprint);
    match color {
        Some(Color::Rgb([r, g, b])) => {
            rpr.push_str(&format!(r#"<w:color w:val="{r:02X}{g:02X}{b:02X}"/>"#))
        }
        Some(Color::Theme(theme)) => rpr.push_str(&format!(
            r#"<w:color w:val="auto" w:themeColor="{}"/>"#,
            escape_xml(theme)
        )),
        None => {}
    }
    if let Some(size) = font_size {
        rpr.push_str(&format!(r#"<w:sz w:val="{size}"/>"#));
    }
    if let Some(highlight) = highlight {
        rpr.push_str(&format!(r#"<w:highlight w:val="{}"/>"#, escape_xml(highlight)));
    }
    match underline {
        Some(Underline::None) => rpr.push_str(r#"<w:u w:val="none"/>"#),
        Some(Underline::Single) => rpr.push_str(r#"<w:u w:val="single"/>"#),
        Some(Underline::Styled(val)) => {
            rpr.push_str(&format!(r#"<w:u w:val="{}"/>"#, escape_xml(val)))
        }
        None => {}
    }
    if let Some(valign) = vertical_align {
        let val = match valign {
            VertAlign::Baseline => "baseline",
            VertAlign::Superscript => "superscript",
            VertAlign::Subscript => "subscript",
        };
        rpr.push_str(&format!(r#"<w:vertAlign w:val="{val}"/>"#));
    }

    if !rpr.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(&rpr);
        out.push_str("</w:rPr>");
    }
}

fn flush_text(out: &mut String, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    out.push_str(r#"<w:t xml:space="preserve">"#);
    out.push_str(&escape_xml(pending));
    out.push_str("</w:t>");
    pending.clear();
}

fn write_run(out: &mut String, run: &Run) {
    out.push_str("<w:r>");
    write_run_properties(out, run);
    let mut pending = String::new();
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush_text(out, &mut pending);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush_text(out, &mut pending);
                out.push_str("<w:br/>");
            }
            _ => pending.push(ch),
        }
    }
    flush_text(out, &mut pending);
    out.push_str("</w:r>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::parse_bytes;
    use crate::model::{Shading, Style};

    fn formatted_paragraph() -> Paragraph {
        let mut run = Run::new("a < b\tc\nd & e");
        run.style_id = Some("Strong".into());
        run.format = RunFormat {
            bold: Some(true),
            italic: Some(false),
            underline: Some(Underline::Styled("wave".into())),
            small_caps: Some(true),
            vertical_align: Some(VertAlign::Subscript),
            font_name: Some("Courier New".into()),
            font_size: Some(24),
            color: Some(Color::Rgb([0x12, 0xAB, 0x00])),
            highlight: Some("green".into()),
            ..Default::default()
        };
        Paragraph {
            style_id: Some("Quote".into()),
            runs: vec![run],
            format: ParagraphFormat {
                alignment: Some(Alignment::Justify),
                first_line_indent: Some(-240),
                keep_together: Some(true),
                keep_with_next: Some(false),
                left_indent: Some(360),
                right_indent: Some(0),
                line_spacing: Some(LineSpacing::Exact(300)),
                space_before: Some(0),
                space_after: Some(200),
            },
            shading: Some(Shading {
                pattern: Some("clear".into()),
                color: Some("auto".into()),
                fill: Some("D9D9D9".into()),
            }),
        }
    }

    #[test]
    fn test_paragraph_survives_write_and_parse() {
        let mut doc = Document::blank();
        let paragraph = formatted_paragraph();
        doc.push_paragraph(paragraph.clone());

        let reparsed = parse_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert_eq!(reparsed.paragraphs, vec![paragraph]);
    }

    #[test]
    fn test_escaping() {
        let mut out = String::new();
        write_run(&mut out, &Run::new("<&>"));
        assert_eq!(
            out,
            r#"<w:r><w:t xml:space="preserve">&lt;&amp;&gt;</w:t></w:r>"#
        );
    }

    #[test]
    fn test_imported_styles_are_appended() {
        let mut source = Document::blank();
        source.styles.push(Style::paragraph("Callout", "Callout"));
        let mut doc = Document::blank();
        doc.import_style(&source, "Callout").unwrap();

        let styles = styles_xml(&doc).unwrap().unwrap();
        let styles = String::from_utf8(styles).unwrap();
        assert!(styles.contains(r#"w:styleId="Callout""#));
        assert!(styles.trim_end().ends_with("</w:styles>"));

        let reparsed = parse_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert!(reparsed.style("Callout").is_some());
    }

    #[test]
    fn test_unchanged_styles_are_not_rewritten() {
        assert!(styles_xml(&Document::blank()).unwrap().is_none());
    }

    #[test]
    fn test_broken_styles_part_fails_import() {
        let mut source = Document::blank();
        source.styles.push(Style::paragraph("Callout", "Callout"));
        let mut doc = Document::blank();
        doc.package.set(STYLES_PART, b"<w:styles>".to_vec());
        doc.import_style(&source, "Callout").unwrap();
        assert!(matches!(to_bytes(&doc), Err(Error::InvalidDocx(_))));
    }
}
