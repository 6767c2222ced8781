mod package;
mod styles;
pub mod writer;

use std::io::Cursor;
use std::path::Path;

use crate::config::MAX_HEADING_LEVEL;
use crate::error::Error;
use crate::model::{
    Alignment, Color, Document, LineSpacing, Paragraph, ParagraphFormat, Run, RunFormat, Shading,
    Underline, VertAlign,
};

pub use package::Package;
pub use writer::{to_bytes, write};

pub(crate) use writer::escape_xml;

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const STYLES_PART: &str = "word/styles.xml";

pub(super) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Parse a WML boolean toggle element (e.g., w:b, w:i, w:strike).
/// Present with no val or val != "0"/"false"/"off" means true.
pub(super) fn wml_bool(parent: roxmltree::Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false" && v != "off")
    })
}

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(super) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<i32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v.round() as i32)
}

fn parse_alignment(val: &str) -> Option<Alignment> {
    match val {
        "left" | "start" => Some(Alignment::Left),
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "both" => Some(Alignment::Justify),
        "distribute" => Some(Alignment::Distribute),
        _ => None,
    }
}

pub fn parse(path: &Path) -> Result<Document, Error> {
    let file = std::fs::File::open(path).map_err(|e| Error::io_at(path, e))?;
    let package = Package::from_reader(std::io::BufReader::new(file))?;
    let doc = from_package(package)?;
    log::debug!(
        "Parsed {}: {} paragraphs, {} styles",
        path.display(),
        doc.paragraphs.len(),
        doc.styles.len()
    );
    Ok(doc)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Document, Error> {
    from_package(Package::from_reader(Cursor::new(bytes))?)
}

pub(crate) fn from_package(mut package: Package) -> Result<Document, Error> {
    let styles = match package.text(STYLES_PART)? {
        Some(xml) => styles::parse_styles(&xml),
        None => Vec::new(),
    };

    let xml_content = package.text(DOCUMENT_PART)?.ok_or_else(|| {
        Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into())
    })?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();

    // The writer emits `w:`-prefixed markup into the preserved root start tag.
    if root.lookup_prefix(WML_NS) != Some("w") {
        return Err(Error::InvalidDocx(
            "WordprocessingML namespace is not bound to the 'w' prefix".into(),
        ));
    }
    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let mut paragraphs = Vec::new();
    let mut section_properties = None;
    let mut skipped = 0usize;
    for node in body.children().filter(|n| n.is_element()) {
        if node.tag_name().namespace() != Some(WML_NS) {
            skipped += 1;
            continue;
        }
        match node.tag_name().name() {
            "p" => paragraphs.push(parse_paragraph(node)),
            "sectPr" => section_properties = Some(xml_content[node.range()].to_string()),
            other => {
                log::debug!("Skipping body element w:{other}");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        log::debug!("{skipped} non-paragraph body elements are not part of the paragraph stream");
    }

    package.document_head = xml_content[..body.range().start].to_string();
    package.section_properties = section_properties;

    Ok(Document {
        styles,
        paragraphs,
        package,
    })
}

fn parse_paragraph(para_node: roxmltree::Node) -> Paragraph {
    let ppr = wml(para_node, "pPr");

    let mut run_nodes = Vec::new();
    collect_run_nodes(para_node, &mut run_nodes);

    Paragraph {
        style_id: ppr.and_then(|n| wml_attr(n, "pStyle")).map(str::to_string),
        runs: run_nodes.into_iter().map(parse_run).collect(),
        format: ppr.map(parse_paragraph_format).unwrap_or_default(),
        shading: ppr.and_then(|n| wml(n, "shd")).map(|shd| Shading {
            pattern: shd.attribute((WML_NS, "val")).map(str::to_string),
            color: shd.attribute((WML_NS, "color")).map(str::to_string),
            fill: shd.attribute((WML_NS, "fill")).map(str::to_string),
        }),
    }
}

fn parse_paragraph_format(ppr: roxmltree::Node) -> ParagraphFormat {
    let ind = wml(ppr, "ind");
    let spacing = wml(ppr, "spacing");

    let first_line_indent = ind.and_then(|n| {
        twips_attr(n, "hanging")
            .map(|h| -h)
            .or_else(|| twips_attr(n, "firstLine"))
    });

    let line_spacing = spacing.and_then(|n| {
        let line = n
            .attribute((WML_NS, "line"))
            .and_then(|v| v.parse::<f32>().ok())?;
        Some(match n.attribute((WML_NS, "lineRule")) {
            Some("exact") => LineSpacing::Exact(line.max(0.0) as u32),
            Some("atLeast") => LineSpacing::AtLeast(line.max(0.0) as u32),
            _ => LineSpacing::Auto(line / 240.0),
        })
    });

    let spacing_twips = |attr: &str| {
        spacing
            .and_then(|n| twips_attr(n, attr))
            .map(|v| v.max(0) as u32)
    };

    ParagraphFormat {
        alignment: wml_attr(ppr, "jc").and_then(parse_alignment),
        first_line_indent,
        keep_together: wml_bool(ppr, "keepLines"),
        keep_with_next: wml_bool(ppr, "keepNext"),
        left_indent: ind.and_then(|n| twips_attr(n, "left").or_else(|| twips_attr(n, "start"))),
        right_indent: ind.and_then(|n| twips_attr(n, "right").or_else(|| twips_attr(n, "end"))),
        line_spacing,
        space_before: spacing_twips("before"),
        space_after: spacing_twips("after"),
    }
}

fn collect_run_nodes<'a>(parent: roxmltree::Node<'a, 'a>, out: &mut Vec<roxmltree::Node<'a, 'a>>) {
    for child in parent.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => out.push(child),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" => collect_run_nodes(child, out),
            "sdt" => {
                if let Some(content) = wml(child, "sdtContent") {
                    collect_run_nodes(content, out);
                }
            }
            _ => {}
        }
    }
}

fn run_text(run_node: roxmltree::Node) -> String {
    let mut text = String::new();
    for child in run_node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => text.push_str(child.text().unwrap_or("")),
            "tab" | "ptab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            "noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

fn parse_run(run_node: roxmltree::Node) -> Run {
    let rpr = wml(run_node, "rPr");
    Run {
        text: run_text(run_node),
        style_id: rpr
            .and_then(|n| wml_attr(n, "rStyle"))
            .map(str::to_string),
        format: rpr.map(parse_run_format).unwrap_or_default(),
    }
}

fn parse_run_format(rpr: roxmltree::Node) -> RunFormat {
    let underline = wml_attr(rpr, "u").map(|v| match v {
        "none" => Underline::None,
        "single" => Underline::Single,
        other => Underline::Styled(other.to_string()),
    });

    let vertical_align = wml_attr(rpr, "vertAlign").map(|v| match v {
        "superscript" => VertAlign::Superscript,
        "subscript" => VertAlign::Subscript,
        _ => VertAlign::Baseline,
    });

    let color = wml(rpr, "color").and_then(|n| {
        n.attribute((WML_NS, "val"))
            .and_then(parse_hex_color)
            .map(Color::Rgb)
            .or_else(|| {
                n.attribute((WML_NS, "themeColor"))
                    .map(|t| Color::Theme(t.to_string()))
            })
    });

    RunFormat {
        bold: wml_bool(rpr, "b"),
        italic: wml_bool(rpr, "i"),
        underline,
        all_caps: wml_bool(rpr, "caps"),
        double_strike: wml_bool(rpr, "dstrike"),
        emboss: wml_bool(rpr, "emboss"),
        imprint: wml_bool(rpr, "imprint"),
        outline: wml_bool(rpr, "outline"),
        shadow: wml_bool(rpr, "shadow"),
        small_caps: wml_bool(rpr, "smallCaps"),
        strike: wml_bool(rpr, "strike"),
        vertical_align,
        font_name: wml(rpr, "rFonts")
            .and_then(|n| n.attribute((WML_NS, "ascii")))
            .map(str::to_string),
        font_size: wml_attr(rpr, "sz").and_then(|v| v.parse::<u32>().ok()),
        color,
        highlight: wml_attr(rpr, "highlight").map(str::to_string),
    }
}

const BLANK_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const BLANK_PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const BLANK_DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const BLANK_DOCUMENT_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#;

// US Letter, 1 inch margins.
const BLANK_SECTION_PROPERTIES: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

fn blank_styles_xml() -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:rPr><w:sz w:val="56"/></w:rPr></w:style>"#,
    );
    // Heading 1 is 16pt, each deeper level 1pt smaller.
    for level in 1..=MAX_HEADING_LEVEL {
        let size = 34 - 2 * level;
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:keepLines/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:sz w:val="{size}"/></w:rPr></w:style>"#,
            level - 1
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

/// An empty document equivalent to a fresh Word document: used as the
/// template when the caller supplies none.
pub(crate) fn blank() -> Document {
    let styles_xml = blank_styles_xml();
    let mut package = Package::default();
    package.set("[Content_Types].xml", BLANK_CONTENT_TYPES.as_bytes().to_vec());
    package.set("_rels/.rels", BLANK_PACKAGE_RELS.as_bytes().to_vec());
    package.set(
        "word/_rels/document.xml.rels",
        BLANK_DOCUMENT_RELS.as_bytes().to_vec(),
    );
    package.set(STYLES_PART, styles_xml.as_bytes().to_vec());
    package.document_head = BLANK_DOCUMENT_HEAD.to_string();
    package.section_properties = Some(BLANK_SECTION_PROPERTIES.to_string());

    let mut doc = Document {
        styles: styles::parse_styles(&styles_xml),
        paragraphs: Vec::new(),
        package,
    };
    let document_xml = writer::document_xml(&doc);
    doc.package.set(DOCUMENT_PART, document_xml.into_bytes());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr>
        <w:pStyle w:val="Heading3"/>
        <w:keepNext/>
        <w:spacing w:before="120" w:after="60" w:line="360" w:lineRule="auto"/>
        <w:ind w:left="720" w:hanging="360"/>
        <w:jc w:val="center"/>
        <w:shd w:val="clear" w:color="auto" w:fill="FFFF00"/>
      </w:pPr>
      <w:r><w:t>Intro</w:t></w:r>
    </w:p>
    <w:tbl/>
    <w:p>
      <w:r>
        <w:rPr>
          <w:rStyle w:val="Emphasis"/>
          <w:rFonts w:ascii="Georgia" w:hAnsi="Georgia"/>
          <w:b/><w:i w:val="0"/><w:caps/><w:strike w:val="false"/>
          <w:color w:val="auto" w:themeColor="accent1"/>
          <w:sz w:val="28"/>
          <w:highlight w:val="yellow"/>
          <w:u w:val="double"/>
          <w:vertAlign w:val="superscript"/>
        </w:rPr>
        <w:t xml:space="preserve">Hello </w:t><w:tab/><w:t>world</w:t><w:br/>
      </w:r>
      <w:hyperlink><w:r><w:t>link</w:t></w:r></w:hyperlink>
    </w:p>
    <w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>
  </w:body>
</w:document>"#;

    fn package_with(document: &str) -> Package {
        let mut package = Package::default();
        package.set(DOCUMENT_PART, document.as_bytes().to_vec());
        package
    }

    #[test]
    fn test_parse_paragraphs_and_formatting() {
        let doc = from_package(package_with(DOCUMENT)).unwrap();
        assert_eq!(doc.paragraphs.len(), 2);

        let heading = &doc.paragraphs[0];
        assert_eq!(heading.style_id.as_deref(), Some("Heading3"));
        assert_eq!(heading.text(), "Intro");
        assert_eq!(heading.format.keep_with_next, Some(true));
        assert_eq!(heading.format.keep_together, None);
        assert_eq!(heading.format.space_before, Some(120));
        assert_eq!(heading.format.line_spacing, Some(LineSpacing::Auto(1.5)));
        assert_eq!(heading.format.left_indent, Some(720));
        assert_eq!(heading.format.first_line_indent, Some(-360));
        assert_eq!(heading.format.alignment, Some(Alignment::Center));
        assert_eq!(heading.shading.as_ref().and_then(|s| s.fill.as_deref()), Some("FFFF00"));

        let body = &doc.paragraphs[1];
        assert_eq!(body.text(), "Hello \tworld\nlink");
        let run = &body.runs[0];
        assert_eq!(run.style_id.as_deref(), Some("Emphasis"));
        assert_eq!(run.format.bold, Some(true));
        assert_eq!(run.format.italic, Some(false));
        assert_eq!(run.format.all_caps, Some(true));
        assert_eq!(run.format.strike, Some(false));
        assert_eq!(run.format.emboss, None);
        assert_eq!(run.format.font_name.as_deref(), Some("Georgia"));
        assert_eq!(run.format.font_size, Some(28));
        assert_eq!(run.format.color, Some(Color::Theme("accent1".into())));
        assert_eq!(run.format.highlight.as_deref(), Some("yellow"));
        assert_eq!(run.format.underline, Some(Underline::Styled("double".into())));
        assert_eq!(run.format.vertical_align, Some(VertAlign::Superscript));
    }

    #[test]
    fn test_document_head_and_section_properties_are_kept() {
        let doc = from_package(package_with(DOCUMENT)).unwrap();
        assert!(doc.package.document_head.trim_end().ends_with('>'));
        assert!(doc.package.document_head.contains("<w:document"));
        assert!(!doc.package.document_head.contains("<w:body"));
        assert_eq!(
            doc.package.section_properties.as_deref(),
            Some(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#)
        );
    }

    #[test]
    fn test_missing_document_part() {
        let err = from_package(Package::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidDocx(_)));
    }

    #[test]
    fn test_foreign_prefix_is_rejected() {
        let doc = r#"<x:document xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><x:body/></x:document>"#;
        let err = from_package(package_with(doc)).unwrap_err();
        assert!(matches!(err, Error::InvalidDocx(_)));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(parse_bytes(b"plain text"), Err(Error::InvalidDocx(_))));
    }

    #[test]
    fn test_blank_document() {
        let doc = blank();
        assert!(doc.paragraphs.is_empty());
        assert_eq!(doc.default_paragraph_style().map(|s| s.id.as_str()), Some("Normal"));
        for level in 1..=9 {
            let name = format!("Heading {level}");
            assert!(doc.style_named(&name, crate::model::StyleKind::Paragraph).is_some());
        }
        let reparsed = parse_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert_eq!(reparsed.styles.len(), doc.styles.len());
    }
}
