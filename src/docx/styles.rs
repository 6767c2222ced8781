use crate::model::{Style, StyleKind};

use super::{WML_NS, wml, wml_attr};

/// Lowercase built-in names Word stores in styles.xml, mapped to the names it
/// shows in the UI. Headings are handled separately.
const UI_NAMES: &[(&str, &str)] = &[
    ("caption", "Caption"),
    ("footer", "Footer"),
    ("header", "Header"),
    ("title", "Title"),
    ("subtitle", "Subtitle"),
    ("normal", "Normal"),
    ("toc heading", "TOC Heading"),
];

pub(super) fn ui_style_name(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("heading ") {
        return format!("Heading {rest}");
    }
    UI_NAMES
        .iter()
        .find(|(stored, _)| *stored == raw)
        .map(|(_, ui)| ui.to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_kind(val: Option<&str>) -> Option<StyleKind> {
    match val {
        None | Some("paragraph") => Some(StyleKind::Paragraph),
        Some("character") => Some(StyleKind::Character),
        Some("table") => Some(StyleKind::Table),
        Some("numbering") => Some(StyleKind::Numbering),
        Some(_) => None,
    }
}

/// Parses `word/styles.xml`. A malformed part yields no styles rather than an
/// error: every paragraph then simply resolves as a non-heading.
pub(super) fn parse_styles(xml_content: &str) -> Vec<Style> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("styles part is not well-formed XML; ignoring it");
        return Vec::new();
    };

    let mut styles = Vec::new();
    for style_node in xml.root_element().children() {
        if style_node.tag_name().name() != "style"
            || style_node.tag_name().namespace() != Some(WML_NS)
        {
            continue;
        }
        let Some(kind) = parse_kind(style_node.attribute((WML_NS, "type"))) else {
            continue;
        };
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let name = wml_attr(style_node, "name")
            .map(ui_style_name)
            .unwrap_or_default();
        let based_on = wml(style_node, "basedOn")
            .and_then(|n| n.attribute((WML_NS, "val")))
            .map(|s| s.to_string());
        let is_default = style_node
            .attribute((WML_NS, "default"))
            .is_some_and(|v| v == "1" || v == "true" || v == "on");

        styles.push(Style {
            id: style_id.to_string(),
            name,
            kind,
            based_on,
            is_default,
            xml: xml_content[style_node.range()].to_string(),
            imported: false,
        });
    }
    styles
}
