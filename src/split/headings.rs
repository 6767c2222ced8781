use std::collections::HashMap;

use crate::model::{Document, Paragraph, StyleKind};

/// Paragraph style name -> heading level, built once per document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadingStyleMap {
    levels: HashMap<String, u32>,
}

enum HeadingName {
    NotHeading,
    /// Starts with "Heading " but the last token is not a positive integer.
    Malformed,
    Level(u32),
}

fn heading_name(name: &str) -> HeadingName {
    if !name.starts_with("Heading ") {
        return HeadingName::NotHeading;
    }
    match name.split_whitespace().last().map(str::parse::<u32>) {
        Some(Ok(level)) if level > 0 => HeadingName::Level(level),
        _ => HeadingName::Malformed,
    }
}

impl HeadingStyleMap {
    /// A paragraph style is a heading when its own name is "Heading <n>", or
    /// when it has no heading name of its own and its direct base style is
    /// named "Heading <n>". Only one inheritance hop is followed.
    pub fn resolve(doc: &Document) -> Self {
        let mut levels = HashMap::new();
        for style in doc.styles.iter().filter(|s| s.kind == StyleKind::Paragraph) {
            match heading_name(&style.name) {
                HeadingName::Level(level) => {
                    levels.insert(style.name.clone(), level);
                }
                HeadingName::Malformed => {
                    log::debug!("Style '{}' looks like a heading but has no level", style.name);
                }
                HeadingName::NotHeading => {
                    let base = style
                        .based_on
                        .as_deref()
                        .and_then(|id| doc.style(id));
                    if let Some(HeadingName::Level(level)) = base.map(|b| heading_name(&b.name)) {
                        levels.insert(style.name.clone(), level);
                    }
                }
            }
        }
        log::debug!("Resolved {} heading styles", levels.len());
        HeadingStyleMap { levels }
    }

    pub fn level(&self, style_name: &str) -> Option<u32> {
        self.levels.get(style_name).copied()
    }

    /// Heading level of `paragraph`, looked up through its effective style.
    pub fn level_of(&self, doc: &Document, paragraph: &Paragraph) -> Option<u32> {
        doc.paragraph_style(paragraph)
            .filter(|s| !s.name.is_empty())
            .and_then(|s| self.level(&s.name))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.levels.iter().map(|(name, level)| (name.as_str(), *level))
    }
}
