use crate::config::PARTITION_CHECK_INTERVAL;
use crate::model::{Document, Paragraph};

use super::headings::HeadingStyleMap;
use super::names::NameAllocator;
use super::{CancelToken, Canceled};

/// One heading-delimited run of paragraphs. Borrows its content from the
/// source document, so it cannot outlive it.
#[derive(Clone, Debug)]
pub struct Section<'doc> {
    /// Heading text exactly as written.
    pub title: String,
    /// Sanitized, run-unique output name without extension.
    pub safe_title: String,
    pub level: u32,
    /// Paragraphs after the heading, in document order, heading excluded.
    pub content: Vec<&'doc Paragraph>,
    pub start_index: usize,
    pub end_index: Option<usize>,
}

impl Section<'_> {
    pub fn has_content(&self) -> bool {
        self.content.iter().any(|p| !p.is_blank())
    }
}

/// Owned view of a [`Section`] for callers that outlive the source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionSummary {
    pub title: String,
    pub safe_title: String,
    pub level: u32,
    pub paragraphs: usize,
    pub start_index: usize,
    pub end_index: Option<usize>,
}

impl From<&Section<'_>> for SectionSummary {
    fn from(section: &Section<'_>) -> Self {
        SectionSummary {
            title: section.title.clone(),
            safe_title: section.safe_title.clone(),
            level: section.level,
            paragraphs: section.content.len(),
            start_index: section.start_index,
            end_index: section.end_index,
        }
    }
}

fn close<'doc>(mut section: Section<'doc>, end_index: usize, out: &mut Vec<Section<'doc>>) {
    section.end_index = Some(end_index);
    if section.has_content() {
        out.push(section);
    } else {
        log::debug!("Dropping empty section '{}'", section.title);
    }
}

/// Single pass over the (cleaned) paragraphs. Every heading at exactly
/// `target_level` closes the open section; a heading with text also opens
/// the next one, a blank heading leaves nothing open so its body is dropped.
/// Sections without any non-blank content are discarded when they close.
pub fn partition<'doc>(
    doc: &'doc Document,
    headings: &HeadingStyleMap,
    target_level: u32,
    max_title_len: usize,
    cancel: &CancelToken,
) -> Result<Vec<Section<'doc>>, Canceled> {
    let mut names = NameAllocator::new(max_title_len);
    let mut sections = Vec::new();
    let mut current: Option<Section<'doc>> = None;

    for (idx, para) in doc.paragraphs.iter().enumerate() {
        if idx % PARTITION_CHECK_INTERVAL == 0 && cancel.is_canceled() {
            return Err(Canceled);
        }

        if headings.level_of(doc, para) == Some(target_level) {
            if let Some(open) = current.take() {
                close(open, idx.saturating_sub(1), &mut sections);
            }
            if !para.is_blank() {
                let title = para.text();
                current = Some(Section {
                    safe_title: names.allocate(&title),
                    title,
                    level: target_level,
                    content: Vec::new(),
                    start_index: idx,
                    end_index: None,
                });
            }
        } else if let Some(open) = current.as_mut() {
            open.content.push(para);
        }
    }

    if let Some(open) = current.take() {
        close(open, doc.paragraphs.len().saturating_sub(1), &mut sections);
    }

    if cancel.is_canceled() {
        return Err(Canceled);
    }
    Ok(sections)
}
