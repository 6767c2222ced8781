use std::collections::BTreeSet;

use crate::config::CLEAN_CHECK_INTERVAL;
use crate::model::Document;

use super::headings::HeadingStyleMap;
use super::{CancelToken, Canceled};

/// Indices of the paragraphs [`clean`] drops: every heading above
/// `target_level`, every heading at any level whose text is blank, and the
/// paragraph right after such a heading when that one is blank too.
pub fn removal_indices(
    doc: &Document,
    headings: &HeadingStyleMap,
    target_level: u32,
    cancel: &CancelToken,
) -> Result<BTreeSet<usize>, Canceled> {
    let paragraphs = &doc.paragraphs;
    let mut remove = BTreeSet::new();
    for (idx, para) in paragraphs.iter().enumerate() {
        if idx % CLEAN_CHECK_INTERVAL == 0 && cancel.is_canceled() {
            return Err(Canceled);
        }
        let Some(level) = headings.level_of(doc, para) else {
            continue;
        };
        if level < target_level || para.is_blank() {
            remove.insert(idx);
            if paragraphs.get(idx + 1).is_some_and(|next| next.is_blank()) {
                remove.insert(idx + 1);
            }
        }
    }
    Ok(remove)
}

/// Strips headings the partitioner must not see. Nothing is removed until the
/// whole scan has finished, so a cancel leaves `doc` untouched.
pub fn clean(
    doc: &mut Document,
    headings: &HeadingStyleMap,
    target_level: u32,
    cancel: &CancelToken,
) -> Result<usize, Canceled> {
    let remove = removal_indices(doc, headings, target_level, cancel)?;
    let removed = doc.remove_paragraphs(&remove);
    log::debug!(
        "Cleaning at level {target_level} removed {removed} of {} paragraphs",
        doc.paragraphs.len() + removed
    );
    Ok(removed)
}
