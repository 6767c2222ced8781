use std::collections::HashSet;

use crate::config::FALLBACK_SECTION_NAME;

const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turns heading text into something usable as a file name: drops characters
/// Windows rejects, turns whitespace runs into one `_`, squeezes dot runs,
/// keeps at most `max_len` characters and trims `.`/`_` from both ends.
pub fn sanitize(title: &str, max_len: usize) -> String {
    let mut safe = String::with_capacity(title.len());
    let mut in_space = false;
    for ch in title.chars().filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c)) {
        if ch.is_whitespace() {
            if !in_space {
                safe.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch == '.' && safe.ends_with('.') {
            continue;
        }
        safe.push(ch);
    }
    let truncated: String = safe.chars().take(max_len).collect();
    truncated.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Names already handed out during one split run.
#[derive(Clone, Debug, Default)]
pub struct UsedNames {
    names: HashSet<String>,
}

impl UsedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `name` if it is free, otherwise the first free `stem_N.ext`
    /// (or `name_N` without an extension) counting from 1. The returned name
    /// is recorded as used.
    pub fn ensure_unique(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut counter = 1u32;
        while self.names.contains(&candidate) {
            candidate = match name.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}_{counter}.{ext}"),
                None => format!("{name}_{counter}"),
            };
            counter += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Sanitize + uniquify against one run's [`UsedNames`].
#[derive(Debug)]
pub struct NameAllocator {
    used: UsedNames,
    max_len: usize,
}

impl NameAllocator {
    pub fn new(max_len: usize) -> Self {
        NameAllocator {
            used: UsedNames::new(),
            max_len,
        }
    }

    pub fn allocate(&mut self, title: &str) -> String {
        let safe = sanitize(title, self.max_len);
        if safe.is_empty() {
            log::debug!("Heading {title:?} has no filename-safe characters");
            return self.used.ensure_unique(FALLBACK_SECTION_NAME);
        }
        self.used.ensure_unique(&safe)
    }

    pub fn used(&self) -> &UsedNames {
        &self.used
    }
}
