use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::config::{ARCHIVE_EXTENSION, ARCHIVE_SUFFIX, DOCUMENT_EXTENSION};
use crate::docx;
use crate::error::Error;

use super::partition::Section;
use super::replicate::Replicator;
use super::{CancelToken, SplitObserver};

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

fn cause(err: &Error) -> String {
    match err {
        Error::Section { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Writes replicated sections out, one `.docx` per section, reporting progress
/// after each. A section that fails is reported and left out; only errors
/// about the output location itself abort the run.
pub struct Packager<'a> {
    replicator: Replicator<'a>,
    cancel: &'a CancelToken,
    observer: &'a dyn SplitObserver,
}

impl<'a> Packager<'a> {
    pub fn new(
        replicator: Replicator<'a>,
        cancel: &'a CancelToken,
        observer: &'a dyn SplitObserver,
    ) -> Self {
        Packager {
            replicator,
            cancel,
            observer,
        }
    }

    fn render(&self, section: &Section<'_>) -> Result<Vec<u8>, Error> {
        let doc = self.replicator.replicate(section)?;
        docx::to_bytes(&doc).map_err(|e| Error::Section {
            title: section.safe_title.clone(),
            reason: e.to_string(),
        })
    }

    fn section_failed(&self, section: &Section<'_>, err: &Error) {
        log::warn!("Skipping section '{}': {err}", section.safe_title);
        self.observer.status(&format!(
            "Error processing section '{}': {}",
            section.safe_title,
            cause(err)
        ));
    }

    fn section_done(&self, idx: usize, total: usize, section: &Section<'_>) {
        self.observer.progress(percent(idx, total));
        self.observer.status(&format!(
            "Processed section {idx}/{total}: {}",
            section.safe_title
        ));
    }

    /// Builds `<output_dir>/<stem>_sections.zip` with one deflated entry per
    /// section. The archive is assembled in a scratch file next to the final
    /// path and only moved into place once every section has been handled, so
    /// a cancel never leaves a partial archive behind. `None` when canceled.
    pub fn package_archive(
        &self,
        sections: &[Section<'_>],
        output_dir: &Path,
        stem: &str,
    ) -> Result<Option<PathBuf>, Error> {
        let archive_path =
            output_dir.join(format!("{stem}{ARCHIVE_SUFFIX}.{ARCHIVE_EXTENSION}"));
        let scratch = NamedTempFile::new_in(output_dir).map_err(|e| Error::io_at(output_dir, e))?;
        let mut zip = ZipWriter::new(scratch);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let total = sections.len();
        for (idx, section) in sections.iter().enumerate() {
            if self.cancel.is_canceled() {
                self.observer.status("Operation canceled by user");
                return Ok(None);
            }
            let bytes = match self.render(section) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.section_failed(section, &e);
                    continue;
                }
            };
            zip.start_file(format!("{}.{DOCUMENT_EXTENSION}", section.safe_title), options)?;
            zip.write_all(&bytes)?;
            self.section_done(idx + 1, total, section);
        }

        if self.cancel.is_canceled() {
            self.observer.status("Operation canceled while creating archive");
            return Ok(None);
        }

        let scratch = zip.finish()?;
        scratch
            .persist(&archive_path)
            .map_err(|e| Error::io_at(&archive_path, e.error))?;
        self.observer
            .status(&format!("Created archive at: {}", archive_path.display()));
        Ok(Some(archive_path))
    }

    /// Writes `<output_dir>/<safe title>.docx` for every section. Files
    /// already written stay in place when the run is canceled. `None` when
    /// canceled.
    pub fn package_files(
        &self,
        sections: &[Section<'_>],
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, Error> {
        let total = sections.len();
        let mut saved = 0usize;
        for (idx, section) in sections.iter().enumerate() {
            if self.cancel.is_canceled() {
                self.observer.status("Operation canceled by user");
                return Ok(None);
            }
            let path = output_dir.join(format!("{}.{DOCUMENT_EXTENSION}", section.safe_title));
            let written = self
                .render(section)
                .and_then(|bytes| std::fs::write(&path, bytes).map_err(|e| Error::io_at(&path, e)));
            match written {
                Ok(()) => {
                    saved += 1;
                    self.section_done(idx + 1, total, section);
                }
                Err(e) => self.section_failed(section, &e),
            }
        }

        if self.cancel.is_canceled() {
            self.observer.status("Operation canceled while saving files");
            return Ok(None);
        }
        self.observer.status(&format!(
            "Saved {saved} documents to: {}",
            output_dir.display()
        ));
        Ok(Some(output_dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs::File;

    use super::*;
    use crate::model::{Document, Paragraph};
    use crate::split::FnObserver;

    fn section<'a>(title: &str, content: Vec<&'a Paragraph>) -> Section<'a> {
        Section {
            title: title.to_string(),
            safe_title: title.to_string(),
            level: 3,
            content,
            start_index: 0,
            end_index: None,
        }
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_archive_entries_in_section_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::blank();
        let body = Paragraph::new("text");
        let sections = vec![
            section("Zeta", vec![&body]),
            section("Alpha", vec![&body]),
        ];
        let cancel = CancelToken::new();
        let progress = RefCell::new(Vec::new());
        let observer = FnObserver::new(|_: &str| {}, |p| progress.borrow_mut().push(p));
        let packager = Packager::new(Replicator::new(&doc, &doc, &observer), &cancel, &observer);

        let path = packager
            .package_archive(&sections, dir.path(), "report")
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("report_sections.zip"));

        let archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, ["Zeta.docx", "Alpha.docx"]);
        assert_eq!(progress.into_inner(), [50, 100]);
    }

    #[test]
    fn test_canceled_archive_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::blank();
        let body = Paragraph::new("text");
        let sections = vec![section("Only", vec![&body])];
        let cancel = CancelToken::new();
        cancel.cancel();
        let packager = Packager::new(Replicator::new(&doc, &doc, &()), &cancel, &());

        let result = packager.package_archive(&sections, dir.path(), "report").unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_section_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::blank();
        let body = Paragraph::new("text");
        let sections = vec![section("   ", vec![&body]), section("Good", vec![&body])];
        let cancel = CancelToken::new();
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        let packager = Packager::new(Replicator::new(&doc, &doc, &observer), &cancel, &observer);

        let out = packager.package_files(&sections, dir.path()).unwrap();
        assert_eq!(out.as_deref(), Some(dir.path()));
        assert!(dir.path().join("Good.docx").exists());
        let messages = messages.into_inner();
        assert!(messages[0].starts_with("Error processing section '   '"));
        assert_eq!(messages[1], "Processed section 2/2: Good");
        assert_eq!(
            messages[2],
            format!("Saved 1 documents to: {}", dir.path().display())
        );
    }

    #[test]
    fn test_cancel_mid_run_keeps_finished_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::blank();
        let body = Paragraph::new("text");
        let sections = vec![
            section("One", vec![&body]),
            section("Two", vec![&body]),
            section("Three", vec![&body]),
        ];
        let cancel = CancelToken::new();
        let observer = FnObserver::new(|_: &str| {}, |_| cancel.cancel());
        let packager = Packager::new(Replicator::new(&doc, &doc, &observer), &cancel, &observer);

        assert!(packager.package_files(&sections, dir.path()).unwrap().is_none());
        let mut written: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(written, ["One.docx"]);
    }

    #[test]
    fn test_cancel_mid_archive_discards_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::blank();
        let body = Paragraph::new("text");
        let sections = vec![
            section("One", vec![&body]),
            section("Two", vec![&body]),
            section("Three", vec![&body]),
        ];
        let cancel = CancelToken::new();
        let observer = FnObserver::new(|_: &str| {}, |_| cancel.cancel());
        let packager = Packager::new(Replicator::new(&doc, &doc, &observer), &cancel, &observer);

        let result = packager.package_archive(&sections, dir.path(), "report").unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
