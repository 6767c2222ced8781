//! Splitting a document into one document per heading-delimited section.
//!
//! The pipeline is clean, then partition, then replicate and package each
//! section. [`Splitter::run`] drives it on the calling thread;
//! [`Splitter::spawn`] moves it onto a worker thread that reports through a
//! bounded channel.

mod clean;
mod headings;
mod names;
mod package;
mod partition;
mod replicate;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub use clean::{clean, removal_indices};
pub use headings::HeadingStyleMap;
pub use names::{NameAllocator, UsedNames, sanitize};
pub use package::Packager;
pub use partition::{Section, SectionSummary, partition};
pub use replicate::{
    AttributeValue, CORE_RUN_ATTRIBUTES, EXTENDED_RUN_ATTRIBUTES, FONT_ATTRIBUTES,
    PARAGRAPH_FORMAT_ATTRIBUTES, ParagraphAttribute, ParagraphFormatting, Replicator,
    RunAttribute, RunFormatting, copy_paragraph_attributes, copy_run_attributes,
};

use crate::config::{self, DEFAULT_HEADING_LEVEL, DEFAULT_MAX_TITLE_LEN, EVENT_CHANNEL_CAPACITY};
use crate::docx;
use crate::error::Error;
use crate::model::Document;

/// Returned by the scanning stages when they observe a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canceled;

/// Shared cancel flag. Setting it never interrupts work in progress; the
/// pipeline polls it at its checkpoints. A request applies to the run in
/// progress, or to the next one if none is running, and is cleared when that
/// run returns.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Receives status lines and progress percentages from a split run. Both are
/// called on the thread doing the work.
pub trait SplitObserver {
    fn status(&self, _message: &str) {}
    fn progress(&self, _percent: u8) {}
}

impl SplitObserver for () {}

/// Adapts a pair of closures.
pub struct FnObserver<S, P> {
    status: S,
    progress: P,
}

impl<S: Fn(&str), P: Fn(u8)> FnObserver<S, P> {
    pub fn new(status: S, progress: P) -> Self {
        FnObserver { status, progress }
    }
}

impl<S: Fn(&str), P: Fn(u8)> SplitObserver for FnObserver<S, P> {
    fn status(&self, message: &str) {
        (self.status)(message)
    }

    fn progress(&self, percent: u8) {
        (self.progress)(percent)
    }
}

#[derive(Debug)]
pub enum SplitEvent {
    Status(String),
    Progress(u8),
    /// Always the last event of a spawned run.
    Finished(Result<SplitOutcome, Error>),
}

// A dropped receiver only means nobody is listening any more.
impl SplitObserver for SyncSender<SplitEvent> {
    fn status(&self, message: &str) {
        let _ = self.send(SplitEvent::Status(message.to_string()));
    }

    fn progress(&self, percent: u8) {
        let _ = self.send(SplitEvent::Progress(percent));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One `<input stem>_sections.zip` holding every section document.
    #[default]
    Archive,
    /// One `.docx` per section directly in the output directory.
    Files,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    pub heading_level: u32,
    pub output: OutputMode,
    /// Defaults to the input document's directory.
    pub output_dir: Option<PathBuf>,
    pub max_title_len: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        SplitOptions {
            heading_level: DEFAULT_HEADING_LEVEL,
            output: OutputMode::Archive,
            output_dir: None,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    Archive(PathBuf),
    Directory(PathBuf),
    Canceled,
    /// No non-empty section at the requested level; nothing was written.
    NoSections,
}

/// A loaded source document and template, ready to be split any number of
/// times.
#[derive(Debug)]
pub struct Splitter {
    name: String,
    default_output_dir: PathBuf,
    source: Document,
    template: Document,
    headings: HeadingStyleMap,
    cancel: CancelToken,
}

impl Splitter {
    /// Loads `input` and the template. Without a template the splitter uses
    /// [`Document::blank`].
    pub fn open(input: &Path, template: Option<&Path>) -> Result<Self, Error> {
        if !input.is_file() {
            return Err(Error::Config(format!(
                "input document not found: {}",
                input.display()
            )));
        }
        let template = match template {
            Some(path) if !path.is_file() => {
                return Err(Error::TemplateNotFound(path.to_path_buf()));
            }
            Some(path) => docx::parse(path)?,
            None => {
                log::info!("No template given, using a blank document");
                Document::blank()
            }
        };
        let source = docx::parse(input)?;

        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let default_output_dir = match input.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut splitter = Splitter::from_documents(source, template, &name);
        splitter.default_output_dir = default_output_dir;
        Ok(splitter)
    }

    /// `name` is the stem used for the archive file name.
    pub fn from_documents(source: Document, template: Document, name: &str) -> Self {
        let headings = HeadingStyleMap::resolve(&source);
        if headings.is_empty() {
            log::warn!("'{name}' defines no heading styles; nothing will be split");
        } else {
            log::debug!("Resolved {} heading styles in '{name}'", headings.len());
        }
        Splitter {
            name: name.to_string(),
            default_output_dir: PathBuf::from("."),
            source,
            template,
            headings,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn headings(&self) -> &HeadingStyleMap {
        &self.headings
    }

    pub fn source(&self) -> &Document {
        &self.source
    }

    fn check(options: &SplitOptions) -> Result<(), Error> {
        config::validate_heading_level(options.heading_level)?;
        config::validate_max_title_len(options.max_title_len)
    }

    /// Cleaning and partitioning only. `None` when canceled.
    pub fn plan(&self, options: &SplitOptions) -> Result<Option<Vec<SectionSummary>>, Error> {
        let planned = self.plan_sections(options);
        self.cancel.reset();
        planned
    }

    fn plan_sections(&self, options: &SplitOptions) -> Result<Option<Vec<SectionSummary>>, Error> {
        Self::check(options)?;
        let level = options.heading_level;
        let mut working = self.source.clone();
        if clean(&mut working, &self.headings, level, &self.cancel).is_err() {
            return Ok(None);
        }
        let Ok(sections) =
            partition(&working, &self.headings, level, options.max_title_len, &self.cancel)
        else {
            return Ok(None);
        };
        Ok(Some(sections.iter().map(SectionSummary::from).collect()))
    }

    /// Runs the whole pipeline on the calling thread. The source document is
    /// never modified, so a splitter can be run again with other options.
    pub fn run(
        &self,
        options: &SplitOptions,
        observer: &dyn SplitObserver,
    ) -> Result<SplitOutcome, Error> {
        let outcome = self.run_pipeline(options, observer);
        self.cancel.reset();
        outcome
    }

    fn run_pipeline(
        &self,
        options: &SplitOptions,
        observer: &dyn SplitObserver,
    ) -> Result<SplitOutcome, Error> {
        Self::check(options)?;
        let t0 = Instant::now();
        let level = options.heading_level;

        observer.status(&format!(
            "Parsing document sections at heading level {level}..."
        ));
        let mut working = self.source.clone();
        if clean(&mut working, &self.headings, level, &self.cancel).is_err() {
            observer.status("Operation canceled during document cleaning");
            return Ok(SplitOutcome::Canceled);
        }
        let sections =
            match partition(&working, &self.headings, level, options.max_title_len, &self.cancel) {
                Ok(sections) => sections,
                Err(Canceled) => {
                    observer.status("Operation canceled during parsing");
                    return Ok(SplitOutcome::Canceled);
                }
            };
        let t_parse = t0.elapsed();
        observer.status(&format!(
            "Found {} non-empty sections at heading level {level}",
            sections.len()
        ));
        if sections.is_empty() {
            return Ok(SplitOutcome::NoSections);
        }

        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| self.default_output_dir.clone());
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::io_at(&output_dir, e))?;

        let replicator = Replicator::new(&self.source, &self.template, observer);
        let packager = Packager::new(replicator, &self.cancel, observer);
        let outcome = match options.output {
            OutputMode::Archive => packager
                .package_archive(&sections, &output_dir, &self.name)?
                .map(SplitOutcome::Archive),
            OutputMode::Files => packager
                .package_files(&sections, &output_dir)?
                .map(SplitOutcome::Directory),
        };
        let t_total = t0.elapsed();

        log::info!(
            "Timing: parse={:.1}ms, write={:.1}ms, total={:.1}ms ({} sections)",
            t_parse.as_secs_f64() * 1000.0,
            (t_total - t_parse).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            sections.len(),
        );
        Ok(outcome.unwrap_or(SplitOutcome::Canceled))
    }

    /// Moves the splitter onto a worker thread. Invalid options are reported
    /// here rather than through the handle.
    pub fn spawn(self, options: SplitOptions) -> Result<SplitHandle, Error> {
        Self::check(&options)?;
        let (tx, events) = mpsc::sync_channel(EVENT_CHANNEL_CAPACITY);
        let cancel = self.cancel.clone();
        let notify = tx.clone();
        let join = thread::Builder::new()
            .name("docxide-split".into())
            .spawn(move || {
                let result = self.run(&options, &tx);
                let _ = tx.send(SplitEvent::Finished(result));
            })?;
        Ok(SplitHandle {
            cancel,
            notify,
            events,
            join,
        })
    }
}

/// The caller's side of a spawned split.
pub struct SplitHandle {
    cancel: CancelToken,
    notify: SyncSender<SplitEvent>,
    events: Receiver<SplitEvent>,
    join: JoinHandle<()>,
}

impl SplitHandle {
    /// Asks the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
        // The receiving end lives on this thread, so never block on a full
        // channel here.
        let _ = self
            .notify
            .try_send(SplitEvent::Status("Cancellation requested".to_string()));
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn events(&self) -> &Receiver<SplitEvent> {
        &self.events
    }

    /// Hands every status and progress event to `on_event` until the worker
    /// finishes, then returns its result.
    pub fn wait(self, mut on_event: impl FnMut(&SplitEvent)) -> Result<SplitOutcome, Error> {
        let SplitHandle {
            events, join, notify, ..
        } = self;
        drop(notify);
        for event in events.iter() {
            if let SplitEvent::Finished(result) = event {
                let _ = join.join();
                return result;
            }
            on_event(&event);
        }
        match join.join() {
            Ok(()) => Err(Error::Worker("no result was reported".into())),
            Err(_) => Err(Error::Worker("worker thread panicked".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::model::Paragraph;

    fn splitter(paragraphs: Vec<Paragraph>) -> Splitter {
        let mut source = Document::blank();
        source.paragraphs = paragraphs;
        Splitter::from_documents(source, Document::blank(), "report")
    }

    fn sample() -> Splitter {
        splitter(vec![
            Paragraph::styled("Heading1", "Manual"),
            Paragraph::styled("Heading3", "Intro"),
            Paragraph::new("Hello world"),
            Paragraph::styled("Heading3", ""),
            Paragraph::new("More intro"),
            Paragraph::styled("Heading3", "Setup"),
            Paragraph::new("Install it"),
        ])
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
    }

    #[test]
    fn test_plan_does_not_touch_source() {
        let s = sample();
        let plan = s.plan(&SplitOptions::default()).unwrap().unwrap();
        let titles: Vec<&str> = plan.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Intro", "Setup"]);
        assert_eq!(s.source().paragraphs.len(), 7);
    }

    #[test]
    fn test_invalid_options_are_config_errors() {
        let s = sample();
        let options = SplitOptions {
            heading_level: 0,
            ..Default::default()
        };
        assert!(matches!(s.run(&options, &()), Err(Error::Config(_))));
        let options = SplitOptions {
            max_title_len: 0,
            ..Default::default()
        };
        assert!(matches!(s.plan(&options), Err(Error::Config(_))));
    }

    #[test]
    fn test_run_reports_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = sample();
        let options = SplitOptions {
            output: OutputMode::Files,
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let lines = RefCell::new(Vec::new());
        let observer = FnObserver::new(
            |m: &str| lines.borrow_mut().push(m.to_string()),
            |p| lines.borrow_mut().push(format!("{p}%")),
        );
        let outcome = s.run(&options, &observer).unwrap();
        assert_eq!(outcome, SplitOutcome::Directory(dir.path().to_path_buf()));
        assert_eq!(
            lines.into_inner(),
            [
                "Parsing document sections at heading level 3...".to_string(),
                "Found 2 non-empty sections at heading level 3".to_string(),
                "50%".to_string(),
                "Processed section 1/2: Intro".to_string(),
                "100%".to_string(),
                "Processed section 2/2: Setup".to_string(),
                format!("Saved 2 documents to: {}", dir.path().display()),
            ]
        );
    }

    #[test]
    fn test_no_sections_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let s = splitter(vec![Paragraph::new("just text")]);
        let options = SplitOptions {
            output_dir: Some(dir.path().join("out")),
            ..Default::default()
        };
        assert_eq!(s.run(&options, &()).unwrap(), SplitOutcome::NoSections);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_canceled_before_start() {
        let s = sample();
        s.cancel_token().cancel();
        let messages = RefCell::new(Vec::new());
        let observer = FnObserver::new(|m: &str| messages.borrow_mut().push(m.to_string()), |_| {});
        assert_eq!(
            s.run(&SplitOptions::default(), &observer).unwrap(),
            SplitOutcome::Canceled
        );
        assert_eq!(
            messages.into_inner().last().map(String::as_str),
            Some("Operation canceled during document cleaning")
        );
    }

    #[test]
    fn test_cancel_is_cleared_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let s = sample();
        let options = SplitOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        s.cancel_token().cancel();
        assert_eq!(s.run(&options, &()).unwrap(), SplitOutcome::Canceled);
        assert!(!s.cancel_token().is_canceled());
        assert_eq!(
            s.run(&options, &()).unwrap(),
            SplitOutcome::Archive(dir.path().join("report_sections.zip"))
        );

        s.cancel_token().cancel();
        assert_eq!(s.plan(&options).unwrap(), None);
        assert_eq!(s.plan(&options).unwrap().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_spawn_rejects_invalid_options() {
        let options = SplitOptions {
            heading_level: 0,
            ..Default::default()
        };
        assert!(matches!(sample().spawn(options), Err(Error::Config(_))));
    }

    #[test]
    fn test_spawned_run_finishes_with_archive() {
        let dir = tempfile::tempdir().unwrap();
        let options = SplitOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let handle = sample().spawn(options).unwrap();
        let mut progress = Vec::new();
        let outcome = handle
            .wait(|event| {
                if let SplitEvent::Progress(p) = event {
                    progress.push(*p);
                }
            })
            .unwrap();
        assert_eq!(
            outcome,
            SplitOutcome::Archive(dir.path().join("report_sections.zip"))
        );
        assert_eq!(progress, [50, 100]);
    }
}
