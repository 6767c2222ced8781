pub mod config;
pub mod docx;
mod error;
pub mod model;
pub mod split;

pub use error::{Error, FormatError};
pub use model::Document;
pub use split::{
    CancelToken, FnObserver, OutputMode, SplitEvent, SplitHandle, SplitObserver, SplitOptions,
    SplitOutcome, Splitter,
};

use std::path::Path;
use std::time::Instant;

/// Splits `input` at `options.heading_level` on the calling thread, using
/// `template` (or a blank document) for the output documents' styles and
/// page setup.
pub fn split_docx(
    input: &Path,
    template: Option<&Path>,
    options: &SplitOptions,
    observer: &dyn SplitObserver,
) -> Result<SplitOutcome, Error> {
    let t0 = Instant::now();

    let splitter = Splitter::open(input, template)?;
    let t_open = t0.elapsed();

    let outcome = splitter.run(options, observer)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: open={:.1}ms, split={:.1}ms, total={:.1}ms ({} paragraphs)",
        t_open.as_secs_f64() * 1000.0,
        (t_total - t_open).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        splitter.source().paragraphs.len(),
    );

    Ok(outcome)
}

/// Same as [`split_docx`] for a document already in memory. `name` is the
/// stem of the archive file name.
pub fn split_docx_bytes(
    input: &[u8],
    name: &str,
    options: &SplitOptions,
    observer: &dyn SplitObserver,
) -> Result<SplitOutcome, Error> {
    let source = docx::parse_bytes(input)?;
    Splitter::from_documents(source, Document::blank(), name).run(options, observer)
}
