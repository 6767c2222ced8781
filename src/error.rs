use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid DOCX: {0}")]
    InvalidDocx(String),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("template document not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("section '{title}': {reason}")]
    Section { title: String, reason: String },

    #[error("split worker stopped unexpectedly: {0}")]
    Worker(String),
}

impl Error {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }
}

/// A formatting value the destination document refused. Never fatal: the
/// replicator logs it and moves on to the next attribute.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("font size {0} half-points is outside 2..=3276")]
    FontSize(u32),

    #[error("unknown highlight color '{0}'")]
    Highlight(String),

    #[error("unknown theme color '{0}'")]
    ThemeColor(String),

    #[error("line spacing multiple {0} must be positive")]
    LineSpacing(f32),

    #[error("{attribute} of {value} twips is outside Word's range")]
    OutOfRange { attribute: &'static str, value: i64 },

    #[error("style '{0}' is defined in neither the source nor the template")]
    MissingStyle(String),

    #[error("template has no styles part to hold style '{0}'")]
    NoStylesPart(String),

    #[error("{attribute} does not accept {value}")]
    Mismatch {
        attribute: &'static str,
        value: &'static str,
    },
}
