//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// Front-matter parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("missing front-matter start")]
    MissingStart,

    #[error("missing front-matter end")]
    MissingEnd,

    #[error("malformed front-matter line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// Errors raised while loading posts, composing pages or writing a build
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("{}: missing required front-matter field `{field}`", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{}: invalid date {value:?}, expected YYYY-MM-DD", path.display())]
    InvalidDate { path: PathBuf, value: String },

    #[error("duplicate slug `{slug}`: {} and {}", first.display(), second.display())]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{}: slug `{slug}` is reserved", path.display())]
    ReservedSlug { path: PathBuf, slug: String },

    #[error("failed to read {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("route `{0}` was enumerated for the build but did not resolve")]
    Build(String),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "invalid configuration: output directory {} would overwrite {}",
        path.display(),
        conflict.display()
    )]
    OutputDir { path: PathBuf, conflict: PathBuf },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl Error {
    /// Whether this error came from malformed post content
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::MissingField { .. } | Error::InvalidDate { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
