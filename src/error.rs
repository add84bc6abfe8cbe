use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The structural piece of the status file a format error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// The `Personalities : ...` line.
    Header,
    /// One array's line-group, keyed by array name (empty if the name itself was unreadable).
    ArrayBlock(String),
    /// A single member token such as `sdb1[1](F)`.
    Device(String),
    /// A bitmap or operation-progress line.
    StatusLine,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Header            => write!(f, "personalities header"),
            Element::ArrayBlock(name) if name.is_empty() => write!(f, "array block"),
            Element::ArrayBlock(name)  => write!(f, "array block `{}`", name),
            Element::Device(token)     => write!(f, "device token `{}`", token),
            Element::StatusLine        => write!(f, "status line"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MdstatError {
    /// The status source (or a control file) could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    SourceUnavailable {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    /// A hard parse failure; `line` is 1-based within the source text.
    #[error("malformed {element} at line {line}: {reason}")]
    Format {
        element: Element,
        line:    usize,
        reason:  String,
    },

    #[error("operation total is zero; progress is undefined")]
    ZeroTotal,

    #[error("{} is empty", .path.display())]
    EmptyValue { path: PathBuf },

    #[error("{} holds `{value}`, expected an unsigned integer", .path.display())]
    InvalidValue { path: PathBuf, value: String },

    #[error("invalid array name `{0}`")]
    InvalidArrayName(String),
}

impl MdstatError {
    pub(crate) fn format(element: Element, line: usize, reason: impl Into<String>) -> Self {
        MdstatError::Format { element, line, reason: reason.into() }
    }

    /// Re-anchor a format error found by a single-line decoder to its source line.
    pub(crate) fn at_line(self, number: usize) -> Self {
        match self {
            MdstatError::Format { element, reason, .. } => MdstatError::Format { element, line: number, reason },
            other => other,
        }
    }

    /// True for errors that mean the snapshot data itself cannot be trusted.
    pub fn is_format(&self) -> bool {
        matches!(self, MdstatError::Format { .. })
    }
}

pub type Result<T> = std::result::Result<T, MdstatError>;
