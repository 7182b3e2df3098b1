//! Diagnostics: source spans and the single fatal-error type every
//! fallible core operation reports through.
//!
//! The original implementation calls `cdie`, which prints a two-line
//! message and calls `exit(1)` from wherever the violation was detected.
//! Rust re-expresses "fatal and synchronous" as early-return-and-propagate:
//! every core function returns `Result<_, CompileError>` and `?`s its way
//! out; only the CLI's `main` turns a terminal `Err` into the printed
//! message and a non-zero process exit.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A location in a source file. Columns are not tracked by the lexer at
/// sub-token granularity beyond where a token starts, matching the
/// original `colno` field.
#[derive(Clone, PartialEq, Eq)]
pub struct Span {
  pub file: Arc<PathBuf>,
  pub line: u32,
  pub col: u32,
}

impl fmt::Debug for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.file.display(), self.line, self.col)
  }
}

/// Every way semantic analysis, parsing, or I/O can fail.
#[derive(Debug)]
pub enum CompileError {
  /// A semantic or syntactic error with an associated source location.
  Fatal { span: Option<Span>, message: String },
  /// Propagated failure opening, reading, or writing a file.
  Io(std::io::Error),
}

impl CompileError {
  /// Build a [`CompileError::Fatal`] at the given span. This is the
  /// `cdie`-equivalent constructor; call sites still read like the
  /// original's terse one-line complaints.
  pub fn at(span: Span, message: impl Into<String>) -> Self {
    CompileError::Fatal { span: Some(span), message: message.into() }
  }

  /// A fatal error with no useful source location (e.g. CLI argument
  /// parsing, or missing `_start`).
  pub fn fatal(message: impl Into<String>) -> Self {
    CompileError::Fatal { span: None, message: message.into() }
  }
}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompileError::Fatal { span: Some(span), message } =>
        write!(f, "on {span:?}\ncdie: {message}"),
      CompileError::Fatal { span: None, message } => write!(f, "cdie: {message}"),
      CompileError::Io(e) => write!(f, "cdie: {e}"),
    }
  }
}

impl std::error::Error for CompileError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      CompileError::Io(e) => Some(e),
      CompileError::Fatal { .. } => None,
    }
  }
}

impl From<std::io::Error> for CompileError {
  fn from(e: std::io::Error) -> Self { CompileError::Io(e) }
}

/// Convenience alias used throughout the core.
pub type CResult<T> = Result<T, CompileError>;
