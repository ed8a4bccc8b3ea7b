use std::path::PathBuf;

use thiserror::Error;

use crate::span::Span;

/// A lexing or parsing failure inside one source text.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("syntax error: {msg}")]
pub struct SyntaxError {
    pub msg: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(msg: impl Into<String>, span: Span) -> Self {
        Self { msg: msg.into(), span }
    }
}

/// Failures of the project loader.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}:{line}:{column}: {msg}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        msg: String,
        span: Span,
    },

    #[error("manifest error in {}: {msg}", path.display())]
    Manifest { msg: String, path: PathBuf },

    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("found packages {first} and {second} in {}", dir.display())]
    PackageClash {
        dir: PathBuf,
        first: String,
        second: String,
    },

    #[error("no go.mod or refmove.toml found above '{}'", start.display())]
    NoProjectRoot { start: PathBuf },
}

impl LoadError {
    pub fn manifest(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Manifest { msg: msg.into(), path }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Failures while producing the final text of a rewritten unit.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{}: overlapping edits at byte {at}", path.display())]
    Overlap { path: PathBuf, at: usize },

    #[error("{}:{line}:{column}: rewritten source does not parse: {msg}", path.display())]
    Invalid {
        path: PathBuf,
        line: usize,
        column: usize,
        msg: String,
    },
}

/// Errors that stop a relocation run.
#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("package {module:?}: symbol {name:?} not found")]
    TargetNotFound { module: String, name: String },

    #[error(
        "{}:{line}:{column}: package name {alias:?} conflicted with import {existing:?}; please set --to-pkg-name",
        file.display()
    )]
    AliasConflict {
        file: PathBuf,
        line: usize,
        column: usize,
        alias: String,
        existing: String,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("could not write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RelocateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Render a SyntaxError with ariadne for nice terminal output.
pub fn render_error(source: &str, filename: &str, err: &SyntaxError) {
    use ariadne::{Label, Report, ReportKind, Source};

    let span = err.span;
    let _ = Report::build(ReportKind::Error, (), span.start)
        .with_message(format!("syntax error in {filename}"))
        .with_label(Label::new(span.start..span.end.max(span.start + 1)).with_message(&err.msg))
        .finish()
        .eprint(Source::from(source));
}
