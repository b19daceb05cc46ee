//! Centralised error hierarchy for the **Mani interpreter**.
//!
//! Every stage (scanner, parser, resolver, runtime, script loading) converts
//! its failure modes into one of the variants defined here. The module
//! **does not** print diagnostics itself; reporting goes through
//! [`crate::diagnostics::Diagnostics`].

use std::io;
use std::rc::Rc;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManiError {
    /// Lexical (scanner) error.
    #[error("[line {line}] Error {location} : {message}")]
    Lex {
        /// 1‑based line where the error occurred.
        line: usize,

        /// Where in the source, e.g. `in main.mni`.
        location: String,

        /// Human‑readable description.
        message: String,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error {location} : {message}")]
    Parse {
        line: usize,
        location: String,
        message: String,
    },

    /// Static resolution failure (scoping rules, misplaced `return`/`break`).
    #[error("[line {line}] Error {location} : {message}")]
    Resolve {
        line: usize,
        location: String,
        message: String,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Rejected script path (wrong extension and similar).
    #[error("{0}")]
    Script(String),

    /// Wrapper around `std::io::Error` (transparent).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting a script.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ManiError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, file: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        ManiError::Lex {
            line,
            location: format!("in {}", file),
            message,
        }
    }

    /// Helper constructor for the **parser**, located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        ManiError::Parse {
            line: token.line,
            location: location_of(token),
            message,
        }
    }

    /// Helper constructor for the **resolver**, located at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        ManiError::Resolve {
            line: token.line,
            location: location_of(token),
            message,
        }
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        format!("at end of {}", token.file)
    } else {
        format!("at '{}' {}", token.lexeme, token.file)
    }
}

/// A failure raised while evaluating a statement. Aborts the rest of that
/// statement, never the process.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}\n[line {line}] at {file}")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
    pub file: Rc<str>,
}

impl RuntimeError {
    /// Runtime error attributed to `token`'s line and file.
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        Self {
            message: msg.into(),
            line: token.line,
            file: Rc::clone(&token.file),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, ManiError>;
