//! Explicit error collector shared by every pipeline stage.
//!
//! Each stage receives `&mut Diagnostics` and records what went wrong; the
//! driver inspects the collector afterwards to decide whether to advance to
//! the next stage, which exit status to use, or whether to keep reading
//! interactive input.

use log::debug;

use crate::error::{ManiError, RuntimeError};

#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ManiError>,
    had_error: bool,
    had_runtime_error: bool,
    latest: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lexical, syntax or resolution error.
    pub fn report(&mut self, error: ManiError) {
        debug!("Reported: {}", error);

        if matches!(error, ManiError::Runtime(_)) {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        self.latest = Some(error.to_string());
        self.errors.push(error);
    }

    pub fn runtime_error(&mut self, error: RuntimeError) {
        self.report(ManiError::Runtime(error));
    }

    /// `true` once any static (lex/parse/resolve) error was reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Text of the most recent report, kept even after [`take_errors`](Self::take_errors).
    pub fn latest_message(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    pub fn errors(&self) -> &[ManiError] {
        &self.errors
    }

    /// Hand the pending errors to the caller for printing. Flags stay set.
    pub fn take_errors(&mut self) -> Vec<ManiError> {
        std::mem::take(&mut self.errors)
    }

    /// Clear the flags and pending errors (used between REPL lines).
    pub fn reset(&mut self) {
        self.errors.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};

    fn token() -> Token {
        Token::new(TokenType::IDENTIFIER, "x", 3, "main.mni".into())
    }

    #[test]
    fn static_and_runtime_flags_are_separate() {
        let mut diagnostics = Diagnostics::new();

        diagnostics.report(ManiError::parse(&token(), "Expect ';' after value."));
        assert!(diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());

        diagnostics.runtime_error(RuntimeError::new(&token(), "Division by zero."));
        assert!(diagnostics.had_runtime_error());
        assert_eq!(diagnostics.errors().len(), 2);
    }

    #[test]
    fn latest_message_uses_reporting_format() {
        let mut diagnostics = Diagnostics::new();

        diagnostics.report(ManiError::parse(&token(), "Expect expression."));
        assert_eq!(
            diagnostics.latest_message(),
            Some("[line 3] Error at 'x' main.mni : Expect expression.")
        );

        diagnostics.runtime_error(RuntimeError::new(&token(), "Undefined variable 'x'."));
        assert_eq!(
            diagnostics.latest_message(),
            Some("Undefined variable 'x'.\n[line 3] at main.mni")
        );
    }

    #[test]
    fn reset_clears_flags_but_keeps_latest() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(ManiError::lex(1, "repl", "Unexpected character '$'."));

        let taken = diagnostics.take_errors();
        assert_eq!(taken.len(), 1);
        assert!(diagnostics.had_error());

        diagnostics.reset();
        assert!(!diagnostics.had_error());
        assert!(diagnostics.latest_message().is_some());
    }
}
