//! Driver‑facing pipeline: scan, parse, resolve, interpret.
//!
//! A [`Session`] owns one interpreter and one diagnostics collector, so
//! globals, classes and closures defined by one [`Session::run`] stay visible
//! to the next. This is what the REPL builds on.

use log::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::host::{Host, StdHost};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan;
use crate::value::Value;

pub use crate::interpreter::RuntimePolicy;

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// A lexical, syntax or resolution error stopped the pipeline before
    /// anything executed.
    StaticError,
    /// Execution started and at least one statement failed.
    RuntimeError,
}

impl RunStatus {
    /// Process exit code for file mode.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::StaticError => 65,
            RunStatus::RuntimeError => 70,
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
    next_id: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Console session that halts on the first runtime error.
    pub fn new() -> Self {
        Self::with_host(Box::new(StdHost), RuntimePolicy::Halt)
    }

    pub fn with_host(host: Box<dyn Host>, policy: RuntimePolicy) -> Self {
        let mut interpreter = Interpreter::with_host(host);
        interpreter.set_policy(policy);

        Self {
            interpreter,
            diagnostics: Diagnostics::new(),
            next_id: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Clear error flags between interactive lines. Definitions survive.
    pub fn reset_errors(&mut self) {
        self.diagnostics.reset();
    }

    /// Run a whole program. Each stage runs only if the stages before it
    /// reported nothing; errors are left in [`Session::diagnostics`].
    pub fn run(&mut self, source: &str, file_name: &str) -> RunStatus {
        info!("Running {}", file_name);

        let tokens = scan(source, file_name, &mut self.diagnostics);
        if self.diagnostics.had_error() {
            return RunStatus::StaticError;
        }

        let mut parser = Parser::new(&tokens).with_first_id(self.next_id);
        let statements = parser.parse(&mut self.diagnostics);
        self.next_id = parser.next_id();
        if self.diagnostics.had_error() {
            return RunStatus::StaticError;
        }

        let locals = Resolver::new(&mut self.diagnostics).resolve(&statements);
        if self.diagnostics.had_error() {
            return RunStatus::StaticError;
        }

        debug!("Resolved {} local references", locals.len());
        self.interpreter.add_locals(locals);

        self.interpreter.interpret(&statements, &mut self.diagnostics);

        if self.diagnostics.had_runtime_error() {
            RunStatus::RuntimeError
        } else {
            RunStatus::Ok
        }
    }

    /// Evaluate a single expression at global scope and return its value.
    /// `None` means an error was reported.
    pub fn evaluate_expression(&mut self, source: &str, file_name: &str) -> Option<Value> {
        info!("Evaluating expression from {}", file_name);

        let tokens = scan(source, file_name, &mut self.diagnostics);
        if self.diagnostics.had_error() {
            return None;
        }

        let mut parser = Parser::new(&tokens).with_first_id(self.next_id);
        let expr = parser.parse_expression(&mut self.diagnostics);
        self.next_id = parser.next_id();
        let expr = expr?;

        let locals = Resolver::new(&mut self.diagnostics).resolve_expression(&expr);
        if self.diagnostics.had_error() {
            return None;
        }
        self.interpreter.add_locals(locals);

        match self.interpreter.evaluate(&expr) {
            Ok(value) => Some(value),
            Err(e) => {
                self.diagnostics.runtime_error(e);
                None
            }
        }
    }
}
