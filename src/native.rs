//! Built‑in functions installed into the global environment.

use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::value::{Callable, NativeFn, NativeFunction, Value};

const NATIVES: &[(&str, usize, NativeFn)] = &[
    ("clock", 0, clock),
    ("input", 0, input),
    ("len", 1, len),
    ("str", 1, to_str),
    ("file_exists", 1, file_exists),
];

/// Define every native in `globals`.
pub fn install(globals: &mut Environment) {
    for &(name, arity, func) in NATIVES {
        debug!("Defining native function '{}'", name);

        globals.define(
            name,
            Value::Callable(Callable::Native(Rc::new(NativeFunction { name, arity, func }))),
        );
    }
}

/// Seconds since the Unix epoch, with millisecond precision.
fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
}

/// Next line from the host, or `nil` at end of input.
fn input(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    match interpreter.host().read_line() {
        Ok(Some(line)) => Ok(Value::string(line)),
        Ok(None) => Ok(Value::Nil),
        Err(e) => Err(format!("Failed to read input: {}", e)),
    }
}

fn len(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
        other => Err(format!(
            "len() expects a string or an array, got {}.",
            other.type_name()
        )),
    }
}

fn to_str(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    Ok(Value::string(args[0].to_string()))
}

fn file_exists(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Str(name) => Ok(Value::Bool(interpreter.host().resource_exists(name))),
        other => Err(format!(
            "file_exists() expects a string, got {}.",
            other.type_name()
        )),
    }
}
