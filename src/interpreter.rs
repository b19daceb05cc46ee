//! Tree‑walking evaluator.
//!
//! Statements execute against a chain of [`Environment`]s; variable
//! references consult the resolver's [`Locals`] table to jump straight to the
//! declaring frame. `break` and `return` travel back up as a [`Flow`] value
//! returned from `execute`, never as errors, so a loop consumes `Break` and
//! a call frame consumes `Return`.

use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::diagnostics::Diagnostics;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::host::{Host, StdHost};
use crate::native;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{Callable, Class, Function, Instance, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// What to do with the remaining top‑level statements after a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimePolicy {
    /// Stop the run (script files).
    #[default]
    Halt,
    /// Skip only the failing statement (interactive input).
    Continue,
}

/// A writable location named by an assignment target, evaluated once.
enum Place<'e> {
    Variable { id: ExprId, name: &'e Token },
    Property { object: Value, name: &'e Token },
    Element { object: Value, index: Value, bracket: &'e Token },
}

/// Nested Mani calls allowed before a call fails with "Stack overflow.".
/// Each level costs several native frames, so this stays well inside the
/// 2 MiB stack of a spawned thread.
pub const MAX_CALL_DEPTH: usize = 128;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    host: Box<dyn Host>,
    policy: RuntimePolicy,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_host(Box::new(StdHost))
    }

    /// An interpreter whose effects go through `host`, with natives installed.
    pub fn with_host(host: Box<dyn Host>) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        native::install(&mut globals);
        let globals = globals.into_ref();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            host,
            policy: RuntimePolicy::default(),
            depth: 0,
        }
    }

    pub fn set_policy(&mut self, policy: RuntimePolicy) {
        self.policy = policy;
    }

    pub fn host(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    /// Merge a resolver table. Ids are unique per session, so tables from
    /// earlier runs stay valid for closures created by those runs.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Executes a program in source order. A runtime error is reported and
    /// aborts its statement; whether later statements still run depends on
    /// the [`RuntimePolicy`].
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error: {}", e.message);

                diagnostics.runtime_error(e);

                if self.policy == RuntimePolicy::Halt {
                    info!("Halting after runtime error");
                    return;
                }
            }
        }

        info!("Interpretation completed");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print { keyword, value } => {
                let value = self.evaluate(value)?;
                self.host
                    .print(&value.to_string())
                    .map_err(|e| RuntimeError::new(keyword, format!("Failed to print: {}", e)))?;
                Ok(Flow::Normal)
            }

            Stmt::Let { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}'", name.lexeme);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                let function = self.closure(decl);
                self.environment
                    .borrow_mut()
                    .define(decl.name(), Value::Callable(Callable::Function(function)));
                Ok(Flow::Normal)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods)?;
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `statements` inside `env`, restoring the current frame afterwards
    /// whether they finish, break, return or fail.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let previous = mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let at = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(RuntimeError::new(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods close over a frame holding `super`, one level above `this`.
        let class_env = match &superclass {
            Some(sup) => {
                let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                env.define("super", Value::Callable(Callable::Class(Rc::clone(sup))));
                env.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let methods = methods
            .iter()
            .map(|decl| {
                let is_initializer = decl.name() == "init";
                let function = Function::new(Rc::clone(decl), Rc::clone(&class_env), is_initializer);
                (decl.name().to_string(), Rc::new(function))
            })
            .collect();

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods,
        };

        debug!("Defined class '{}'", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name, Value::Callable(Callable::Class(Rc::new(class))))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(Rc::clone(s)),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::CompoundAssign {
                target,
                operator,
                value,
            } => self.compound_assign(target, operator, value),

            Expr::Increment {
                target,
                operator,
                prefix,
            } => self.increment(target, operator, *prefix),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                arithmetic(&operator.token_type, operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                get_property(&object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                set_property(&object, name, value.clone())?;
                Ok(value)
            }

            Expr::Index {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                get_element(&object, &index, bracket)
            }

            Expr::IndexSet {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                set_element(&object, &index, bracket, value.clone())?;
                Ok(value)
            }

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Function(decl) => Ok(Value::Callable(Callable::Function(
                self.closure(decl),
            ))),

            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::array(items))
            }
        }
    }

    // Kept out of `evaluate` so its frame stays small: Mani recursion nests it
    // once per call level.

    fn compound_assign(&mut self, target: &Expr, operator: &Token, value: &Expr) -> IResult<Value> {
        let place = self.place(target, operator)?;
        let current = self.read(&place)?;
        let rhs = self.evaluate(value)?;
        let updated = arithmetic(&compound_operator(&operator.token_type), operator, current, rhs)?;
        self.write(&place, updated.clone())?;
        Ok(updated)
    }

    fn increment(&mut self, target: &Expr, operator: &Token, prefix: bool) -> IResult<Value> {
        let place = self.place(target, operator)?;
        let current = match self.read(&place)? {
            Value::Number(n) => n,
            other => {
                return Err(RuntimeError::new(
                    operator,
                    format!(
                        "Operand of '{}' must be a number, got {}.",
                        operator.lexeme,
                        other.type_name()
                    ),
                ))
            }
        };
        let delta = if operator.token_type == TokenType::PLUS_PLUS {
            1.0
        } else {
            -1.0
        };
        self.write(&place, Value::Number(current + delta))?;
        Ok(Value::Number(if prefix { current + delta } else { current }))
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> IResult<Value> {
        let callee = self.evaluate(callee)?;
        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }
        self.call(&callee, paren, args)
    }

    /// `super.method`: the superclass sits `distance` frames out, `this` one
    /// frame closer.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance = self.locals.get(&id).copied().ok_or_else(|| {
            RuntimeError::new(keyword, "Can't use 'super' outside of a method.")
        })?;

        let superclass = match Environment::get_at(&self.environment, distance, keyword)? {
            Value::Callable(Callable::Class(class)) => class,
            _ => return Err(RuntimeError::new(keyword, "Superclass must be a class.")),
        };

        let this = Token::synthetic(TokenType::THIS, "this", keyword);
        let instance = match Environment::get_at(&self.environment, distance.saturating_sub(1), &this)? {
            Value::Instance(instance) => instance,
            _ => return Err(RuntimeError::new(keyword, "'this' is not an instance.")),
        };

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            RuntimeError::new(method, format!("Undefined property '{}'.", method.lexeme))
        })?;

        Ok(Value::Callable(Callable::Function(Rc::new(found.bind(instance)))))
    }

    fn closure(&self, decl: &Rc<FunctionDecl>) -> Rc<Function> {
        Rc::new(Function::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            false,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Variables and places
    // ─────────────────────────────────────────────────────────────────────────

    fn lookup_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> IResult<()> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }

    /// Evaluate the sub‑expressions of an assignment target exactly once.
    fn place<'e>(&mut self, target: &'e Expr, at: &Token) -> IResult<Place<'e>> {
        match target {
            Expr::Variable { id, name } => Ok(Place::Variable { id: *id, name }),

            Expr::Get { object, name } => Ok(Place::Property {
                object: self.evaluate(object)?,
                name,
            }),

            Expr::Index {
                object,
                bracket,
                index,
            } => Ok(Place::Element {
                object: self.evaluate(object)?,
                index: self.evaluate(index)?,
                bracket,
            }),

            // The parser only builds compound and increment nodes over the
            // three shapes above.
            _ => Err(RuntimeError::new(at, "Invalid assignment target.")),
        }
    }

    fn read(&mut self, place: &Place<'_>) -> IResult<Value> {
        match place {
            Place::Variable { id, name } => self.lookup_variable(*id, name),
            Place::Property { object, name } => get_property(object, name),
            Place::Element {
                object,
                index,
                bracket,
            } => get_element(object, index, bracket),
        }
    }

    fn write(&mut self, place: &Place<'_>, value: Value) -> IResult<()> {
        match place {
            Place::Variable { id, name } => self.assign_variable(*id, name, value),
            Place::Property { object, name } => set_property(object, name, value),
            Place::Element {
                object,
                index,
                bracket,
            } => set_element(object, index, bracket, value),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invoke `callee` with already evaluated arguments.
    pub fn call(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> IResult<Value> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::new(
                paren,
                format!("Can only call functions and classes, not {}.", callee.type_name()),
            ));
        };

        if args.len() != callable.arity() {
            return Err(RuntimeError::new(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        match callable {
            Callable::Function(function) => self.call_function(function, paren, args),

            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(self, &args).map_err(|msg| RuntimeError::new(paren, msg))
            }

            Callable::Class(class) => {
                let instance = Rc::new(Instance::new(Rc::clone(class)));

                if let Some(init) = class.find_method("init") {
                    let bound = init.bind(Rc::clone(&instance));
                    self.call_function(&bound, paren, args)?;
                }

                Ok(Value::Instance(instance))
            }
        }
    }

    /// New frame enclosed by the function's *declaring* frame, parameters
    /// bound by position, body run as a block. Fails at `paren` once
    /// [`MAX_CALL_DEPTH`] calls are active.
    fn call_function(&mut self, function: &Function, paren: &Token, args: Vec<Value>) -> IResult<Value> {
        debug!("Calling function '{}'", function.declaration.name());

        if self.depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit {} reached", MAX_CALL_DEPTH);
            return Err(RuntimeError::new(paren, "Stack overflow."));
        }

        let mut env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        self.depth += 1;
        let result = self.execute_block(&function.declaration.body, env.into_ref());
        self.depth -= 1;
        let flow = result?;

        if function.is_initializer {
            let this = Token::synthetic(TokenType::THIS, "this", &function.declaration.keyword);
            return Environment::get_at(&function.closure, 0, &this);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            // A stray `break` is rejected by the resolver; it cannot leave the body.
            Flow::Normal | Flow::Break => Value::Nil,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators and property access
// ─────────────────────────────────────────────────────────────────────────────

/// The binary operator behind a compound assignment token.
fn compound_operator(op: &TokenType) -> TokenType {
    match op {
        TokenType::PLUS_EQUAL => TokenType::PLUS,
        TokenType::MINUS_EQUAL => TokenType::MINUS,
        TokenType::STAR_EQUAL => TokenType::STAR,
        TokenType::SLASH_EQUAL => TokenType::SLASH,
        other => other.clone(),
    }
}

/// Apply binary operator `op` (located at `at`) to two evaluated operands.
fn arithmetic(op: &TokenType, at: &Token, left: Value, right: Value) -> IResult<Value> {
    let numbers = |left: &Value, right: &Value| match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(at, "Operands must be numbers.")),
    };

    match op {
        TokenType::PLUS => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Ok(Value::string(format!("{}{}", left, right)))
            }
            _ => Err(RuntimeError::new(
                at,
                "Operands must be two numbers or at least one string.",
            )),
        },

        TokenType::MINUS => numbers(&left, &right).map(|(a, b)| Value::Number(a - b)),

        TokenType::STAR => numbers(&left, &right).map(|(a, b)| Value::Number(a * b)),

        TokenType::SLASH => {
            let (a, b) = numbers(&left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::new(at, "Division by zero."));
            }
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => numbers(&left, &right).map(|(a, b)| Value::Bool(a > b)),
        TokenType::GREATER_EQUAL => numbers(&left, &right).map(|(a, b)| Value::Bool(a >= b)),
        TokenType::LESS => numbers(&left, &right).map(|(a, b)| Value::Bool(a < b)),
        TokenType::LESS_EQUAL => numbers(&left, &right).map(|(a, b)| Value::Bool(a <= b)),

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(RuntimeError::new(at, "Invalid binary operator.")),
    }
}

fn get_property(object: &Value, name: &Token) -> IResult<Value> {
    match object {
        Value::Instance(instance) => instance.get(name),

        Value::Array(items) if name.lexeme == "length" => {
            Ok(Value::Number(items.borrow().len() as f64))
        }

        Value::Str(s) if name.lexeme == "length" => Ok(Value::Number(s.chars().count() as f64)),

        Value::Nil => Err(RuntimeError::new(
            name,
            format!("Cannot read property '{}' of nil.", name.lexeme),
        )),

        other => Err(RuntimeError::new(
            name,
            format!(
                "Undefined property '{}' on {}.",
                name.lexeme,
                other.type_name()
            ),
        )),
    }
}

fn set_property(object: &Value, name: &Token, value: Value) -> IResult<()> {
    match object {
        Value::Instance(instance) => {
            instance.set(name, value);
            Ok(())
        }

        Value::Nil => Err(RuntimeError::new(
            name,
            format!("Cannot set property '{}' of nil.", name.lexeme),
        )),

        other => Err(RuntimeError::new(
            name,
            format!("Only instances have fields, not {}.", other.type_name()),
        )),
    }
}

/// A non‑negative integral index below `len`.
fn element_index(index: &Value, len: usize, at: &Token) -> IResult<usize> {
    let Value::Number(n) = index else {
        return Err(RuntimeError::new(
            at,
            format!("Index must be a number, got {}.", index.type_name()),
        ));
    };

    if n.fract() != 0.0 || *n < 0.0 {
        return Err(RuntimeError::new(
            at,
            "Index must be a non-negative integer.",
        ));
    }

    let i = *n as usize;
    if i >= len {
        return Err(RuntimeError::new(
            at,
            format!("Index {} out of bounds for length {}.", i, len),
        ));
    }

    Ok(i)
}

fn get_element(object: &Value, index: &Value, at: &Token) -> IResult<Value> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let i = element_index(index, items.len(), at)?;
            Ok(items[i].clone())
        }

        Value::Str(s) => {
            let i = element_index(index, s.chars().count(), at)?;
            Ok(Value::string(
                s.chars().nth(i).map(String::from).unwrap_or_default(),
            ))
        }

        Value::Nil => Err(RuntimeError::new(at, "Cannot index nil.")),

        other => Err(RuntimeError::new(
            at,
            format!("Only arrays and strings can be indexed, not {}.", other.type_name()),
        )),
    }
}

fn set_element(object: &Value, index: &Value, at: &Token, value: Value) -> IResult<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = element_index(index, items.len(), at)?;
            items[i] = value;
            Ok(())
        }

        Value::Str(_) => Err(RuntimeError::new(at, "Strings are immutable.")),

        Value::Nil => Err(RuntimeError::new(at, "Cannot index nil.")),

        other => Err(RuntimeError::new(
            at,
            format!("Only arrays support index assignment, not {}.", other.type_name()),
        )),
    }
}
