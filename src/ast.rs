//! Abstract syntax tree for Mani programs.
//!
//! Nodes own their tokens so that function bodies can outlive the source
//! text they were parsed from (a closure defined on one REPL line is still
//! callable on the next). Function declarations are shared behind `Rc`
//! because every closure created from a declaration points at the same body.

use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// Identity of a reference‑bearing expression node, used as the key of the
/// resolver's distance side‑table. Allocated by the parser in construction
/// order and unique across one [`crate::session::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, integral lexemes such as `3` included.
    Number(f64),

    /// String literal with escapes already decoded.
    Str(Rc<str>),

    True,
    False,
    Nil,
}

/// A named or anonymous function: parameter list plus body.
/// Methods reuse this shape without the leading `fn`.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    /// `None` for function literals.
    pub name: Option<Token>,

    /// The `fn` keyword or the method name, for error locations.
    pub keyword: Token,

    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref().map_or("anonymous", |t| t.lexeme.as_str())
    }
}

/// **Expression node.** Every variant that reads or writes a variable by
/// name carries an [`ExprId`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// `target op= value` where `target` is a `Variable`, `Get` or `Index`.
    /// Kept unexpanded so the target's sub‑expressions evaluate once.
    CompoundAssign {
        target: Box<Expr>,
        /// One of `+=`, `-=`, `*=`, `/=`.
        operator: Token,
        value: Box<Expr>,
    },

    /// Prefix `!` or `-`.
    Unary { operator: Token, right: Box<Expr> },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)`, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `object[index]`
    Index {
        object: Box<Expr>,
        /// The closing `]`.
        bracket: Token,
        index: Box<Expr>,
    },

    /// `object[index] = value`
    IndexSet {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `fn (params) { body }`
    Function(Rc<FunctionDecl>),

    Grouping(Box<Expr>),

    /// `[a, b, c]`
    Array { bracket: Token, elements: Vec<Expr> },

    /// `++x`, `x++`, `--x`, `x--`. Prefix yields the updated value,
    /// postfix the prior one.
    Increment {
        target: Box<Expr>,
        operator: Token,
        prefix: bool,
    },
}

impl Expr {
    /// Can this expression appear on the left of `=`, `op=`, `++` or `--`?
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Variable { .. } | Expr::Get { .. } | Expr::Index { .. }
        )
    }
}

/// **Statement node.** `for` and `loop` are desugared by the parser into
/// `Block` and `While`, so they have no variant of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Print { keyword: Token, value: Expr },

    /// `let name (= | ->) initializer? ;`
    Let {
        name: Token,
        initializer: Option<Expr>,
    },

    Function(Rc<FunctionDecl>),

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { condition: Expr, body: Box<Stmt> },

    Break { keyword: Token },

    Return {
        keyword: Token,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },
}
