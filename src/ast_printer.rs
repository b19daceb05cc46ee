use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::token::format_number;

/// Converts an AST to a fully parenthesised prefix form, e.g. `(+ 1.0 (group x))`.
/// Token positions and node ids are left out, so two trees print the same
/// exactly when they have the same shape.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::CompoundAssign {
                target,
                operator,
                value,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(target),
                Self::print(value)
            ),

            Expr::Increment {
                target,
                operator,
                prefix,
            } => {
                let fix = if *prefix { "pre" } else { "post" };
                format!("({}{} {})", fix, operator.lexeme, Self::print(target))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::list("call", Some(Self::print(callee)), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Index { object, index, .. } => {
                format!("([] {} {})", Self::print(object), Self::print(index))
            }

            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => format!(
                "([]= {} {} {})",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Function(decl) => Self::function("fn", decl),

            Expr::Array { elements, .. } => Self::list("array", None, elements),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print { value, .. } => format!("(print {})", Self::print(value)),

            Stmt::Let { name, initializer } => match initializer {
                Some(init) => format!("(let {} {})", name.lexeme, Self::print(init)),
                None => format!("(let {})", name.lexeme),
            },

            Stmt::Function(decl) => Self::function("fn", decl),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(sup) = superclass {
                    s.push_str(&format!(" < {}", Self::print(sup)));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::function("method", method));
                }
                s.push(')');
                s
            }

            Stmt::Block(statements) => Self::block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::Break { .. } => "(break)".into(),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },
        }
    }

    fn list(head: &str, first: Option<String>, items: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for part in first.into_iter().chain(items.iter().map(Self::print)) {
            s.push(' ');
            s.push_str(&part);
        }
        s.push(')');
        s
    }

    fn block(statements: &[Stmt]) -> String {
        let mut s = String::from("(block");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(head: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let name = decl.name.as_ref().map_or("", |t| t.lexeme.as_str());

        format!(
            "({} {}({}) {})",
            head,
            name,
            params.join(" "),
            Self::block(&decl.body)
        )
    }
}

/// Prints an AST back as Mani source text. Parentheses appear exactly where
/// the tree has `Grouping` nodes, so re‑parsing the output gives back a tree
/// of the same shape.
pub struct SourcePrinter;

impl SourcePrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),
                LiteralValue::False => "false".into(),
                LiteralValue::Nil => "nil".into(),
                LiteralValue::Number(n) => format_number(*n),
                LiteralValue::Str(s) => Self::quote(s),
            },

            Expr::Grouping(inner) => format!("({})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                let right = Self::print(right);
                // `- -x` must not collapse into `--x`.
                if right.starts_with('-') {
                    format!("{} {}", operator.lexeme, right)
                } else {
                    format!("{}{}", operator.lexeme, right)
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                Self::print(left),
                operator.lexeme,
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => format!("{} = {}", name.lexeme, Self::print(value)),

            Expr::CompoundAssign {
                target,
                operator,
                value,
            } => format!(
                "{} {} {}",
                Self::print(target),
                operator.lexeme,
                Self::print(value)
            ),

            Expr::Increment {
                target,
                operator,
                prefix: true,
            } => format!("{}{}", operator.lexeme, Self::print(target)),

            Expr::Increment {
                target,
                operator,
                prefix: false,
            } => format!("{}{}", Self::print(target), operator.lexeme),

            Expr::Call {
                callee, arguments, ..
            } => format!("{}({})", Self::print(callee), Self::join(arguments)),

            Expr::Get { object, name } => format!("{}.{}", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{}.{} = {}",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Index { object, index, .. } => {
                format!("{}[{}]", Self::print(object), Self::print(index))
            }

            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => format!(
                "{}[{}] = {}",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("super.{}", method.lexeme),

            Expr::Function(decl) => format!("fn {}", Self::signature(decl)),

            Expr::Array { elements, .. } => format!("[{}]", Self::join(elements)),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("{};", Self::print(expr)),

            Stmt::Print { value, .. } => format!("print {};", Self::print(value)),

            Stmt::Let { name, initializer } => match initializer {
                Some(init) => format!("let {} = {};", name.lexeme, Self::print(init)),
                None => format!("let {};", name.lexeme),
            },

            Stmt::Function(decl) => format!("fn {}", Self::signature(decl)),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("class {}", name.lexeme);
                if let Some(sup) = superclass {
                    s.push_str(" < ");
                    s.push_str(&Self::print(sup));
                }
                s.push_str(" {");
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::signature(method));
                }
                s.push_str(" }");
                s
            }

            Stmt::Block(statements) => Self::block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut s = format!(
                    "if ({}) {}",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    s.push_str(" else ");
                    s.push_str(&Self::print_stmt(else_branch));
                }
                s
            }

            Stmt::While { condition, body } => {
                format!("while ({}) {}", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::Break { .. } => "break;".into(),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("return {};", Self::print(value)),
                None => "return;".into(),
            },
        }
    }

    /// `name(params) { body }`, the shared tail of functions and methods.
    fn signature(decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let name = decl.name.as_ref().map_or("", |t| t.lexeme.as_str());

        format!("{}({}) {}", name, params.join(", "), Self::block(&decl.body))
    }

    fn block(statements: &[Stmt]) -> String {
        if statements.is_empty() {
            return "{ }".into();
        }

        let body: Vec<String> = statements.iter().map(Self::print_stmt).collect();
        format!("{{ {} }}", body.join(" "))
    }

    fn join(items: &[Expr]) -> String {
        items.iter().map(Self::print).collect::<Vec<_>>().join(", ")
    }

    fn quote(s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\0' => out.push_str("\\0"),
                _ => out.push(ch),
            }
        }
        out.push('"');
        out
    }
}
