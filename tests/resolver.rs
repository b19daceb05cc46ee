#[cfg(test)]
mod resolver_tests {
    use mani::ast::{Expr, Stmt};
    use mani::diagnostics::Diagnostics;
    use mani::parser::Parser;
    use mani::resolver::{Locals, Resolver};
    use mani::scanner::scan;

    fn resolve(source: &str) -> (Vec<Stmt>, Locals, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, "test.mni", &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        assert!(!diagnostics.had_error(), "errors: {:?}", diagnostics.errors());

        let locals = Resolver::new(&mut diagnostics).resolve(&statements);
        (statements, locals, diagnostics)
    }

    fn errors(source: &str) -> Vec<String> {
        let (_, _, diagnostics) = resolve(source);
        diagnostics.errors().iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_globals_get_no_entry() {
        let (_, locals, diagnostics) = resolve("let a = 1; print a;");

        assert!(!diagnostics.had_error());
        assert!(locals.is_empty());
    }

    #[test]
    fn test_distances_count_enclosing_scopes() {
        let (statements, locals, _) = resolve("{ let a = 1; { { print a; } } }");

        // Block > Block > Block > Print(Variable a)
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected a block");
        };
        let Stmt::Block(middle) = &outer[1] else {
            panic!("expected a block");
        };
        let Stmt::Block(inner) = &middle[0] else {
            panic!("expected a block");
        };
        let Stmt::Print {
            value: Expr::Variable { id, .. },
            ..
        } = &inner[0]
        else {
            panic!("expected print of a variable");
        };

        assert_eq!(locals.get(id), Some(&2));
    }

    #[test]
    fn test_closure_captures_resolve_through_function_scope() {
        let (_, locals, diagnostics) = resolve(
            "fn outer() { let x = 1; fn inner() { return x; } return inner; }",
        );

        assert!(!diagnostics.had_error());
        // `x` from inner's body is one hop out; `inner` in outer's body is local.
        let mut distances: Vec<usize> = locals.values().copied().collect();
        distances.sort();
        assert_eq!(distances, vec![0, 1]);
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            errors("{ let a = 1; { let a = a; } }"),
            vec!["[line 1] Error at 'a' test.mni : Can't read local variable in its own initializer."]
        );
        assert_eq!(
            errors("let a = a;"),
            vec!["[line 1] Error at 'a' test.mni : Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            errors("fn f() { let a = 1; let a = 2; }"),
            vec!["[line 1] Error at 'a' test.mni : Already a variable with this name in this scope."]
        );

        // Globals may be redefined; shadowing in an inner block is fine.
        assert!(errors("let a = 1; let a = 2; { let a = 3; }").is_empty());
    }

    #[test]
    fn test_context_errors() {
        assert_eq!(
            errors("return 1;"),
            vec!["[line 1] Error at 'return' test.mni : Can't return from top-level code."]
        );
        assert_eq!(
            errors("break;"),
            vec!["[line 1] Error at 'break' test.mni : Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            errors("print this;"),
            vec!["[line 1] Error at 'this' test.mni : Can't use 'this' outside of a class."]
        );
        assert_eq!(
            errors("fn f() { return super.m; }"),
            vec!["[line 1] Error at 'super' test.mni : Can't use 'super' outside of a class."]
        );
        assert_eq!(
            errors("class A { m() { return super.m(); } }"),
            vec!["[line 1] Error at 'super' test.mni : Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            errors("class A < A {}"),
            vec!["[line 1] Error at 'A' test.mni : A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_methods_and_initializers_may_return() {
        assert!(errors("class A { init() { return 1; } m() { return this; } }").is_empty());
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        assert_eq!(
            errors("while (true) { fn f() { break; } }"),
            vec!["[line 1] Error at 'break' test.mni : Can't use 'break' outside of a loop."]
        );
        assert!(errors("while (true) { if (true) { break; } }").is_empty());
        assert!(errors("for (;;) { loop { break; } break; }").is_empty());
    }

    #[test]
    fn test_every_error_is_reported_in_one_pass() {
        let found = errors("return 1;\nbreak;\nprint this;");

        assert_eq!(found.len(), 3);
        assert!(found[0].starts_with("[line 1]"));
        assert!(found[1].starts_with("[line 2]"));
        assert!(found[2].starts_with("[line 3]"));
    }

    #[test]
    fn test_super_is_one_scope_beyond_this() {
        let (statements, locals, diagnostics) = resolve(
            "class A { m() {} } class B < A { m() { return super.m; } }",
        );
        assert!(!diagnostics.had_error());

        let Stmt::Class { methods, .. } = &statements[1] else {
            panic!("expected a class");
        };
        let Stmt::Return {
            value: Some(Expr::Super { id, .. }),
            ..
        } = &methods[0].body[0]
        else {
            panic!("expected return super.m");
        };

        // method body -> `this` scope -> `super` scope
        assert_eq!(locals.get(id), Some(&2));
    }

    #[test]
    fn test_resolution_leaves_the_tree_untouched() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("{ let a = 1; a = a + 1; }", "test.mni", &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        let before = statements.clone();

        let locals = Resolver::new(&mut diagnostics).resolve(&statements);

        assert_eq!(statements, before);
        assert_eq!(locals.len(), 2);
    }
}
