#[cfg(test)]
mod parser_tests {
    use mani::ast::{Expr, Stmt};
    use mani::ast_printer::{AstPrinter, SourcePrinter};
    use mani::diagnostics::Diagnostics;
    use mani::parser::Parser;
    use mani::scanner::scan;

    fn parse_program(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, "test.mni", &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        (statements, diagnostics)
    }

    fn parse_expr(source: &str) -> Expr {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, "test.mni", &mut diagnostics);
        let expr = Parser::new(&tokens).parse_expression(&mut diagnostics);

        assert!(!diagnostics.had_error(), "errors: {:?}", diagnostics.errors());
        expr.expect("an expression")
    }

    fn sexpr(source: &str) -> String {
        let (statements, diagnostics) = parse_program(source);
        assert!(!diagnostics.had_error(), "errors: {:?}", diagnostics.errors());

        statements
            .iter()
            .map(AstPrinter::print_stmt)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.errors().iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(AstPrinter::print(&parse_expr("1 + 2 * 3")), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(
            AstPrinter::print(&parse_expr("(1 + 2) * 3")),
            "(* (group (+ 1.0 2.0)) 3.0)"
        );
        assert_eq!(
            AstPrinter::print(&parse_expr("!true == false")),
            "(== (! true) false)"
        );
        assert_eq!(
            AstPrinter::print(&parse_expr("a or b and c")),
            "(or a (and b c))"
        );
        assert_eq!(
            AstPrinter::print(&parse_expr("1 < 2 == 3 >= 4")),
            "(== (< 1.0 2.0) (>= 3.0 4.0))"
        );
        assert_eq!(AstPrinter::print(&parse_expr("-2.5")), "(- 2.5)");
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_eq!(AstPrinter::print(&parse_expr("1 - 2 - 3")), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(AstPrinter::print(&parse_expr("8 / 4 / 2")), "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(AstPrinter::print(&parse_expr("a = b = 1")), "(= a (= b 1.0))");
    }

    #[test]
    fn test_postfix_chains() {
        assert_eq!(
            AstPrinter::print(&parse_expr("a.b(1, 2)[0].c")),
            "(. ([] (call (. a b) 1.0 2.0) 0.0) c)"
        );
        assert_eq!(
            AstPrinter::print(&parse_expr("obj.field = [1, \"two\"]")),
            "(.= obj field (array 1.0 two))"
        );
        assert_eq!(
            AstPrinter::print(&parse_expr("xs[i] += 2")),
            "(+= ([] xs i) 2.0)"
        );
    }

    #[test]
    fn test_increment_forms() {
        assert_eq!(AstPrinter::print(&parse_expr("i++")), "(post++ i)");
        assert_eq!(AstPrinter::print(&parse_expr("--i")), "(pre-- i)");
        assert_eq!(AstPrinter::print(&parse_expr("a.n++")), "(post++ (. a n))");
    }

    #[test]
    fn test_for_desugars_into_block_and_while() {
        assert_eq!(
            sexpr("for (let i = 0; i < 3; i = i + 1) print i;"),
            "(block (let i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
        );
    }

    #[test]
    fn test_for_without_clauses_loops_forever() {
        assert_eq!(sexpr("for (;;) break;"), "(while true (break))");
    }

    #[test]
    fn test_loop_is_while_true() {
        assert_eq!(sexpr("loop { break; }"), "(while true (block (break)))");
    }

    #[test]
    fn test_let_accepts_arrow() {
        assert_eq!(sexpr("let x -> 5; let y;"), "(let x 5.0) (let y)");
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        assert_eq!(
            sexpr("if (a) if (b) print 1; else print 2;"),
            "(if a (if b (print 1.0) (print 2.0)))"
        );
    }

    #[test]
    fn test_functions_classes_and_literals() {
        assert_eq!(
            sexpr("fn add(a, b) { return a + b; }"),
            "(fn add(a b) (block (return (+ a b))))"
        );
        assert_eq!(
            sexpr("class B < A { init(x) { this.x = x; } get() { return super.get(); } }"),
            "(class B < A (method init(x) (block (; (.= this x x)))) (method get() (block (return (call (super get))))))"
        );
        assert_eq!(
            sexpr("let f = fn (n) { return n; };"),
            "(let f (fn (n) (block (return n))))"
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, diagnostics) = parse_program("1 + 2 = 3;");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at '=' test.mni : Invalid assignment target."]
        );
    }

    #[test]
    fn test_invalid_increment_target() {
        let (_, diagnostics) = parse_program("(a)++;");

        assert_eq!(
            diagnostics.latest_message(),
            Some("[line 1] Error at '++' test.mni : Invalid increment target.")
        );
    }

    #[test]
    fn test_missing_semicolon_at_end_of_file() {
        let (_, diagnostics) = parse_program("print 1");

        assert_eq!(
            messages(&diagnostics),
            vec!["[line 1] Error at end of test.mni : Expect ';' after value."]
        );
    }

    #[test]
    fn test_recovery_reports_every_statement_error() {
        let source = "let = 1;\nprint 2;\nlet x = ;\nprint 3;\nprint (4;";
        let (statements, diagnostics) = parse_program(source);

        let errors = messages(&diagnostics);
        assert_eq!(errors.len(), 3, "errors: {:?}", errors);
        assert!(errors[0].starts_with("[line 1]"));
        assert!(errors[1].starts_with("[line 3]"));
        assert!(errors[2].starts_with("[line 5]"));

        // The two well-formed prints still parse.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_errors_inside_blocks_do_not_end_the_block() {
        let (statements, diagnostics) = parse_program("{ let = 1; print 2; } print 3;");

        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(statements.len(), 2);
        assert_eq!(AstPrinter::print_stmt(&statements[0]), "(block (print 2.0))");
    }

    #[test]
    fn test_reserved_word_is_rejected() {
        let (_, diagnostics) = parse_program("fun;");

        assert_eq!(
            diagnostics.latest_message(),
            Some("[line 1] Error at 'fun' test.mni : Reserved word cannot be used yet.")
        );
    }

    #[test]
    fn test_parse_expression_requires_end_of_input() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("1 2", "test.mni", &mut diagnostics);
        let expr = Parser::new(&tokens).parse_expression(&mut diagnostics);

        assert!(expr.is_none());
        assert_eq!(
            diagnostics.latest_message(),
            Some("[line 1] Error at '2' test.mni : Expect end of expression.")
        );
    }

    #[test]
    fn test_stream_without_eof_parses_as_empty() {
        let mut diagnostics = Diagnostics::new();
        assert!(Parser::new(&[]).parse(&mut diagnostics).is_empty());
        assert!(Parser::new(&[]).parse_expression(&mut diagnostics).is_none());

        let mut tokens = scan("print 1;", "test.mni", &mut diagnostics);
        tokens.pop();
        assert!(Parser::new(&tokens).parse(&mut diagnostics).is_empty());
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn test_too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let (_, diagnostics) = parse_program(&format!("f({});", args));

        assert_eq!(
            diagnostics.latest_message(),
            Some("[line 1] Error at '1' test.mni : Can't have more than 255 arguments.")
        );
    }

    #[test]
    fn test_ids_continue_from_first_id() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("a; b;", "test.mni", &mut diagnostics);
        let mut parser = Parser::new(&tokens).with_first_id(40);
        let statements = parser.parse(&mut diagnostics);

        let ids: Vec<u32> = statements
            .iter()
            .filter_map(|s| match s {
                Stmt::Expression(Expr::Variable { id, .. }) => Some(id.0),
                _ => None,
            })
            .collect();

        assert_eq!(ids, vec![40, 41]);
        assert_eq!(parser.next_id(), 42);
    }

    #[test]
    fn test_printed_source_reparses_to_the_same_tree() {
        let programs = [
            "print -(-1) - --x;",
            "let s = \"tab\\tquote\\\"\" + str(1.5);",
            "fn f(a, b) { if (a > b) return a; else { return b; } }",
            "class A { m() { return this.v[0]++; } } class B < A { m() { return super.m(); } }",
            "for (let i = 0; i < 10; i += 1) { if (i == 5) break; print i * (2 + i); }",
            "let g = fn () { }; loop { x.y = [1, [2, nil], true or false and !x]; break; }",
            "a = b = c; xs[1] /= 2; print !(a != b) == (1 <= 2);",
        ];

        for program in programs {
            let (first, diagnostics) = parse_program(program);
            assert!(!diagnostics.had_error(), "{}: {:?}", program, diagnostics.errors());

            let printed: String = first
                .iter()
                .map(SourcePrinter::print_stmt)
                .collect::<Vec<_>>()
                .join("\n");

            let (second, diagnostics) = parse_program(&printed);
            assert!(!diagnostics.had_error(), "{}: {:?}", printed, diagnostics.errors());

            let shape = |stmts: &[Stmt]| -> Vec<String> {
                stmts.iter().map(AstPrinter::print_stmt).collect()
            };
            assert_eq!(
                shape(first.as_slice()),
                shape(second.as_slice()),
                "printed: {}",
                printed
            );
        }
    }
}
