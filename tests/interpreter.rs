#[cfg(test)]
mod interpreter_tests {
    use mani::host::MemoryHost;
    use mani::session::{RunStatus, RuntimePolicy, Session};
    use mani::value::Value;

    struct Run {
        status: RunStatus,
        lines: Vec<String>,
        errors: Vec<String>,
    }

    fn run_with(host: MemoryHost, policy: RuntimePolicy, source: &str) -> Run {
        let mut session = Session::with_host(Box::new(host.clone()), policy);
        let status = session.run(source, "test.mni");
        let errors = session
            .diagnostics()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect();

        Run {
            status,
            lines: host.lines(),
            errors,
        }
    }

    fn run(source: &str) -> Run {
        run_with(MemoryHost::new(), RuntimePolicy::Halt, source)
    }

    /// Printed lines of a program that must run cleanly.
    fn output(source: &str) -> Vec<String> {
        let result = run(source);
        assert_eq!(result.status, RunStatus::Ok, "errors: {:?}", result.errors);
        result.lines
    }

    fn runtime_error(source: &str) -> String {
        let result = run(source);
        assert_eq!(result.status, RunStatus::RuntimeError, "output: {:?}", result.lines);
        result.errors.last().cloned().unwrap_or_default()
    }

    #[test]
    fn test_arithmetic_and_printing() {
        assert_eq!(
            output("print 1 + 2 * 3; print 7 / 2; print -4; print \"a\" + \"b\";"),
            vec!["7", "3.5", "-4", "ab"]
        );
    }

    #[test]
    fn test_concatenation_stringifies_the_other_operand() {
        assert_eq!(
            output("print \"n=\" + 3; print 1.5 + \"x\"; print \"\" + nil + true;"),
            vec!["n=3", "1.5x", "niltrue"]
        );
    }

    #[test]
    fn test_truthiness_and_logic() {
        assert_eq!(
            output("print !0; print !\"\"; print !nil; print nil or \"d\"; print 1 and 2; print false and x;"),
            vec!["false", "false", "true", "d", "2", "false"]
        );
    }

    #[test]
    fn test_equality_without_coercion() {
        assert_eq!(
            output("print 1 == \"1\"; print nil == false; print \"a\" == \"a\"; print [1, 2] == [1, 2];"),
            vec!["false", "false", "true", "true"]
        );
    }

    #[test]
    fn test_closures_capture_the_environment() {
        assert_eq!(
            output("let x = 1; fn f() { return x; } x = 2; print f();"),
            vec!["2"]
        );
    }

    #[test]
    fn test_counters_are_independent() {
        let source = "
            fn make() { let i = 0; fn inc() { i = i + 1; return i; } return inc; }
            let c = make();
            c();
            print c();
            let d = make();
            print d();
        ";

        assert_eq!(output(source), vec!["2", "1"]);
    }

    #[test]
    fn test_resolved_binding_ignores_later_shadowing() {
        let source = "
            let a = \"global\";
            {
                fn show() { print a; }
                show();
                let a = \"block\";
                show();
            }
        ";

        assert_eq!(output(source), vec!["global", "global"]);
    }

    #[test]
    fn test_super_dispatch_is_relative_to_defining_class() {
        let source = "
            class A { greet() { return \"A\"; } }
            class B < A { greet() { return super.greet() + \"B\"; } }
            class C < B {}
            print B().greet();
            print C().greet();
        ";

        assert_eq!(output(source), vec!["AB", "AB"]);
    }

    #[test]
    fn test_initializer_and_fields() {
        let source = "
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            let p = Point(3, 4);
            print p.sum();
            p.x = 10;
            print p.sum();
            print p;
            print Point;
            print p.init(1, 1) == p;
        ";

        assert_eq!(output(source), vec!["7", "14", "<Point instance>", "Point", "true"]);
    }

    #[test]
    fn test_initializer_return_value_is_ignored() {
        let source = "
            class Box {
                init(v) { this.v = v; if (v > 1) return 99; return; }
            }
            let b = Box(2);
            print b;
            print b.v;
            print b.init(0) == b;
        ";

        assert_eq!(output(source), vec!["<Box instance>", "2", "true"]);
    }

    #[test]
    fn test_methods_bind_this() {
        let source = "
            class Counter {
                init() { this.n = 0; }
                bump() { this.n += 1; return this.n; }
            }
            let c = Counter();
            let bump = c.bump;
            bump();
            print bump();
            print c.n;
        ";

        assert_eq!(output(source), vec!["2", "2"]);
    }

    #[test]
    fn test_compound_assignment_and_increments() {
        assert_eq!(output("let x = 5; x += 3; print x;"), vec!["8"]);
        assert_eq!(output("let y = 5; y++; print y;"), vec!["6"]);
        assert_eq!(output("let z = 5; print z++; print z;"), vec!["5", "6"]);
        assert_eq!(output("let w = 5; print --w; print w;"), vec!["4", "4"]);
        assert_eq!(output("let s = \"a\"; s += 1; print s;"), vec!["a1"]);
        assert!(runtime_error("let s = \"a\"; s *= 2;").starts_with("Operands must be numbers."));
    }

    #[test]
    fn test_compound_target_is_evaluated_once() {
        let source = "
            let calls = 0;
            let xs = [10, 20];
            fn at() { calls++; return xs; }
            at()[1] += 5;
            at()[0]++;
            print xs;
            print calls;
        ";

        assert_eq!(output(source), vec!["[11, 25]", "2"]);
    }

    #[test]
    fn test_loops_and_break() {
        assert_eq!(output("loop { break; } print \"done\";"), vec!["done"]);

        let source = "
            let out = 0;
            for (let i = 0; i < 3; i++) {
                let j = 0;
                while (true) {
                    if (j == 2) { break; }
                    j++;
                    out += 1;
                }
            }
            print out;
        ";
        assert_eq!(output(source), vec!["6"]);

        assert_eq!(
            output("let i = 0; while (i < 3) { print i; i = i + 1; }"),
            vec!["0", "1", "2"]
        );
    }

    #[test]
    fn test_return_unwinds_out_of_loops() {
        let source = "
            fn first_over(limit) {
                for (let i = 0; ; i++) { if (i * i > limit) return i; }
            }
            print first_over(10);
        ";

        assert_eq!(output(source), vec!["4"]);
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            output("fn fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            vec!["610"]
        );
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        let result = run_with(
            MemoryHost::new(),
            RuntimePolicy::Continue,
            "fn f(n) { return f(n + 1); }\nf(0);\nprint \"still here\";",
        );

        assert_eq!(result.status, RunStatus::RuntimeError);
        assert_eq!(result.errors, vec!["Stack overflow.\n[line 1] at test.mni"]);
        assert_eq!(result.lines, vec!["still here"]);

        // Unbounded construction recursion goes through the same limit.
        assert!(runtime_error("class A { init() { A(); } } A();").starts_with("Stack overflow."));
    }

    #[test]
    fn test_recursion_below_the_depth_limit() {
        assert_eq!(
            output("fn down(n) { if (n == 0) return 0; return 1 + down(n - 1); } print down(100);"),
            vec!["100"]
        );
    }

    #[test]
    fn test_function_literals_and_values() {
        let source = "
            let twice = fn (f, x) { return f(f(x)); };
            print twice(fn (n) { return n * 3; }, 2);
            fn named() {}
            print named;
            print named();
            print clock;
        ";

        assert_eq!(output(source), vec!["18", "<fn named>", "nil", "<native fn clock>"]);
    }

    #[test]
    fn test_arrays_are_shared_and_indexable() {
        let source = "
            let a = [1, \"two\", [3]];
            let b = a;
            b[0] = 100;
            print a;
            print a[2][0];
            print a.length;
            print len(a);
            print \"héllo\"[1];
            print \"héllo\".length;
        ";

        assert_eq!(output(source), vec!["[100, two, [3]]", "3", "3", "3", "é", "5"]);
    }

    #[test]
    fn test_self_containing_array() {
        let source = "
            let a = [1];
            a[0] = a;
            print a;
            let b = [1];
            b[0] = b;
            print a == b;
        ";

        assert_eq!(output(source), vec!["[[...]]", "true"]);
    }

    #[test]
    fn test_natives() {
        let host = MemoryHost::new()
            .with_input(["first line"])
            .with_resource("data.txt");

        let result = run_with(
            host,
            RuntimePolicy::Halt,
            "print input(); print input(); print file_exists(\"data.txt\"); print file_exists(\"nope\"); print str(12) + str(nil); print clock() > 0;",
        );

        assert_eq!(result.status, RunStatus::Ok, "errors: {:?}", result.errors);
        assert_eq!(result.lines, vec!["first line", "nil", "true", "false", "12nil", "true"]);
    }

    #[test]
    fn test_division_by_zero_is_a_runtime_error() {
        let result = run("print \"before\"; print 1 / 0; print \"after\";");

        assert_eq!(result.status, RunStatus::RuntimeError);
        assert_eq!(result.lines, vec!["before"]);
        assert_eq!(result.errors, vec!["Division by zero.\n[line 1] at test.mni"]);
    }

    #[test]
    fn test_runtime_error_messages() {
        assert!(runtime_error("print -\"a\";").starts_with("Operand must be a number."));
        assert!(runtime_error("print 1 < \"a\";").starts_with("Operands must be numbers."));
        assert!(runtime_error("print true + 1;")
            .starts_with("Operands must be two numbers or at least one string."));
        assert!(runtime_error("print missing;").starts_with("Undefined variable 'missing'."));
        assert!(runtime_error("missing = 1;").starts_with("Undefined variable 'missing'."));
        assert!(runtime_error("fn f(a) {} f();").starts_with("Expected 1 arguments but got 0."));
        assert!(runtime_error("\"x\"();").starts_with("Can only call functions and classes"));
        assert!(runtime_error("class A {} print A().nope;").starts_with("Undefined property 'nope'."));
        assert!(runtime_error("let n; print n.field;").starts_with("Cannot read property 'field' of nil."));
        assert!(runtime_error("print [1][1];").starts_with("Index 1 out of bounds for length 1."));
        assert!(runtime_error("print [1][0.5];").starts_with("Index must be a non-negative integer."));
        assert!(runtime_error("let s = \"ab\"; s[0] = \"c\";").starts_with("Strings are immutable."));
        assert!(runtime_error("let s = \"a\"; s++;").starts_with("Operand of '++' must be a number"));
        assert!(runtime_error("let NotAClass = 1; class B < NotAClass {}")
            .starts_with("Superclass must be a class."));
    }

    #[test]
    fn test_runtime_error_reports_line() {
        let message = runtime_error("let a = 1;\n\nprint a + nil;");

        assert_eq!(
            message,
            "Operands must be two numbers or at least one string.\n[line 3] at test.mni"
        );
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let result = run("print \"side effect\"; let a = a;");

        assert_eq!(result.status, RunStatus::StaticError);
        assert!(result.lines.is_empty());
        assert_eq!(
            result.errors,
            vec!["[line 1] Error at 'a' test.mni : Can't read local variable in its own initializer."]
        );
        assert_eq!(result.status.exit_code(), 65);
    }

    #[test]
    fn test_lexical_errors_prevent_parsing() {
        let result = run("print 1; @");

        assert_eq!(result.status, RunStatus::StaticError);
        assert!(result.lines.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_continue_policy_skips_only_the_failing_statement() {
        let result = run_with(
            MemoryHost::new(),
            RuntimePolicy::Continue,
            "print 1; print nil + nil; print 3;",
        );

        assert_eq!(result.status, RunStatus::RuntimeError);
        assert_eq!(result.status.exit_code(), 70);
        assert_eq!(result.lines, vec!["1", "3"]);
    }

    #[test]
    fn test_error_inside_call_restores_global_scope() {
        let result = run_with(
            MemoryHost::new(),
            RuntimePolicy::Continue,
            "let x = \"global\"; fn f() { let x = \"local\"; { print 1 / 0; } } f(); print x;",
        );

        assert_eq!(result.lines, vec!["global"]);
    }

    #[test]
    fn test_session_keeps_definitions_across_runs() {
        let host = MemoryHost::new();
        let mut session = Session::with_host(Box::new(host.clone()), RuntimePolicy::Continue);

        assert_eq!(session.run("let n = 1;", "REPL"), RunStatus::Ok);
        assert_eq!(
            session.run("fn add(k) { n += k; return n; }", "REPL"),
            RunStatus::Ok
        );
        assert_eq!(session.run("print oops;", "REPL"), RunStatus::RuntimeError);
        session.reset_errors();

        assert_eq!(session.run("{ let local = add(4); print local; }", "REPL"), RunStatus::Ok);
        assert_eq!(session.run("print n;", "REPL"), RunStatus::Ok);
        assert_eq!(host.lines(), vec!["5", "5"]);
        assert!(!session.diagnostics().had_runtime_error());
    }

    #[test]
    fn test_evaluate_expression() {
        let mut session = Session::with_host(Box::new(MemoryHost::new()), RuntimePolicy::Halt);

        assert_eq!(
            session.evaluate_expression("(1 + 2) * 4", "expr.mni"),
            Some(Value::Number(12.0))
        );
        assert_eq!(
            session.evaluate_expression("\"a\" + \"b\"", "expr.mni"),
            Some(Value::string("ab"))
        );
        assert_eq!(session.evaluate_expression("1 / 0", "expr.mni"), None);
        assert!(session.diagnostics().had_runtime_error());
    }
}
