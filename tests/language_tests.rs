/// End-to-end tests for the Lexi language
/// Source text goes through the lexer, parser and interpreter of one session
use std::rc::Rc;

use lexi::{BufferConsole, Interpreter, Lexi, Value};

fn run(source: &str) -> Value {
    Lexi::new().run("<test>", source).unwrap()
}

fn num(n: f64) -> Value {
    Value::number(n)
}

fn session_with_console() -> (Lexi, Rc<BufferConsole>) {
    let console = Rc::new(BufferConsole::new());
    let interpreter = Interpreter::new().with_console(console.clone());
    (Lexi::with_interpreter(interpreter), console)
}

#[test]
fn test_operator_precedence() {
    assert_eq!(run("2 + 3 * 4"), num(14.0));
    assert_eq!(run("(2 + 3) * 4"), num(20.0));
    assert_eq!(run("10 - 4 - 3"), num(3.0));
    assert_eq!(run("2 ^ 3 ^ 2"), num(512.0));
    assert_eq!(run("1 + 2 < 4 and 3 == 3"), Value::boolean(true));
}

#[test]
fn test_tetration() {
    assert_eq!(run("2^^3"), num(16.0));
    assert_eq!(run("3 ^^ 0"), num(1.0));
    assert_eq!(run("2 ^^ 1"), num(2.0));
    // `^` groups first on either side of `^^`
    assert_eq!(run("2^2^^2"), num(256.0));
    assert_eq!(run("2^^2^2"), num(65536.0));
}

#[test]
fn test_numbers_are_floats() {
    assert_eq!(run("7 / 2"), num(3.5));
    assert_eq!(run("0.1 + 0.2").to_string(), (0.1f64 + 0.2).to_string());
    assert_eq!(run("3.0").to_string(), "3");
}

#[test]
fn test_session_bindings_persist() {
    let lexi = Lexi::new();
    assert_eq!(lexi.run("<test>", "var x : 5").unwrap(), num(5.0));
    assert_eq!(lexi.run("<test>", "x").unwrap(), num(5.0));
    assert_eq!(lexi.run("<test>", "var x : x + 1").unwrap(), num(6.0));
    assert!(lexi.globals().contains_local("x"));
}

#[test]
fn test_while_collects_values() {
    let source = "{
        var i : 0;
        while i < 3 : var i : i + 1
    }!";
    assert_eq!(run(source), Value::list(vec![num(1.0), num(2.0), num(3.0)]));
    assert_eq!(run("while false : 1"), Value::list(vec![]));
}

#[test]
fn test_if_chains() {
    let source = "{
        fun sign(n) : if n < 0 : \"neg\" elif n == 0 : \"zero\" else : \"pos\";
        [sign -> (-4), sign -> (0), sign -> (9)]
    }!";
    assert_eq!(
        run(source),
        Value::list(vec![
            Value::string("neg"),
            Value::string("zero"),
            Value::string("pos"),
        ])
    );
    assert_eq!(run("if 0 : 1"), Value::null());
    assert_eq!(run("if \"\" : 1 else : 2"), num(2.0));
}

#[test]
fn test_logic_operators() {
    assert_eq!(run("1 and \"x\""), Value::boolean(true));
    assert_eq!(run("0 or null"), Value::boolean(false));
    assert_eq!(run("not []"), Value::boolean(false));
    assert_eq!(run("not 0"), Value::boolean(true));
}

#[test]
fn test_logic_operators_evaluate_both_sides() {
    let (lexi, console) = session_with_console();
    lexi.run("<test>", "false and print -> (\"right\")").unwrap();
    lexi.run("<test>", "true or print -> (\"right\")").unwrap();
    assert_eq!(console.output(), vec!["right".to_string(), "right".to_string()]);
}

#[test]
fn test_equality_never_fails() {
    assert_eq!(run("1 == \"1\""), Value::boolean(false));
    assert_eq!(run("[1, (2, 3)] == [1, (2, 3)]"), Value::boolean(true));
    assert_eq!(run("null != false"), Value::boolean(true));
    assert_eq!(run("print == print"), Value::boolean(true));
    assert_eq!(run("print == len"), Value::boolean(false));
}

#[test]
fn test_string_operations() {
    assert_eq!(run("\"ab\" + \"cd\""), Value::string("abcd"));
    assert_eq!(run("\"ab\" * 3"), Value::string("ababab"));
    assert_eq!(run("\"ab\" * 1.5"), Value::string("abab"));
    assert_eq!(run("\"apple\" < \"banana\""), Value::boolean(true));
    assert_eq!(run("\"line\\n\""), Value::string("line\n"));
}

#[test]
fn test_collection_operations() {
    assert_eq!(
        run("[1, 2] + [3]"),
        Value::list(vec![num(1.0), num(2.0), num(3.0)])
    );
    assert_eq!(
        run("[1] + \"x\""),
        Value::list(vec![num(1.0), Value::string("x")])
    );
    assert_eq!(
        run("(1, 2) * 2"),
        Value::tuple(vec![num(1.0), num(2.0), num(1.0), num(2.0)])
    );
    assert_eq!(run("len -> ([1; 2; 3])"), num(3.0));
}

#[test]
fn test_list_copies_do_not_share_storage() {
    let lexi = Lexi::new();
    lexi.run("<test>", "var a : [1, 2]").unwrap();
    lexi.run("<test>", "var b : a").unwrap();
    lexi.run("<test>", "var b : b + 3").unwrap();

    assert_eq!(
        lexi.run("<test>", "a").unwrap(),
        Value::list(vec![num(1.0), num(2.0)])
    );
    assert_eq!(
        lexi.run("<test>", "b").unwrap(),
        Value::list(vec![num(1.0), num(2.0), num(3.0)])
    );
}

#[test]
fn test_indexing_and_conversions() {
    assert_eq!(run("[10, 20, 30][1]"), num(20.0));
    assert_eq!(run("[10, 20, 30][-1]"), num(30.0));
    assert_eq!(run("\"hello\"[0]"), Value::string("h"));
    assert_eq!(
        run("[10, 20, 30](0, 2)"),
        Value::tuple(vec![num(10.0), num(30.0)])
    );
    assert_eq!(
        run("\"hi\"[]"),
        Value::list(vec![Value::string("h"), Value::string("i")])
    );
    assert_eq!(run("5()"), Value::tuple(vec![num(5.0)]));
    assert_eq!(run("(1, 2)[]"), Value::list(vec![num(1.0), num(2.0)]));
}

#[test]
fn test_blocks_are_deferred() {
    let (lexi, console) = session_with_console();

    let value = lexi
        .run("<test>", "var b : {print -> (\"a\"); print -> (\"b\"); 7}")
        .unwrap();
    assert_eq!(value.type_name(), "curl");
    assert_eq!(value.to_string(), "{3 nodes}");
    assert!(console.output().is_empty());

    assert_eq!(lexi.run("<test>", "b[2]").unwrap(), num(7.0));
    assert!(console.output().is_empty());

    assert_eq!(lexi.run("<test>", "b!").unwrap(), num(7.0));
    assert_eq!(console.output(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_block_scope() {
    let lexi = Lexi::new();
    lexi.run("<test>", "{var inner : 1}!").unwrap();
    assert!(lexi.run("<test>", "inner").is_err());

    // Conversions run in the scope that created the block
    assert_eq!(
        lexi.run("<test>", "{var y : 2; y * 10}[]").unwrap(),
        Value::list(vec![num(2.0), num(20.0)])
    );
    assert_eq!(lexi.run("<test>", "y").unwrap(), num(2.0));
}

#[test]
fn test_functions_and_closures() {
    let source = "{
        fun counter(start) : {
            var n : start;
            fun () : n + 1
        };
        var next : counter -> (41);
        next!
    }!";
    assert_eq!(run(source), num(42.0));

    assert_eq!(run("(fun (a, b) : a * b) -> (6, 7)"), num(42.0));
    assert_eq!(run("type -> (fun () : 1)"), Value::string("function"));
    assert_eq!(run("fun named() : 1").to_string(), "<function named>");
}

#[test]
fn test_recursive_function() {
    let source = "{
        fun fib(n) : if n < 2 : n else : (fib -> (n - 1)) + (fib -> (n - 2));
        fib -> (15)
    }!";
    assert_eq!(run(source), num(610.0));
}

#[test]
fn test_type_names() {
    let cases = [
        ("null", "null"),
        ("true", "boolean"),
        ("1", "number"),
        ("\"s\"", "string"),
        ("[1]", "list"),
        ("(1, 2)", "tuple"),
        ("{1}", "curl"),
        ("fun () : 1", "function"),
        ("print", "builtin-function"),
    ];
    for (source, expected) in cases {
        let value = run(&format!("type -> ({source})"));
        assert_eq!(value, Value::string(expected), "type of {source}");
    }
}

#[test]
fn test_print_and_input() {
    let console = Rc::new(BufferConsole::with_input(["Ada"]));
    let interpreter = Interpreter::new().with_console(console.clone());
    let lexi = Lexi::with_interpreter(interpreter);

    let source = "{
        var name : input!;
        print -> (\"hi \" + name);
        print -> ([1, \"two\"])
    }!";
    assert_eq!(lexi.run("<test>", source).unwrap(), Value::null());
    assert_eq!(
        console.output(),
        vec!["hi Ada".to_string(), "[1, \"two\"]".to_string()]
    );
}

#[test]
fn test_run_builtin_shares_globals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.lexi");
    // The script's program scope is the caller's global table
    std::fs::write(&path, "var double : fun (x) : x * 2").unwrap();

    let lexi = Lexi::new();
    let source = format!("run -> (\"{}\")", path.display());
    assert_eq!(lexi.run("<test>", &source).unwrap(), Value::null());
    assert_eq!(lexi.run("<test>", "double -> (21)").unwrap(), num(42.0));
}

#[test]
fn test_comments_and_separators() {
    let source = "{
        // a comment
        var a : 1;;
        var b : 2, // trailing
        a + b
    }!";
    assert_eq!(run(source), num(3.0));
}
