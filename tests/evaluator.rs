// パス: tests/evaluator.rs
// 役割: 評価器の正常系と代表的な失敗ケースをテーブル駆動で検証
// 意図: 特殊形式・関数適用・束縛規則の挙動が回帰しないようにする
// 関連ファイル: src/evaluator.rs, src/runtime.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use support::{approx_eq, eval_result, eval_value, SessionFixture};
use warp::{ErrorKind, Value, WarpError};

#[derive(Clone, Copy)]
struct EvalCase {
    expr: &'static str,
    expect: Expect,
    note: &'static str,
}

#[derive(Clone, Copy)]
enum Expect {
    Bool(bool),
    Int(i64),
    Double(f64),
    Printed(&'static str),
    Error(&'static str),
}

fn verify_case(case: &EvalCase) {
    match case.expect {
        Expect::Bool(expected) => match eval_value(case.expr) {
            Value::Bool(actual) => assert_eq!(actual, expected, "{}", case.note),
            other => panic!(
                "{}: expected Bool({expected}), got {:?} for {:?}",
                case.note, other, case.expr
            ),
        },
        Expect::Int(expected) => match eval_value(case.expr) {
            Value::Int(actual) => assert_eq!(actual, expected, "{}", case.note),
            other => panic!(
                "{}: expected Int({expected}), got {:?} for {:?}",
                case.note, other, case.expr
            ),
        },
        Expect::Double(expected) => match eval_value(case.expr) {
            Value::Double(actual) => assert!(
                approx_eq(actual, expected),
                "{}: expected ≈ {expected}, got {actual} for {:?}",
                case.note,
                case.expr
            ),
            other => panic!(
                "{}: expected Double({expected}), got {:?} for {:?}",
                case.note, other, case.expr
            ),
        },
        Expect::Printed(expected) => {
            assert_eq!(warp::write(&eval_value(case.expr)), expected, "{}", case.note)
        }
        Expect::Error(expected_code) => match eval_result(case.expr) {
            Err(err) => assert_eq!(
                err.code(),
                expected_code,
                "{}: unexpected code for {:?}",
                case.note,
                case.expr
            ),
            Ok(value) => panic!(
                "{}: expected error {}, got value {:?} for {:?}",
                case.note, expected_code, value, case.expr
            ),
        },
    }
}

#[test]
/// 評価器の代表ケースをテーブルドリブンで検証する。
fn evaluator_smoke_suite() {
    let cases = [
        EvalCase {
            expr: "(+ 1 2)",
            expect: Expect::Int(3),
            note: "integer addition",
        },
        EvalCase {
            expr: "(+ 1 2.0)",
            expect: Expect::Double(3.0),
            note: "real contaminates the sum",
        },
        EvalCase {
            expr: "(- 10 1 2)",
            expect: Expect::Int(7),
            note: "left fold subtraction",
        },
        EvalCase {
            expr: "(< 1 2 3)",
            expect: Expect::Bool(true),
            note: "ascending chain",
        },
        EvalCase {
            expr: "(< 1 3 2)",
            expect: Expect::Bool(false),
            note: "broken chain",
        },
        EvalCase {
            expr: "(if true 1 2)",
            expect: Expect::Int(1),
            note: "if success branch",
        },
        EvalCase {
            expr: "(if '() 1 2)",
            expect: Expect::Int(2),
            note: "empty list is falsy",
        },
        EvalCase {
            expr: "(if 0 1 2)",
            expect: Expect::Int(1),
            note: "zero is truthy",
        },
        EvalCase {
            expr: "'(1 2 3)",
            expect: Expect::Printed("(1 2 3)"),
            note: "quote shorthand",
        },
        EvalCase {
            expr: "'(a b)",
            expect: Expect::Printed("(a b)"),
            note: "quoted symbols are not looked up",
        },
        EvalCase {
            expr: "((fn (x) (* x x)) 4)",
            expect: Expect::Int(16),
            note: "non-symbol head yielding a closure",
        },
        EvalCase {
            expr: "(fn (x) x)",
            expect: Expect::Printed("function"),
            note: "closure printing",
        },
        EvalCase {
            expr: "(do 1 2 3)",
            expect: Expect::Int(3),
            note: "do returns last",
        },
        EvalCase {
            expr: "((fn (a) 1 2 a) 9)",
            expect: Expect::Int(9),
            note: "multiple body forms run in order",
        },
        EvalCase {
            expr: "undefined_name",
            expect: Expect::Error("EVAL010"),
            note: "unbound variable",
        },
        EvalCase {
            expr: "(\"s\" 1)",
            expect: Expect::Error("EVAL030"),
            note: "non-callable non-symbol head",
        },
        EvalCase {
            expr: "()",
            expect: Expect::Error("EVAL030"),
            note: "empty list as code",
        },
        EvalCase {
            expr: "(+ \"a\" 1)",
            expect: Expect::Error("EVAL050"),
            note: "text in arithmetic",
        },
    ];
    for case in &cases {
        verify_case(case);
    }
}

#[test]
/// 一度束縛した名前は同じスコープでも入れ子のスコープでも再束縛できない。
fn rebinding_is_rejected_everywhere_in_the_chain() {
    let mut fx = SessionFixture::with_lines(&["(bind x 1)"]);
    match fx.eval_result("(bind x 2)") {
        Err(WarpError::Eval(e)) => {
            assert_eq!(e.kind, ErrorKind::Binding);
            assert_eq!(e.message(), "Var already bound");
        }
        other => panic!("expected binding error, got {:?}", other),
    }
    let err = fx.eval_result("((fn () (bind x 3)))").unwrap_err();
    assert_eq!(err.message(), "Var already bound");
    assert_eq!(fx.eval_value("x"), Value::Int(1));
}

#[test]
/// クロージャは定義時の環境を捕捉し、後から追加された束縛に影響されない。
fn closure_captures_lexical_environment() {
    let mut fx = SessionFixture::with_lines(&["(bind f (fn (y) (+ y 1)))"]);
    assert_eq!(fx.eval_value("(f 5)"), Value::Int(6));
    fx.eval_value("(bind y 100)");
    assert_eq!(fx.eval_value("(f 5)"), Value::Int(6));
}

#[test]
/// 仮引数は新しいフレームに束縛されるので、外側の同名束縛を隠せる。
fn parameters_shadow_outer_bindings() {
    let mut fx = SessionFixture::with_lines(&["(bind n 10)", "(bind id (fn (n) n))"]);
    assert_eq!(fx.eval_value("(id 3)"), Value::Int(3));
    assert_eq!(fx.eval_value("n"), Value::Int(10));
}

#[test]
/// 捕捉された環境は定義呼び出しの後も生き残る。
fn closures_outlive_their_defining_call() {
    let mut fx = SessionFixture::with_lines(&[
        "(bind adder (fn (n) (fn (x) (+ x n))))",
        "(bind add2 (adder 2))",
    ]);
    assert_eq!(fx.eval_value("(add2 40)"), Value::Int(42));
}

#[test]
/// 再帰関数はルート環境の束縛を通じて自身を参照できる。
fn recursion_through_root_binding() {
    let mut fx = SessionFixture::with_lines(&[
        "(bind fact (fn (n) (if (< n 2) 1 (* n (fact (- n 1))))))",
    ]);
    assert_eq!(fx.eval_value("(fact 10)"), Value::Int(3628800));
}

#[test]
/// 失敗した行の途中までに行われた束縛は残る。
fn partial_binds_persist_after_failure() {
    let mut fx = SessionFixture::new();
    assert!(fx.eval_result("(do (bind a 1) (+ a \"x\"))").is_err());
    assert_eq!(fx.eval_value("a"), Value::Int(1));
}

#[test]
/// `#:n` は環境から引いた手続きを引数なしで呼ぶ。
fn marker_invokes_niladic_command() {
    let (result, lines) = warp::runtime::capture_output(|| eval_result("#:n"));
    assert_eq!(result.unwrap(), Some(Value::Nil));
    assert_eq!(lines, vec![String::new()]);
}

#[test]
/// 数値でない関数値を適用すると Application エラー。
fn applying_a_number_fails() {
    let mut fx = SessionFixture::with_lines(&["(bind k 1)"]);
    match fx.eval_result("(k 2)") {
        Err(WarpError::Eval(e)) => {
            assert_eq!(e.kind, ErrorKind::Application);
            assert_eq!(e.code(), "EVAL020");
        }
        other => panic!("expected application error, got {:?}", other),
    }
}

#[test]
/// 関数本体で束縛したクロージャは、返り値とセッションを捨てれば解放される。
fn closures_bound_in_calls_are_freed_with_the_session() {
    let mut session = warp::Session::new();
    session
        .eval_line("(bind mk (fn () (do (bind g (fn () 1)) g)))")
        .unwrap();
    let weak = match session.eval_line("(mk)").unwrap() {
        Some(Value::Closure(g)) => std::rc::Rc::downgrade(&g),
        other => panic!("expected closure, got {:?}", other),
    };
    assert!(weak.upgrade().is_some());
    drop(session);
    assert!(weak.upgrade().is_none());
}
