// パス: tests/lexer_reader.rs
// 役割: 字句解析とリーダの境界条件を公開 API から検証する
// 意図: トークン分割・引用記号の展開・アトム分類の優先順位・エラー位置を固定する
// 関連ファイル: src/lexer.rs, src/parser.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use support::lex_values;
use warp::lexer::{Tokenizer, TokenKind};
use warp::{read, Value, WarpError};

#[test]
/// 引用記号・文字列・コメントを含む入力のトークン分割。
fn tokens_for_mixed_input() {
    assert_eq!(
        lex_values("(bind s \"a b\") ; comment\n`(,@xs)"),
        vec!["(", "bind", "s", "\"a b\"", ")", "`", "(", ",@", "xs", ")"]
    );
    assert_eq!(lex_values("'a'b"), vec!["'", "a", "'", "b"]);
    assert!(lex_values("   ; only a comment").is_empty());
}

#[test]
/// 位置情報は 1 始まりの行・桁で記録される。
fn token_positions() {
    let mut t = Tokenizer::new("(a\n  bc)");
    let open = t.next_token().unwrap();
    assert_eq!((open.line, open.col, open.pos), (1, 1, 0));
    t.next_token().unwrap();
    let bc = t.next_token().unwrap();
    assert_eq!(bc.value, "bc");
    assert_eq!((bc.line, bc.col, bc.pos), (2, 3, 5));
    assert_eq!(t.next_token().unwrap().kind, TokenKind::RPAREN);
    assert_eq!(t.next_token().unwrap().kind, TokenKind::EOF);
}

#[test]
/// 引用記号はキーワード付きの 2 要素リストになる。
fn quote_family_markers() {
    assert_eq!(read("'x").unwrap().to_string(), "(quote x)");
    assert_eq!(read("`x").unwrap().to_string(), "(quasiquote x)");
    assert_eq!(read(",x").unwrap().to_string(), "(unquote x)");
    assert_eq!(read(",@x").unwrap().to_string(), "(unquote-splicing x)");
    assert_eq!(read("''x").unwrap().to_string(), "(quote (quote x))");
}

#[test]
/// 読み取った値を印字すると、正規化された形で元のリテラルに戻る。
fn literal_round_trip() {
    for (src, printed) in [
        ("42", "42"),
        ("-3", "-3"),
        ("3.0", "3.0"),
        ("-0.25", "-0.25"),
        ("0.00001", "0.00001"),
        ("99999999999999999999", "100000000000000000000.0"),
        ("true", "true"),
        ("\"hi there\"", "\"hi there\""),
        ("#:n", "#:n"),
        ("(1 (2 3) ())", "(1 (2 3) ())"),
    ] {
        assert_eq!(read(src).unwrap().to_string(), printed, "{}", src);
    }
}

#[test]
/// 極端な大きさの実数も、印字した文字列を読み直すと同じ実数になる。
fn extreme_reals_read_back_as_reals() {
    for src in ["0.00001", "0.000000000123", "99999999999999999999", "123456789012345678901.5"] {
        let value = read(src).unwrap();
        let back = read(&value.to_string()).unwrap();
        match (&value, &back) {
            (Value::Double(a), Value::Double(b)) => assert_eq!(a, b, "{}", src),
            _ => panic!("{} printed as {} and read back as {:?}", src, value, back),
        }
    }
}

#[test]
/// 分類の優先順位: 真偽値や数値がシンボルより先に判定される。
fn classification_order() {
    assert_eq!(read("false").unwrap(), Value::Bool(false));
    assert_eq!(read("1.5").unwrap(), Value::Double(1.5));
    assert_eq!(read("x1").unwrap(), Value::symbol("x1"));
    assert_eq!(read("<=").unwrap(), Value::symbol("<="));
    assert_eq!(read("1a").unwrap(), Value::symbol("1a"));
}

#[test]
/// 括弧の不整合と分類できないトークン。
fn reader_errors() {
    let err = read("(+ 1 (2 3)").unwrap_err();
    assert_eq!(err.code(), "READ001");
    assert_eq!(err.message(), "Unbalanced parens");

    let err = read(")").unwrap_err();
    assert_eq!(err.code(), "READ002");
    assert_eq!(err.message(), "Unexpected )");

    let err = read("(a #)").unwrap_err();
    assert_eq!(err.code(), "READ003");
    assert_eq!(err.to_string(), "[READ003] unknown value type: # @line=1,col=4 @pos=3");

    assert_eq!(read("").unwrap_err().code(), "READ004");
    assert_eq!(read("'").unwrap_err().code(), "READ004");
}

#[test]
/// 閉じていない文字列は字句エラーとして位置とスニペット付きで報告される。
fn unterminated_string_is_a_lex_error() {
    match read("(str! \"abc") {
        Err(WarpError::Lex(e)) => {
            assert_eq!(e.0.code, "LEX001");
            assert_eq!(
                e.to_string(),
                "[LEX001] unterminated string literal @line=1,col=7 @pos=6\n(str! \"abc\n      ^"
            );
        }
        other => panic!("expected lex error, got {:?}", other),
    }
}
