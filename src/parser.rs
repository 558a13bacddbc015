// パス: src/parser.rs
// 役割: トークン列から値の木（S 式）を組み立てる再帰下降リーダ
// 意図: 字句解析器から必要な分だけトークンを取り出して 1 つのフォームを読む
// 関連ファイル: src/lexer.rs, src/runtime.rs, tests/lexer_reader.rs
//! 読み取りモジュール
//!
//! - `(` で始まれば対応する `)` までを再帰的にリストへ読む。
//! - 引用記号は `(quote x)` などの 2 要素リストへ展開する。
//! - アトムは 整数 → 実数 → 真偽値 → マーカー → 文字列 → シンボル の順に分類する。
//!   シンボルの判定は緩いため、この順序を崩すと他の分類が隠れてしまう。

use crate::errors::{ParseError, WarpError};
use crate::lexer::{Token, TokenKind, Tokenizer};
use crate::runtime::Value;

/// 遅延字句解析器の上に構築したリーダ。
pub struct Reader<'a> {
    tokens: Tokenizer<'a>,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            tokens: Tokenizer::new(src),
        }
    }

    /// 次のトークンから 1 フォームを読む。
    pub fn read_form(&mut self) -> Result<Value, WarpError> {
        let token = self.tokens.next_token()?;
        self.read_ahead(token)
    }

    /// 既に取り出したトークンを起点に 1 フォームを読む。
    pub fn read_ahead(&mut self, token: Token) -> Result<Value, WarpError> {
        match token.kind {
            TokenKind::LPAREN => {
                let mut items = Vec::new();
                loop {
                    let next = self.tokens.next_token()?;
                    match next.kind {
                        TokenKind::RPAREN => break,
                        TokenKind::EOF => {
                            return Err(error_at("READ001", "Unbalanced parens", &token).into())
                        }
                        _ => items.push(self.read_ahead(next)?),
                    }
                }
                Ok(Value::List(items))
            }
            TokenKind::RPAREN => Err(error_at("READ002", "Unexpected )", &token).into()),
            TokenKind::QUOTE | TokenKind::QUASI | TokenKind::UNQUOTE | TokenKind::SPLICE => {
                let keyword = quote_keyword(token.kind);
                let next = self.tokens.next_token()?;
                if next.kind == TokenKind::EOF {
                    return Err(error_at(
                        "READ004",
                        format!("unexpected end of input after {}", token.value),
                        &token,
                    )
                    .into());
                }
                let form = self.read_ahead(next)?;
                Ok(Value::List(vec![Value::symbol(keyword), form]))
            }
            TokenKind::EOF => Err(error_at("READ004", "unexpected end of input", &token).into()),
            TokenKind::STRING | TokenKind::ATOM => Ok(classify(&token)?),
        }
    }
}

fn quote_keyword(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::QUASI => "quasiquote",
        TokenKind::UNQUOTE => "unquote",
        TokenKind::SPLICE => "unquote-splicing",
        _ => "quote",
    }
}

fn error_at(code: &'static str, msg: impl Into<String>, token: &Token) -> ParseError {
    ParseError::at(code, msg, Some(token.pos), Some(token.line), Some(token.col))
}

/// アトムを固定の優先順位で分類する。
fn classify(token: &Token) -> Result<Value, ParseError> {
    let s = token.value.as_str();
    if let Some(i) = parse_integer(s) {
        return Ok(Value::Int(i));
    }
    if is_real(s) {
        return s
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| error_at("READ003", format!("invalid real literal {}: {}", s, e), token));
    }
    if s == "true" || s == "false" {
        return Ok(Value::Bool(s == "true"));
    }
    if token.kind == TokenKind::ATOM && is_marker(s) {
        return Ok(Value::Char(s.to_string()));
    }
    if token.kind == TokenKind::STRING {
        return Ok(Value::Text(decode_string(s)));
    }
    if is_symbol(s) {
        return Ok(Value::symbol(s));
    }
    Err(error_at(
        "READ003",
        format!("unknown value type: {}", s),
        token,
    ))
}

fn split_sign(s: &str) -> &str {
    s.strip_prefix(&['+', '-'][..]).unwrap_or(s)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(s: &str) -> Option<i64> {
    if !all_digits(split_sign(s)) {
        return None;
    }
    s.parse::<i64>().ok()
}

/// `[-+]?[0-9]*\.?[0-9]+` に一致するか。
fn is_real(s: &str) -> bool {
    let body = split_sign(s);
    match body.split_once('.') {
        Some((int_part, frac)) => {
            (int_part.is_empty() || all_digits(int_part)) && all_digits(frac)
        }
        None => all_digits(body),
    }
}

/// どこかに `#:` と ASCII の単語文字 1 つ以上の並びを含むか（`#:[\w]+`、位置は問わない）。
fn is_marker(s: &str) -> bool {
    s.match_indices("#:").any(|(i, _)| {
        s[i + 2..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// 英数字・アンダースコア、または演算子文字を含めばシンボル。
fn is_symbol(s: &str) -> bool {
    s.chars()
        .any(|c| c.is_alphanumeric() || matches!(c, '_' | '+' | '*' | '-' | '%' | '<' | '>' | '='))
}

/// 文字列リテラルの両端の引用符を外し、エスケープを解決する。
fn decode_string(quoted: &str) -> Vec<char> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// 入力の先頭にある 1 フォームだけを読む（以降のトークンは読まない）。
///
/// # Examples
/// ```
/// let form = warp::parser::read("(+ 1 2.5)").unwrap();
/// assert_eq!(form.to_string(), "(+ 1 2.5)");
/// ```
pub fn read(src: &str) -> Result<Value, WarpError> {
    Reader::new(src).read_form()
}
