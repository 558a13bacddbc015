// パス: src/errors.rs
// 役割: 字句解析・読み取り・展開・評価の各段階で使うエラー型を定義する
// 意図: 全段階で共通の診断書式 [CODE] メッセージ @line:col を保つ
// 関連ファイル: src/lexer.rs, src/parser.rs, src/expander.rs, src/evaluator.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。
//!
//! - 各段階のエラーは `ErrorInfo` を包む newtype として表現する。
//! - シェルへ渡す集約型 `WarpError` は段階ごとのエラーを透過的に包む。

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,      // バイトオフセット（任意）
    pub line: Option<usize>,     // 1-origin（任意）
    pub col: Option<usize>,      // 1-origin（任意）
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
            snippet: None,
        }
    }

    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), Some(p)) => write!(
                f,
                "[{}] {} @line={},col={} @pos={}",
                self.code, self.msg, l, c, p
            )?,
            (Some(l), Some(c), None) => {
                write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?
            }
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = if c > 1 {
                " ".repeat(c - 1) + "^"
            } else {
                "^".to_string()
            };
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

/// 字句解析の失敗（閉じていない文字列リテラルなど）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LexerError(pub ErrorInfo);

impl LexerError {
    pub fn at_with_snippet(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
        snippet: impl Into<String>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col).with_snippet(snippet))
    }
}

/// 読み取り（S 式構築）の失敗。括弧の不整合や分類できないトークン。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub ErrorInfo);

impl ParseError {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self(ErrorInfo::new(code, msg, pos))
    }

    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col))
    }
}

/// 展開・評価エラーの分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 特殊形式の形が不正（`if` の分岐不足、`fn` の仮引数がシンボルでない等）。
    Syntax,
    /// 未束縛変数の参照、または束縛済みの名前の再束縛。
    Binding,
    /// 演算対象の型の組み合わせが不正。
    Type,
    /// 整数オーバーフローやゼロ剰余。
    Arithmetic,
    /// 呼び出せない値の適用、引数個数の不一致。
    Application,
}

/// マクロ展開時・評価時のエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{info}")]
pub struct EvalError {
    pub kind: ErrorKind,
    pub info: ErrorInfo,
}

impl EvalError {
    pub fn new(kind: ErrorKind, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            kind,
            info: ErrorInfo::new(code, msg, None),
        }
    }

    pub fn syntax(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, code, msg)
    }

    pub fn binding(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Binding, code, msg)
    }

    pub fn type_mismatch(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, code, msg)
    }

    pub fn arithmetic(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arithmetic, code, msg)
    }

    pub fn application(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Application, code, msg)
    }

    pub fn code(&self) -> &'static str {
        self.info.code
    }

    pub fn message(&self) -> &str {
        &self.info.msg
    }
}

/// シェルへ返す集約エラー。段階ごとのエラーをそのまま表示する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarpError {
    #[error(transparent)]
    Lex(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl WarpError {
    /// 診断コードを返す（テストや REPL の分類用）。
    pub fn code(&self) -> &'static str {
        match self {
            WarpError::Lex(e) => e.0.code,
            WarpError::Parse(e) => e.0.code,
            WarpError::Eval(e) => e.info.code,
        }
    }

    /// 位置情報を除いたメッセージ本体を返す。
    pub fn message(&self) -> &str {
        match self {
            WarpError::Lex(e) => &e.0.msg,
            WarpError::Parse(e) => &e.0.msg,
            WarpError::Eval(e) => &e.info.msg,
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
