// パス: src/lib.rs
// 役割: クレートのルート。各段階のモジュールを束ね、シェル向けの入口を公開する
// 意図: 読み取り・展開・評価・表示の 4 操作とセッションだけを外へ見せる
// 関連ファイル: src/parser.rs, src/expander.rs, src/evaluator.rs, src/repl/cmd.rs
//! W.A.R.P Lang ルートモジュール
//!
//! 目的:
//! - 小さな Lisp 系言語の処理系（字句解析 → 読み取り → マクロ展開 → 評価 → 表示）。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 環境とマクロ表は明示的なオブジェクトとして受け渡し、プロセス全体の可変状態は持たない。
//! - シェルは 1 行ごとに `read` → `expand` → `evaluate` → `write` を呼ぶだけ。

pub mod errors;
pub mod evaluator;
pub mod expander;
pub mod lexer;
pub mod parser;
pub mod primitives;
pub mod repl;
pub mod runtime;

pub use crate::errors::*;
pub use crate::expander::MacroTable;
pub use crate::runtime::{Env, Value};

/// 入力の先頭にある 1 フォームを読む。
pub fn read(src: &str) -> Result<Value, WarpError> {
    parser::read(src)
}

/// フォームを展開する。`defmacro` のように何も残らなければ `None`。
pub fn expand(form: &Value, macros: &mut MacroTable, env: &Env) -> Result<Option<Value>, WarpError> {
    Ok(expander::expand(form, macros, env)?)
}

/// 展開済みフォームを評価する。
pub fn evaluate(form: &Value, env: &Env) -> Result<Value, WarpError> {
    Ok(evaluator::evaluate(form, env)?)
}

/// 値の印字表現。
pub fn write(value: &Value) -> String {
    value.to_string()
}

/// ルート環境とマクロ表を 1 組にした対話セッション。
///
/// # Examples
/// ```
/// let mut session = warp::Session::new();
/// session.eval_line("(bind f (fn (y) (+ y 1)))").unwrap();
/// let v = session.eval_line("(f 5)").unwrap().unwrap();
/// assert_eq!(warp::write(&v), "6");
/// ```
pub struct Session {
    env: Env,
    macros: MacroTable,
}

impl Session {
    /// 組み込み手続きを登録したルート環境で始める。
    pub fn new() -> Self {
        Self {
            env: primitives::initial_env(),
            macros: MacroTable::new(),
        }
    }

    /// 1 行分の入力を読み取り・展開・評価する。展開で何も残らなければ `Ok(None)`。
    ///
    /// 失敗しても、それまでに `bind` された名前は残る。
    pub fn eval_line(&mut self, src: &str) -> Result<Option<Value>, WarpError> {
        let form = read(src)?;
        match expand(&form, &mut self.macros, &self.env)? {
            Some(expanded) => Ok(Some(evaluate(&expanded, &self.env)?)),
            None => Ok(None),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // クロージャと環境の Rc 循環を断つ
        self.env.teardown();
    }
}
