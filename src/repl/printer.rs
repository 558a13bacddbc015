// パス: src/repl/printer.rs
// 役割: REPL のヘルプ表示と値・名前一覧の出力
// 意図: 対話時の表示形式を一箇所にまとめる
// 関連ファイル: src/repl/cmd.rs, src/runtime.rs
//! REPL で用いるヘルプメッセージと値出力を集約したモジュール。

use crate::runtime::Value;
use std::io::{self, Write};

pub(crate) const BANNER: &str = "W.A.R.P Lang, version 0.0.12";
pub(crate) const PROMPT: &str = "::> ";

const HELP_TEXT: &str = concat!(
    "利用可能なコマンド:\n",
    "  :help, :h          ヘルプ（本メッセージ）\n",
    "  :env               ルート環境の束縛名一覧\n",
    "  :macros            定義済みマクロ名一覧\n",
    "  :quit, :q          終了\n",
    "\n",
    "例:\n",
    "  ::> (bind f (fn (y) (+ y 1)))\n",
    "  ::> (f 5)                      ; 6\n",
    "  ::> `(1 ,(+ 1 1) 3)            ; (1 2 3)\n",
);

/// ヘルプメッセージを任意のライターへ描画する。
pub(crate) fn render_help<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HELP_TEXT.as_bytes())
}

/// 起動時のバナー。
pub(crate) fn render_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "Starting...")?;
    writeln!(out)
}

/// 値の印字表現を 1 行で書き出す。
pub(crate) fn write_value<W: Write>(out: &mut W, v: &Value) -> io::Result<()> {
    writeln!(out, "{}", crate::write(v))
}

/// 名前の一覧を 1 行に並べる。空なら `(none)`。
pub(crate) fn render_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(" ")
    }
}
