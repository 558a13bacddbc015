// パス: src/repl/mod.rs
// 役割: REPL モジュールのファサードと再公開
// 意図: 対話ループとバッチ実行の入口だけを外へ見せる
// 関連ファイル: src/repl/cmd.rs, src/repl/loader.rs, src/bin/warp.rs
//! W.A.R.P の対話環境を構成するモジュール群をまとめたファサード。
//!
//! - `cmd`: メインループとコマンド解釈
//! - `loader`: ファイルモードの入力読み込み
//! - `printer`: ユーザー向けの表示ロジック
//! - `line_editor`: 行入力と履歴

pub mod cmd;
mod line_editor;
mod loader;
mod printer;

pub use cmd::{run_file, run_line, run_repl, ReplOptions};
pub use loader::load_first_line;
