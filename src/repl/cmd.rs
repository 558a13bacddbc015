// パス: src/repl/cmd.rs
// 役割: REPL のメインループ、メタコマンド解釈、1 行評価の出力振り分け
// 意図: セッションへ 1 行ずつ渡し、結果は標準出力へ、失敗は標準エラーへ流す
// 関連ファイル: src/lib.rs, src/repl/printer.rs, src/repl/loader.rs
//! W.A.R.P REPL におけるコマンド処理と状態遷移を担当するモジュール。
//! 利用者の入力をメタコマンドまたはソース行として解釈し、セッションへ橋渡しする。
//! 1 行の失敗はセッションを壊さず、ループはそのまま続く。

use std::io::{self, Write};

use crate::{Session, Value};

use super::line_editor::{LineEditor, ReadResult};
use super::loader::{first_line_with, FsIo, ReplIo};
use super::printer::{render_banner, render_help, render_names, write_value, PROMPT};

/// REPL の起動オプション。
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplOptions {
    /// バナーを表示しない。
    pub quiet: bool,
}

/// 対話セッションを開始し、EOF か `:quit` までユーザー入力を処理し続ける。
///
/// # Examples
/// ```no_run
/// warp::repl::run_repl(warp::repl::ReplOptions::default());
/// ```
pub fn run_repl(options: ReplOptions) {
    let mut editor = LineEditor::new();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    if let Err(err) = run_repl_with(&mut editor, options, &mut stdout, &mut stderr) {
        let _ = writeln!(stderr, "REPL 実行中にエラーが発生しました: {}", err);
    }
}

/// 1 行だけ評価して結果を出力する。失敗したら `false`。
pub fn run_line<W: Write, E: Write>(src: &str, out: &mut W, err: &mut E) -> io::Result<bool> {
    let mut session = ReplSession::new();
    let msgs = session.exec_eval(src);
    let ok = !msgs.iter().any(|m| matches!(m, ReplMsg::Err(_)));
    dispatch_messages(msgs, out, err)?;
    Ok(ok)
}

/// ファイルの先頭行だけを評価する。空ファイルは何もせず成功。
pub fn run_file<W: Write, E: Write>(path: &str, out: &mut W, err: &mut E) -> io::Result<bool> {
    run_file_with(&FsIo, path, out, err)
}

fn run_file_with<I, W, E>(io: &I, path: &str, out: &mut W, err: &mut E) -> io::Result<bool>
where
    I: ReplIo,
    W: Write,
    E: Write,
{
    match first_line_with(io, path) {
        Ok(Some(line)) => run_line(&line, out, err),
        Ok(None) => Ok(true),
        Err(msg) => {
            writeln!(err, "Runtime Error: {}", msg)?;
            Ok(false)
        }
    }
}

pub(crate) trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
    fn add_history(&mut self, entry: &str);
    fn save_history(&mut self) -> io::Result<()>;
}

impl ReplLineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        LineEditor::add_history(self, entry);
    }

    fn save_history(&mut self) -> io::Result<()> {
        LineEditor::save_history(self)
    }
}

fn run_repl_with<S, W, E>(
    editor: &mut S,
    options: ReplOptions,
    out: &mut W,
    err: &mut E,
) -> io::Result<()>
where
    S: ReplLineSource,
    W: Write,
    E: Write,
{
    if !options.quiet {
        render_banner(out)?;
    }
    let mut session = ReplSession::new();

    loop {
        let line = match editor.read_line(PROMPT) {
            Ok(ReadResult::Line(line)) => line,
            Ok(ReadResult::Eof) => {
                writeln!(out)?;
                break;
            }
            Err(e) => {
                writeln!(err, "入力エラー: {}", e)?;
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        editor.add_history(input);

        match parse_repl_command(input) {
            ReplCommand::Help => render_help(out)?,
            ReplCommand::Quit => break,
            other => {
                let msgs = session.execute(other);
                dispatch_messages(msgs, out, err)?;
            }
        }
    }

    if let Err(e) = editor.save_history() {
        writeln!(err, "ヒストリーの保存に失敗しました: {}", e)?;
    }

    Ok(())
}

fn dispatch_messages<W: Write, E: Write>(
    msgs: Vec<ReplMsg>,
    out: &mut W,
    err: &mut E,
) -> io::Result<()> {
    for msg in msgs {
        match msg {
            ReplMsg::Out(s) => writeln!(out, "{}", s)?,
            ReplMsg::Err(s) => writeln!(err, "{}", s)?,
            ReplMsg::Value(v) => write_value(out, &v)?,
        }
    }
    Ok(())
}

/// REPL のセッション状態。
pub(crate) struct ReplSession {
    session: Session,
}

impl ReplSession {
    pub(crate) fn new() -> Self {
        Self {
            session: Session::new(),
        }
    }

    /// 解釈済みコマンドを実行し、出力メッセージを返す。
    pub(crate) fn execute(&mut self, cmd: ReplCommand) -> Vec<ReplMsg> {
        match cmd {
            ReplCommand::Env => vec![ReplMsg::Out(render_names(&self.session.env().names()))],
            ReplCommand::Macros => {
                vec![ReplMsg::Out(render_names(&self.session.macros().names()))]
            }
            ReplCommand::Eval(src) => self.exec_eval(&src),
            ReplCommand::Help | ReplCommand::Quit => Vec::new(),
        }
    }

    fn exec_eval(&mut self, src: &str) -> Vec<ReplMsg> {
        match self.session.eval_line(src) {
            // マーカーコマンドは出力そのものが結果なので、戻り値の nil は空行にする
            Ok(Some(Value::Nil)) if is_marker_command(src) => vec![ReplMsg::Out(String::new())],
            Ok(Some(value)) => vec![ReplMsg::Value(value)],
            Ok(None) => Vec::new(),
            Err(e) => vec![ReplMsg::Err(format!("Runtime Error: {}", e))],
        }
    }
}

fn is_marker_command(src: &str) -> bool {
    matches!(crate::read(src), Ok(Value::Char(_)))
}

/// 対話セッションがユーザーへ返す応答メッセージのカテゴリ。
pub(crate) enum ReplMsg {
    Out(String),
    Err(String),
    Value(Value),
}

/// REPL が解釈できるトップレベルコマンドの集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    /// `:help` / `:h` でヘルプメッセージを表示する。
    Help,
    /// `:quit` / `:q` でセッションを終了する。
    Quit,
    /// `:env` でルート環境の束縛名を並べる。
    Env,
    /// `:macros` で定義済みマクロ名を並べる。
    Macros,
    /// それ以外の入力はソース行として評価する。
    Eval(String),
}

/// 生の入力文字列を `ReplCommand` 列挙に解析する。
pub(crate) fn parse_repl_command(input: &str) -> ReplCommand {
    match input.trim() {
        ":help" | ":h" => ReplCommand::Help,
        ":quit" | ":q" => ReplCommand::Quit,
        ":env" => ReplCommand::Env,
        ":macros" => ReplCommand::Macros,
        s => ReplCommand::Eval(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;

    #[derive(Default)]
    struct ScriptedLineSource {
        events: VecDeque<&'static str>,
        history: Vec<String>,
        saved: bool,
    }

    impl ScriptedLineSource {
        fn new(lines: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                events: lines.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl ReplLineSource for ScriptedLineSource {
        fn read_line(&mut self, _prompt: &str) -> io::Result<ReadResult> {
            Ok(match self.events.pop_front() {
                Some(s) => ReadResult::Line(s.to_string()),
                None => ReadResult::Eof,
            })
        }

        fn add_history(&mut self, entry: &str) {
            self.history.push(entry.to_string());
        }

        fn save_history(&mut self) -> io::Result<()> {
            self.saved = true;
            Ok(())
        }
    }

    fn run_script(lines: Vec<&'static str>, quiet: bool) -> (String, String, ScriptedLineSource) {
        let mut script = ScriptedLineSource::new(lines);
        let mut out = Vec::new();
        let mut err = Vec::new();
        run_repl_with(&mut script, ReplOptions { quiet }, &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
            script,
        )
    }

    #[test]
    fn parse_repl_command_variants() {
        assert_eq!(parse_repl_command(":help"), ReplCommand::Help);
        assert_eq!(parse_repl_command(" :q "), ReplCommand::Quit);
        assert_eq!(parse_repl_command(":env"), ReplCommand::Env);
        assert_eq!(parse_repl_command(":macros"), ReplCommand::Macros);
        assert_eq!(
            parse_repl_command("(+ 1 2)"),
            ReplCommand::Eval("(+ 1 2)".into())
        );
        assert_eq!(
            parse_repl_command(":unknown"),
            ReplCommand::Eval(":unknown".into())
        );
    }

    #[test]
    fn loop_prints_results_and_survives_errors() {
        let (out, err, script) = run_script(
            vec!["(bind x 1)", "(bind x 2)", "", "(+ x 41)", ":quit", "(+ 0 0)"],
            false,
        );
        assert!(out.starts_with("W.A.R.P Lang, version 0.0.12\n"));
        assert!(out.contains("1\n"));
        assert!(out.contains("42\n"));
        assert!(!out.contains("0\n"));
        assert_eq!(err, "Runtime Error: [EVAL011] Var already bound\n");
        assert!(script.saved);
        assert_eq!(script.history.len(), 4);
    }

    #[test]
    fn defmacro_line_prints_nothing() {
        let (out, err, _) = run_script(
            vec!["(defmacro id (fn (x) x))", ":macros", "(id 7)"],
            true,
        );
        assert_eq!(out, "id\n7\n\n");
        assert!(err.is_empty());
    }

    #[test]
    fn marker_command_prints_blank_line_instead_of_nil() {
        let mut session = ReplSession::new();
        let (msgs, lines) = crate::runtime::capture_output(|| session.exec_eval("#:n"));
        assert_eq!(lines, vec![String::new()]);
        match msgs.as_slice() {
            [ReplMsg::Out(s)] => assert!(s.is_empty()),
            _ => panic!("one blank output line expected"),
        }
        match session.exec_eval("(head 5)").as_slice() {
            [ReplMsg::Value(Value::Nil)] => {}
            _ => panic!("plain nil result is still printed as a value"),
        }
    }

    #[test]
    fn env_command_lists_root_names() {
        let mut session = ReplSession::new();
        session.exec_eval("(bind zeta 1)");
        let msgs = session.execute(ReplCommand::Env);
        match msgs.as_slice() {
            [ReplMsg::Out(s)] => {
                assert!(s.contains("zeta"));
                assert!(s.contains("cons"));
            }
            _ => panic!("one output line expected"),
        }
    }

    #[test]
    fn run_line_reports_failure() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert!(!run_line("(+ \"a\" 1)", &mut out, &mut err).unwrap());
        assert!(out.is_empty());
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("Runtime Error: [EVAL050]"));
    }
}
