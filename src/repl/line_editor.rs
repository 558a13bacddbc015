// パス: src/repl/line_editor.rs
// 役割: プロンプト付きの行入力と、ファイルへ永続化される入力履歴
// 意図: 端末制御に依存せず標準入力から 1 行ずつ受け取る
// 関連ファイル: src/repl/cmd.rs
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// 行入力が返す結果。
pub enum ReadResult {
    Line(String),
    Eof,
}

/// 履歴を保持する行入力器。
pub struct LineEditor {
    history: History,
}

impl LineEditor {
    /// 保存済みの履歴を読み込み、新しいエディタを構築する。
    pub fn new() -> Self {
        Self {
            history: History::open(default_history_file()),
        }
    }

    /// プロンプトを出力し、標準入力から 1 行読む。
    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        read_line_from(&mut io::stdin().lock())
    }

    pub fn add_history(&mut self, entry: &str) {
        self.history.record(entry);
    }

    /// 現在の履歴内容を永続ストレージへ書き出す。
    pub fn save_history(&self) -> io::Result<()> {
        self.history.persist()
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// 任意の入力源から 1 行読み、末尾の改行を落とす。
fn read_line_from<R: BufRead>(reader: &mut R) -> io::Result<ReadResult> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line)?;
    if bytes == 0 {
        return Ok(ReadResult::Eof);
    }
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(ReadResult::Line(line))
}

/// 履歴の最大保持件数。古いものから捨てる。
const HISTORY_LIMIT: usize = 500;

/// 入力履歴。保存先がなければメモリ上だけで保持する。
struct History {
    entries: VecDeque<String>,
    file: Option<PathBuf>,
}

impl History {
    /// 保存先から直近 `HISTORY_LIMIT` 件だけを読み込む。読めなければ空で始める。
    fn open(file: Option<PathBuf>) -> Self {
        let saved = file
            .as_deref()
            .and_then(|p| fs::read_to_string(p).ok())
            .unwrap_or_default();
        let mut history = Self {
            entries: VecDeque::with_capacity(HISTORY_LIMIT),
            file,
        };
        for line in saved.lines() {
            history.record(line);
        }
        history
    }

    /// 空行と直前と同じ入力は記録しない。
    fn record(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return;
        }
        self.entries.push_back(line.to_owned());
        while self.entries.len() > HISTORY_LIMIT {
            self.entries.pop_front();
        }
    }

    fn persist(&self) -> io::Result<()> {
        let Some(file) = self.file.as_deref() else {
            return Ok(());
        };
        if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(entry);
            text.push('\n');
        }
        fs::write(file, text)
    }
}

/// `WARP_HISTORY_FILE` があればそれを使い、空文字なら履歴を保存しない。
/// なければホームディレクトリ直下の `.warp_history`。
fn default_history_file() -> Option<PathBuf> {
    match env::var_os("WARP_HISTORY_FILE") {
        Some(path) if path.is_empty() => None,
        Some(path) => Some(PathBuf::from(path)),
        None => env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".warp_history")),
    }
}
