// パス: src/repl/loader.rs
// 役割: ファイルモードの入力読み込み
// 意図: ファイルの先頭行だけを 1 行分の入力として取り出す
// 関連ファイル: src/repl/cmd.rs, src/bin/warp.rs
//! ファイル入力の読み込み
//!
//! 複数行のプログラム読み込みは扱わない。ファイルの先頭行だけが評価対象になる。

/// REPL に必要な最小限のファイル読み込み抽象。
pub(crate) trait ReplIo {
    /// 指定されたパスのソースコードを文字列として取得する。
    fn read_to_string(&self, path: &str) -> Result<String, String>;
}

/// 実際のファイルシステムにアクセスする標準実装。
pub(crate) struct FsIo;

impl ReplIo for FsIo {
    fn read_to_string(&self, path: &str) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| format!("cannot open {}: {}", path, e))
    }
}

/// ファイルの先頭行を返す。空ファイルや空白だけの先頭行なら `None`。
///
/// # Examples
/// ```no_run
/// let line = warp::repl::load_first_line("prog.warp").unwrap();
/// println!("{:?}", line);
/// ```
pub fn load_first_line(path: &str) -> Result<Option<String>, String> {
    first_line_with(&FsIo, path)
}

pub(crate) fn first_line_with<I: ReplIo>(io: &I, path: &str) -> Result<Option<String>, String> {
    let src = io.read_to_string(path)?;
    let first = src.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        Ok(None)
    } else {
        Ok(Some(first.to_string()))
    }
}
