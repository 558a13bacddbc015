// パス: src/bin/warp.rs
// 役割: REPL・1 行評価・ファイルモードを起動する実行ファイルの入口
// 意図: コマンドライン引数で起動モードを切り替える
// 関連ファイル: src/repl/mod.rs, src/repl/cmd.rs, src/lib.rs
use std::io;
use std::process::ExitCode;

use clap::Parser;

/// W.A.R.P Lang の対話環境。
#[derive(Debug, Parser)]
#[command(name = "warp-repl", version, about = "W.A.R.P Lang interpreter")]
struct Args {
    /// 1 行分の式を評価して結果を表示する
    #[arg(short, long, value_name = "EXPR", conflicts_with = "file")]
    eval: Option<String>,

    /// ファイルの先頭行を評価する
    #[arg(short, long, value_name = "PATH")]
    file: Option<String>,

    /// 起動バナーを表示しない
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let outcome = if let Some(src) = args.eval.as_deref() {
        warp::repl::run_line(src, &mut stdout, &mut stderr)
    } else if let Some(path) = args.file.as_deref() {
        warp::repl::run_file(path, &mut stdout, &mut stderr)
    } else {
        warp::repl::run_repl(warp::repl::ReplOptions { quiet: args.quiet });
        Ok(true)
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("I/O error: {}", e);
            ExitCode::FAILURE
        }
    }
}
