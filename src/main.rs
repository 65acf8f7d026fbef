//! uqparallel: コマンドを引数ごとに並列実行する
//!
//! 処理の流れ: ログ初期化 → 引数解析（引数ファイルの読み込みを含む）→ 実行 → 集約ステータスで終了
//!
//! 実行全体を止めるエラーはここでだけ報告し、対応する終了ステータスで終了する。

use uqparallel::error::Error;
use uqparallel::{cli, executor, logging};

/// 全体エラーを stderr に報告する。
fn report(err: &Error) {
    match err {
        Error::Usage { reason } => {
            tracing::debug!(reason = %reason, "usage error");
            eprintln!("{err}");
        }
        // タスクがないことは終了ステータスだけで伝える
        Error::EmptyTaskList => tracing::debug!("no tasks to run"),
        Error::FileRead { .. } | Error::Io { .. } => eprintln!("uqparallel: {err}"),
    }
}

fn main() {
    logging::init();

    let result = cli::parse(std::env::args_os()).and_then(|config| executor::execute(&config));
    let status = match result {
        Ok(status) => status,
        Err(e) => {
            report(&e);
            e.exit_status()
        }
    };

    std::process::exit(status);
}
