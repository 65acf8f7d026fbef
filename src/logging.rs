//! ログ出力の初期化。
//!
//! 診断ログは `tracing` で stderr に出す。既定のフィルタは `warn` で、`RUST_LOG` で上書きできる
//! （例: `RUST_LOG=uqparallel=trace` で全ての起動と reap を表示）。
//! ユーザー向けのエラーメッセージはフィルタに関係なく `eprintln!` で出す。

use tracing_subscriber::EnvFilter;

/// 既定のログフィルタ。
pub const DEFAULT_FILTER: &str = "warn";

/// `RUST_LOG` を解釈する。未設定または不正なら [`DEFAULT_FILTER`]。
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// グローバルな subscriber を設定する。2 回目以降の呼び出しは何もしない。
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
