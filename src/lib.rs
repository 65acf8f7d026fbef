//! uqparallel ライブラリ: ベンチマーク・テスト用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs`（引数解析 → 実行 → 終了ステータス）。
//! この `lib.rs` は `benches/bench_main.rs` や `tests/` から
//! トークナイザ・タスク展開・起動機能に直接アクセスするために存在する。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`cli`] | コマンドライン解析（clap）と検証 → [`config::Config`] |
//! | [`config`] | 実行設定、タスク供給元、ジョブ上限の定数 |
//! | [`source`] | 行の読み取り（引数ファイル、標準入力。長さ制限なし） |
//! | [`tokenize`] | 空白の正規化、クォートを考慮したトークン分割 |
//! | [`redirect`] | `>file` / `2>file` の抽出 |
//! | [`task`] | タスクの引数ベクタ展開、標準入力用のタスク雛形 |
//! | [`spawn`] | `posix_spawnp` ラッパー |
//! | [`job`] | 同時実行数の制御、任意の子の reap、終了ステータスの変換 |
//! | [`executor`] | 一括実行 / ストリーム実行、モードの振り分け |
//! | [`pipeline`] | パイプモード（N-1 本のパイプで直列接続） |
//! | [`dry_run`] | ドライランの出力 |
//! | [`error`] | エラー型と終了ステータス |
//! | [`logging`] | `tracing` の初期化 |

pub mod cli;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod redirect;
pub mod source;
pub mod spawn;
pub mod task;
pub mod tokenize;
