//! エラー型と終了ステータス。
//!
//! 実行全体を止めるエラー（[`Error`]）と、1 タスクだけに影響するエラー（[`LaunchError`]）を分ける。
//! どちらも `exit_status()` で終了ステータスに対応づけられ、プロセスを終了させるのは `main` のみ。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::spawn::SpawnError;

/// 使い方エラー。
pub const USAGE_ERROR_STATUS: i32 = 10;
/// 引数ファイルを読めない。
pub const FILE_READ_ERROR_STATUS: i32 = 18;
/// 空コマンド / 空のタスク列。
pub const EMPTY_COMMAND_STATUS: i32 = 94;
/// 子がシグナルで終了した、または起動できなかった場合のセンチネル値。
pub const SIGNAL_EXIT_STATUS: i32 = 78;
/// コントローラ側の I/O 失敗（pipe, waitpid, 標準入力の読み取り）。
pub const INTERNAL_ERROR_STATUS: i32 = 1;

/// 使い方メッセージ。使い方エラー時に stderr へそのまま出力する。
pub const USAGE: &str = "Usage: ./uqparallel [--pipe] [--exit-on-error] [--joblimit n] \
[--dry-run] [--argsfile argument-file] [cmd [fixed-args ...]] [::: per-task-args ...]";

/// 実行全体に関わるエラー。いずれもタスクを 1 つも起動しないか、途中で打ち切る。
#[derive(Debug, Error)]
pub enum Error {
    /// コマンドライン引数が不正。`reason` はログ用で、表示されるのは使い方メッセージのみ。
    #[error("{}", USAGE)]
    Usage { reason: String },

    #[error("Cannot open file \"{}\" for reading", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// per-task / 引数ファイルモードでタスクが 1 つもない。
    #[error("no tasks to run")]
    EmptyTaskList,

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn usage(reason: impl Into<String>) -> Self {
        Self::Usage {
            reason: reason.into(),
        }
    }

    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Usage { .. } => USAGE_ERROR_STATUS,
            Self::FileRead { .. } => FILE_READ_ERROR_STATUS,
            Self::EmptyTaskList => EMPTY_COMMAND_STATUS,
            Self::Io { .. } => INTERNAL_ERROR_STATUS,
        }
    }
}

/// 1 タスクの起動失敗。兄弟タスクには影響せず、集約ステータスの候補になるだけ。
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("unable to execute empty command")]
    EmptyCommand,

    #[error("cannot write to \"{}\"", path.display())]
    RedirectOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

impl LaunchError {
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::EmptyCommand => EMPTY_COMMAND_STATUS,
            Self::RedirectOpen { .. } | Self::Spawn(_) => SIGNAL_EXIT_STATUS,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
