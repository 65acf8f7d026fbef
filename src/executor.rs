//! タスク実行: リダイレクト先のオープン、子プロセスの起動、同時実行数の制御。
//!
//! - [`execute`]: 設定に応じてドライラン / パイプライン / 一括実行 / 標準入力ストリームに振り分ける
//! - [`run_tasks`]: 展開済みのタスク列を上限付きで並列実行
//! - [`run_stream`]: 1 行読むごとにタスクを作って起動し、入力終端で残りを全て待つ
//! - [`launch`]: 1 タスクの起動。失敗は [`LaunchError`] として返り、呼び出し側が報告して記録する
//!
//! 起動前の失敗（空コマンド、リダイレクト先を開けない、exec できない）は子を作らないので
//! スロットを消費せず、その時点の最新ステータスとして記録されるだけ。

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use crate::config::{Config, TaskSource};
use crate::dry_run;
use crate::error::{Error, LaunchError, Result};
use crate::job::JobSlots;
use crate::pipeline;
use crate::source::Lines;
use crate::spawn::{self, ChildIo};
use crate::task::{self, StreamTemplate, Task};

/// リダイレクト先のパーミッション（所有者のみ読み書き）。
const REDIRECT_MODE: u32 = 0o600;

/// 設定に従って全体を実行し、集約終了ステータスを返す。
pub fn execute(config: &Config) -> Result<i32> {
    tracing::debug!(
        job_limit = config.job_limit,
        pipe = config.pipe,
        dry_run = config.dry_run,
        exit_on_error = config.exit_on_error,
        command = config.command.as_deref().unwrap_or(""),
        "configuration"
    );

    if config.dry_run {
        let stdin = io::stdin();
        let stdout = io::stdout();
        return dry_run::render(config, stdin.lock(), &mut stdout.lock());
    }

    match config.source {
        TaskSource::Stdin => run_stream(config, io::stdin().lock()),
        TaskSource::PerTask(_) | TaskSource::ArgsFile(_) => {
            let tasks = task::expand(config)?;
            if config.pipe {
                pipeline::run_pipeline(&tasks, config.job_limit)
            } else {
                run_tasks(&tasks, config.job_limit)
            }
        }
    }
}

// ── 起動 ─────────────────────────────────────────────────────────────

/// リダイレクト先を作成/切り詰めで開く。
fn open_target(path: &Path) -> std::result::Result<File, LaunchError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(REDIRECT_MODE)
        .open(path)
        .map_err(|source| LaunchError::RedirectOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// 1 タスクを子プロセスとして起動し、PID を返す。
///
/// タスクのリダイレクト先は `io` より優先される。開いたファイルは spawn 直後に
/// このプロセス側で閉じる（子には dup2 済みのコピーだけが残る）。
///
/// 空コマンドはリダイレクト先を開く前に弾くので、ファイルは作られない。
pub fn launch(
    task: &Task,
    io: ChildIo,
    fds_to_close: &[RawFd],
) -> std::result::Result<libc::pid_t, LaunchError> {
    let program = task.program().ok_or(LaunchError::EmptyCommand)?;
    let stdout = task.stdout().map(open_target).transpose()?;
    let stderr = task.stderr().map(open_target).transpose()?;

    let io = ChildIo {
        stdout: stdout.as_ref().map(AsRawFd::as_raw_fd).or(io.stdout),
        stderr: stderr.as_ref().map(AsRawFd::as_raw_fd).or(io.stderr),
        ..io
    };
    let pid = spawn::spawn(task.argv(), &io, fds_to_close)?;
    tracing::trace!(pid, program, "spawned");
    Ok(pid)
}

/// 起動失敗を stderr に報告する。
fn report(err: &LaunchError) {
    if let LaunchError::Spawn(e) = err {
        tracing::debug!(errno = e.errno, reason = e.reason(), command = %e.command, "spawn failed");
    }
    eprintln!("uqparallel: {err}");
}

pub(crate) fn wait_error(e: io::Error) -> Error {
    Error::io("waitpid", e)
}

/// スロットが空くのを待ってから 1 タスクを起動する。失敗は報告してステータスを記録する。
pub(crate) fn start(
    slots: &mut JobSlots,
    task: &Task,
    io: ChildIo,
    fds_to_close: &[RawFd],
) -> Result<()> {
    slots.admit().map_err(wait_error)?;
    match launch(task, io, fds_to_close) {
        Ok(pid) => slots.launched(pid),
        Err(e) => {
            report(&e);
            slots.record(e.exit_status());
        }
    }
    Ok(())
}

// ── 実行ループ ───────────────────────────────────────────────────────

/// 展開済みのタスク列を、同時に `limit` 個までの子で実行する。
pub fn run_tasks(tasks: &[Task], limit: usize) -> Result<i32> {
    let mut slots = JobSlots::new(limit);
    for task in tasks {
        start(&mut slots, task, ChildIo::default(), &[])?;
    }
    let status = slots.drain().map_err(wait_error)?;
    tracing::debug!(tasks = tasks.len(), status, "all tasks finished");
    Ok(status)
}

/// 入力を 1 行ずつ読み、行ごとにタスクを起動する。空行も 1 タスクとして扱う。
///
/// アドミッション制御はストリーム全体で共有する。読み取りに失敗した場合も、
/// 起動済みの子を全て待ってからエラーを返す。
pub fn run_stream<R: BufRead>(config: &Config, reader: R) -> Result<i32> {
    let template = StreamTemplate::new(config);
    let mut slots = JobSlots::new(config.job_limit);
    let mut read_error = None;
    let mut launched = 0usize;

    for line in Lines::new(reader) {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                read_error = Some(e);
                break;
            }
        };
        let task = template.task_for_line(&line);
        start(&mut slots, &task, ChildIo::default(), &[])?;
        launched += 1;
    }

    let status = slots.drain().map_err(wait_error)?;
    if let Some(e) = read_error {
        return Err(Error::io("read stdin", e));
    }
    tracing::debug!(tasks = launched, status, "input exhausted");
    Ok(status)
}
