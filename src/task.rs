//! タスク展開: 設定と供給元の値から、タスクごとの引数ベクタを組み立てる。
//!
//! - per-task モード: コマンド + 固定引数 + 値 1 つ（トークン分割もリダイレクト抽出もしない）
//! - 引数ファイルモード: コマンド + 固定引数 + 行をトークン分割してリダイレクト抽出した結果
//! - 標準入力モード: [`StreamTemplate`] が 1 行ごとに新しい [`Task`] を組み立てる（空行も捨てない）
//!
//! 引数ベクタは可変長の `Vec` に集めてから `Box<[String]>` に固定する。

use std::path::{Path, PathBuf};

use crate::config::{Config, TaskSource};
use crate::error::{Error, Result};
use crate::redirect::{self, Capture};
use crate::tokenize;

// ── Task ─────────────────────────────────────────────────────────────

/// 1 つの子プロセスとして実行される作業単位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    argv: Box<[String]>,
    stdout: Option<PathBuf>,
    stderr: Option<PathBuf>,
}

impl Task {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv: argv.into_boxed_slice(),
            stdout: None,
            stderr: None,
        }
    }

    fn from_extracted(e: redirect::Extracted) -> Self {
        Self {
            argv: e.args.into_boxed_slice(),
            stdout: e.stdout,
            stderr: e.stderr,
        }
    }

    pub fn with_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// 実行するプログラム名。引数ベクタが空か先頭が空文字列なら `None`（空コマンド）。
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str).filter(|p| !p.is_empty())
    }

    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }

    pub fn stderr(&self) -> Option<&Path> {
        self.stderr.as_deref()
    }
}

// ── 展開 ─────────────────────────────────────────────────────────────

/// 引数ファイルの行を捨てるかどうか。
///
/// コマンドがなく、行にトークンが 1 つもない場合（空行）は捨てる。標準入力の行には適用しない。
pub fn is_discarded(config: &Config, line: &str) -> bool {
    !config.has_command() && tokenize::Tokens::new(line).next().is_none()
}

/// per-task / 引数ファイルモードのタスク列を一括で展開する。
///
/// タスクが 1 つもできなければ [`Error::EmptyTaskList`]。標準入力モードでは空のベクタを返す
/// （タスクは [`StreamTemplate`] で逐次作る）。
pub fn expand(config: &Config) -> Result<Vec<Task>> {
    let tasks = match &config.source {
        TaskSource::PerTask(values) => expand_per_task(config, values),
        TaskSource::ArgsFile(lines) => expand_args_file(config, lines),
        TaskSource::Stdin => return Ok(Vec::new()),
    };
    if tasks.is_empty() {
        return Err(Error::EmptyTaskList);
    }
    tracing::debug!(tasks = tasks.len(), "tasks expanded");
    Ok(tasks)
}

fn expand_per_task(config: &Config, values: &[String]) -> Vec<Task> {
    let prefix = config.prefix();
    values
        .iter()
        .map(|value| {
            let mut argv = Vec::with_capacity(prefix.len() + 1);
            argv.extend_from_slice(&prefix);
            argv.push(value.clone());
            Task::new(argv)
        })
        .collect()
}

fn expand_args_file(config: &Config, lines: &[String]) -> Vec<Task> {
    let prefix = config.prefix();
    let capture = Capture::for_pipe_mode(config.pipe);
    lines
        .iter()
        .filter(|line| !is_discarded(config, line))
        .map(|line| {
            Task::from_extracted(redirect::extract(&prefix, tokenize::Tokens::new(line), capture))
        })
        .collect()
}

// ── 標準入力モード ───────────────────────────────────────────────────

/// 標準入力モードのタスク雛形。コマンド + 固定引数を保持し、行ごとに新しいタスクを作る。
///
/// 前の行のタスクを書き換えるのではなく、毎回 prefix から組み立て直す。
pub struct StreamTemplate {
    prefix: Vec<String>,
    capture: Capture,
}

impl StreamTemplate {
    pub fn new(config: &Config) -> Self {
        Self {
            prefix: config.prefix(),
            capture: Capture::for_pipe_mode(config.pipe),
        }
    }

    /// 1 行（改行除去済み）からタスクを作る。
    ///
    /// コマンドなしの空行は空の引数ベクタになり、起動時に空コマンドとして報告される。
    pub fn task_for_line(&self, line: &str) -> Task {
        let tokenized = tokenize::tokenize_line(line);
        Task::from_extracted(redirect::extract(&self.prefix, tokenized.tokens, self.capture))
    }
}
