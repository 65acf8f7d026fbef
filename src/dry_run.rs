//! ドライラン: プロセスを作らず、実行されるはずのタスクを 1 行ずつ出力する。
//!
//! 出力形式は `<1 始まりの番号>: <引数>`。
//!
//! | モード | 引数部分 |
//! |--------|----------|
//! | per-task | コマンド + 固定引数 + 値。空白を含む要素は `"` で囲む |
//! | 引数ファイル | コマンド + 固定引数 + 正規化済みの行（そのまま） |
//! | 標準入力 | 引数ファイルと同じ。読みながら 1 行ずつ出力する |
//!
//! コマンドがない場合、引数ファイルのトークンのない行は番号を振らずに飛ばす。
//! 標準入力の空行は飛ばさない（実行時と同じく空コマンドのタスクとして数える）。

use std::io::{BufRead, Write};

use crate::config::{Config, TaskSource};
use crate::error::{Error, Result};
use crate::source::Lines;
use crate::task;
use crate::tokenize;

/// 空白を含む引数を `"` で囲む。
fn quote_if_spaced(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{arg}\"")
    } else {
        arg.to_owned()
    }
}

/// per-task モードの 1 行分。
fn per_task_line(prefix: &[String], value: &str) -> String {
    prefix
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(value))
        .map(quote_if_spaced)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 引数ファイル / 標準入力モードの 1 行分。行は正規化済みのテキストをそのまま使う。
fn line_mode_line(prefix: &[String], normalized: &str) -> String {
    let mut parts: Vec<&str> = prefix.iter().map(String::as_str).collect();
    parts.push(normalized);
    parts.join(" ")
}

/// ドライランを実行する。標準入力モードでは `input` から行を読む。
///
/// per-task の値が 0 個、または引数ファイルが 0 行の場合は [`Error::EmptyTaskList`]。
/// 成功時の終了ステータスは常に 0。
pub fn render<R: BufRead, W: Write>(config: &Config, input: R, out: &mut W) -> Result<i32> {
    let prefix = config.prefix();
    let write_err = |e| Error::io("write stdout", e);
    let mut count = 0usize;

    match &config.source {
        TaskSource::PerTask(values) => {
            if values.is_empty() {
                return Err(Error::EmptyTaskList);
            }
            for value in values {
                count += 1;
                writeln!(out, "{count}: {}", per_task_line(&prefix, value)).map_err(write_err)?;
            }
        }
        TaskSource::ArgsFile(lines) => {
            if lines.is_empty() {
                return Err(Error::EmptyTaskList);
            }
            for line in lines.iter().filter(|l| !task::is_discarded(config, l)) {
                count += 1;
                writeln!(out, "{count}: {}", line_mode_line(&prefix, line)).map_err(write_err)?;
            }
        }
        TaskSource::Stdin => {
            for line in Lines::new(input) {
                let line = line.map_err(|e| Error::io("read stdin", e))?;
                let normalized = tokenize::normalize(&line);
                count += 1;
                writeln!(out, "{count}: {}", line_mode_line(&prefix, &normalized))
                    .map_err(write_err)?;
                out.flush().map_err(write_err)?;
            }
        }
    }
    out.flush().map_err(write_err)?;
    tracing::debug!(rendered = count, "dry run finished");
    Ok(0)
}
