//! コマンドライン引数の解析と検証。
//!
//! ```text
//! uqparallel [--pipe] [--exit-on-error] [--joblimit n] [--dry-run]
//!            [--argsfile argument-file] [cmd [fixed-args ...]] [::: per-task-args ...]
//! ```
//!
//! オプションはコマンド語より前にだけ書ける。最初の位置引数以降は全てそのまま受け取り、
//! `:::` の位置でコマンド + 固定引数と per-task の値に分ける。

use std::ffi::OsString;
use std::path::Path;

use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::Parser;

use crate::config::{Config, TaskSource};
use crate::error::{Error, Result};
use crate::source;

/// per-task の値の始まりを示す区切り。
pub const PER_TASK_SEPARATOR: &str = ":::";

#[derive(Parser, Debug)]
#[command(name = "uqparallel", version, about = "Run a command once per argument, in parallel")]
pub struct Cli {
    /// Connect each task's stdout to the next task's stdin
    #[arg(long)]
    pub pipe: bool,

    /// Accepted for compatibility; has no effect
    #[arg(long)]
    pub exit_on_error: bool,

    /// Maximum number of tasks running at once (1-120)
    #[arg(long, value_name = "n", default_value_t = 120,
          value_parser = clap::value_parser!(u8).range(1..=120))]
    pub joblimit: u8,

    /// Print the tasks instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Read one task per line from this file
    #[arg(long, value_name = "argument-file", value_parser = NonEmptyStringValueParser::new())]
    pub argsfile: Option<String>,

    /// Command, fixed arguments, and `:::` followed by per-task arguments
    #[arg(trailing_var_arg = true, value_name = "cmd")]
    pub words: Vec<String>,
}

/// 位置引数を分けた結果。
#[derive(Debug, Default, PartialEq, Eq)]
struct Words {
    command: Option<String>,
    fixed_args: Vec<String>,
    per_task: Option<Vec<String>>,
}

/// 位置引数を「コマンド」「固定引数」「`:::` 以降の値」に分ける。
///
/// 先頭が `:::` ならコマンドなし。`:::` がなければ per-task の値もなし。
fn split_words(mut words: Vec<String>) -> Words {
    let Some(sep) = words.iter().position(|w| w == PER_TASK_SEPARATOR) else {
        let mut it = words.into_iter();
        return Words {
            command: it.next(),
            fixed_args: it.collect(),
            per_task: None,
        };
    };

    let per_task = words.split_off(sep + 1);
    words.truncate(sep);
    let mut it = words.into_iter();
    Words {
        command: it.next(),
        fixed_args: it.collect(),
        per_task: Some(per_task),
    }
}

impl Cli {
    /// 検証して [`Config`] に変換する。引数ファイルはここで読み込む。
    pub fn into_config(self) -> Result<Config> {
        let words = split_words(self.words);

        if self.pipe && self.argsfile.is_none() && words.per_task.is_none() {
            return Err(Error::usage("--pipe requires --argsfile or :::"));
        }
        if self.argsfile.is_some() && words.per_task.is_some() {
            return Err(Error::usage("--argsfile cannot be combined with :::"));
        }
        if words.command.as_deref() == Some("") {
            return Err(Error::usage("empty command"));
        }

        let source = match (words.per_task, self.argsfile) {
            (Some(values), _) => TaskSource::PerTask(values),
            (None, Some(path)) => TaskSource::ArgsFile(source::read_args_file(Path::new(&path))?),
            (None, None) => TaskSource::Stdin,
        };

        Ok(Config {
            job_limit: usize::from(self.joblimit),
            dry_run: self.dry_run,
            pipe: self.pipe,
            exit_on_error: self.exit_on_error,
            command: words.command,
            fixed_args: words.fixed_args,
            source,
        })
    }
}

/// 引数列（先頭はプログラム名）を解析して [`Config`] を返す。
///
/// `--help` / `--version` は clap が出力してそのまま終了する。それ以外の clap のエラーは
/// [`Error::Usage`] になる。
pub fn parse<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return Err(Error::usage(e.to_string())),
    };
    cli.into_config()
}
