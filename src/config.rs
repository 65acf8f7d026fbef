//! 実行設定。コマンドラインから一度だけ構築され、以後は読み取り専用。

/// ジョブ上限の最小値。
pub const JOB_LIMIT_MIN: usize = 1;
/// ジョブ上限の最大値。
pub const JOB_LIMIT_MAX: usize = 120;
/// `--joblimit` 省略時のジョブ上限。
pub const JOB_LIMIT_DEFAULT: usize = 120;

/// タスクの供給元。常にいずれか 1 つだけが有効。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// `:::` 以降の値。1 値 = 1 タスク、値はそのまま使う。
    PerTask(Vec<String>),
    /// 引数ファイルの各行（正規化済み）。1 行 = 1 タスク。
    ArgsFile(Vec<String>),
    /// 標準入力から 1 行ずつ読みながら実行する。
    Stdin,
}

/// 実行設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 同時に実行できる子プロセスの上限（1..=120）。
    pub job_limit: usize,
    pub dry_run: bool,
    /// 隣り合うタスクをパイプで接続する。
    pub pipe: bool,
    /// 受け付けるだけで挙動には影響しない。
    pub exit_on_error: bool,
    /// 固定コマンド。`:::` から始まる呼び出しでは `None`。
    pub command: Option<String>,
    pub fixed_args: Vec<String>,
    pub source: TaskSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_limit: JOB_LIMIT_DEFAULT,
            dry_run: false,
            pipe: false,
            exit_on_error: false,
            command: None,
            fixed_args: Vec::new(),
            source: TaskSource::Stdin,
        }
    }
}

impl Config {
    /// コマンド + 固定引数。全タスクの引数ベクタの先頭に置かれる。
    pub fn prefix(&self) -> Vec<String> {
        self.command
            .iter()
            .chain(self.fixed_args.iter())
            .cloned()
            .collect()
    }

    pub fn has_command(&self) -> bool {
        self.command.is_some()
    }
}
