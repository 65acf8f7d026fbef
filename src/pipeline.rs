//! パイプモード: 隣り合うタスクをパイプで直列につなぐ。
//!
//! N 個のタスクに対して N-1 本のパイプを作る。パイプ k はタスク k の stdout を
//! タスク k+1 の stdin につなぐ。各子は自分が使う（高々 2 つの）端を dup2 した後、
//! 全てのパイプ fd を閉じる。親は全タスクの起動後に全ての fd を閉じる。
//!
//! 同時実行数の上限はここでも効く。ただし上限がタスク数より小さいと、
//! 後段が起動される前に前段がパイプ満杯で止まり、終わらないことがある。

use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::{Error, Result};
use crate::executor;
use crate::job::JobSlots;
use crate::spawn::ChildIo;
use crate::task::Task;

/// パイプの読み端と書き端。
struct Pipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl Pipe {
    fn new() -> io::Result<Self> {
        let mut fds = [0i32; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // pipe() が返した fd の所有権はここで OwnedFd に移る
        unsafe {
            Ok(Self {
                read: OwnedFd::from_raw_fd(fds[0]),
                write: OwnedFd::from_raw_fd(fds[1]),
            })
        }
    }
}

/// パイプラインの全パイプ。Drop で全 fd が閉じる。
pub struct PipeTable {
    pipes: Vec<Pipe>,
}

impl PipeTable {
    /// `task_count` 個のタスクをつなぐ `task_count - 1` 本のパイプを作る。
    ///
    /// 途中で失敗した場合、作成済みのパイプは閉じてからエラーを返す。
    pub fn open(task_count: usize) -> io::Result<Self> {
        let count = task_count.saturating_sub(1);
        let pipes = (0..count).map(|_| Pipe::new()).collect::<io::Result<Vec<_>>>()?;
        Ok(Self { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// タスク `index` の stdin/stdout。先頭は stdin を、末尾は stdout を継承する。
    pub fn wiring(&self, index: usize) -> ChildIo {
        ChildIo {
            stdin: index
                .checked_sub(1)
                .and_then(|k| self.pipes.get(k))
                .map(|p| p.read.as_raw_fd()),
            stdout: self.pipes.get(index).map(|p| p.write.as_raw_fd()),
            stderr: None,
        }
    }

    /// 全パイプの全 fd。子ではこれらを全て閉じる（dup2 済みのコピーは残る）。
    pub fn raw_fds(&self) -> Vec<RawFd> {
        self.pipes
            .iter()
            .flat_map(|p| [p.read.as_raw_fd(), p.write.as_raw_fd()])
            .collect()
    }

    /// このプロセス側の全 fd を閉じ、閉じた数を返す。
    pub fn close_all(self) -> usize {
        let closed = self.pipes.len() * 2;
        drop(self);
        closed
    }
}

/// タスク列をパイプでつないで実行し、集約ステータスを返す。
///
/// リダイレクト先はタスク展開の段階で記録されていないので、ここでは適用しない。
pub fn run_pipeline(tasks: &[Task], limit: usize) -> Result<i32> {
    let pipes = PipeTable::open(tasks.len()).map_err(|e| Error::io("pipe", e))?;
    let mut slots = JobSlots::new(limit);

    launch_all(&pipes, tasks, &mut slots)?;

    let closed = pipes.close_all();
    tracing::trace!(closed, "pipe fds closed");

    let status = slots.drain().map_err(executor::wait_error)?;
    tracing::debug!(tasks = tasks.len(), status, "pipeline finished");
    Ok(status)
}

/// 全タスクを順に起動する。タスク `i` は `pipes.wiring(i)` でつながり、子では全パイプ fd を閉じる。
fn launch_all(pipes: &PipeTable, tasks: &[Task], slots: &mut JobSlots) -> Result<()> {
    let fds = pipes.raw_fds();
    for (i, task) in tasks.iter().enumerate() {
        executor::start(slots, task, pipes.wiring(i), &fds)?;
    }
    Ok(())
}
