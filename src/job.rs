//! 同時実行数の制御と子プロセスの reap。
//!
//! [`JobSlots`] は起動中の子の数を数え、上限に達したら任意の子の終了を待ってから次を起動させる。
//! 待機は「いずれかの子」に対してのみ行うので、集約ステータスは起動順ではなく完了順に決まる:
//! 最後に reap された子のステータスが結果になる。

use std::io;

use crate::error::SIGNAL_EXIT_STATUS;

/// `waitpid` の raw status を集約用の終了ステータスに変換する。
///
/// 正常終了なら終了コード、シグナル終了などそれ以外はセンチネル値 [`SIGNAL_EXIT_STATUS`]。
pub fn exit_code(raw_status: i32) -> i32 {
    if libc::WIFEXITED(raw_status) {
        libc::WEXITSTATUS(raw_status)
    } else {
        SIGNAL_EXIT_STATUS
    }
}

// ── Reap ─────────────────────────────────────────────────────────────

/// 子の終了を 1 つ待つ手段。テストでは偽物に差し替える。
pub trait Reap {
    /// いずれかの子が終了するまでブロックし、その PID と終了ステータスを返す。
    fn reap_any(&mut self) -> io::Result<(libc::pid_t, i32)>;
}

/// `waitpid(-1, ...)` で任意の子を待つ実装。
#[derive(Debug, Default)]
pub struct WaitAny;

impl Reap for WaitAny {
    fn reap_any(&mut self) -> io::Result<(libc::pid_t, i32)> {
        loop {
            let mut raw_status: i32 = 0;
            let pid = unsafe { libc::waitpid(-1, &mut raw_status, 0) };
            if pid > 0 {
                return Ok((pid, exit_code(raw_status)));
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

// ── JobSlots ─────────────────────────────────────────────────────────

/// 同時に存在できる子の数を `limit` に制限するアドミッション制御。
///
/// 使い方: タスクごとに [`admit`](Self::admit) → spawn → 成功なら [`launched`](Self::launched)、
/// 起動前に失敗したら [`record`](Self::record)。最後に [`drain`](Self::drain) で残りを全て待つ。
pub struct JobSlots<R: Reap = WaitAny> {
    limit: usize,
    active: usize,
    last_status: i32,
    reaper: R,
}

impl JobSlots<WaitAny> {
    pub fn new(limit: usize) -> Self {
        Self::with_reaper(limit, WaitAny)
    }
}

impl<R: Reap> JobSlots<R> {
    pub fn with_reaper(limit: usize, reaper: R) -> Self {
        Self {
            limit: limit.max(1),
            active: 0,
            last_status: 0,
            reaper,
        }
    }

    /// 空きスロットができるまで子の終了を待つ。
    pub fn admit(&mut self) -> io::Result<()> {
        while self.active >= self.limit {
            self.reap_one()?;
        }
        Ok(())
    }

    /// 子を 1 つ起動したことを記録する。
    pub fn launched(&mut self, pid: libc::pid_t) {
        self.active += 1;
        tracing::trace!(pid, active = self.active, "child launched");
    }

    /// 子を持たずに終わったタスク（起動失敗）のステータスを記録する。
    pub fn record(&mut self, status: i32) {
        self.last_status = status;
    }

    /// 起動中の子がなくなるまで待ち、最後に reap した子のステータスを返す。
    pub fn drain(&mut self) -> io::Result<i32> {
        while self.active > 0 {
            self.reap_one()?;
        }
        Ok(self.last_status)
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    fn reap_one(&mut self) -> io::Result<()> {
        let (pid, status) = self.reaper.reap_any()?;
        self.active -= 1;
        self.last_status = status;
        tracing::trace!(pid, status, active = self.active, "child reaped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// 終了順とステータスを台本どおりに返す偽の reaper。
    struct Scripted {
        exits: VecDeque<(libc::pid_t, i32)>,
    }

    impl Scripted {
        fn new(exits: &[(libc::pid_t, i32)]) -> Self {
            Self {
                exits: exits.iter().copied().collect(),
            }
        }
    }

    impl Reap for Scripted {
        fn reap_any(&mut self) -> io::Result<(libc::pid_t, i32)> {
            self.exits
                .pop_front()
                .ok_or_else(|| io::Error::from_raw_os_error(libc::ECHILD))
        }
    }

    #[test]
    fn never_exceeds_limit() {
        let reaper = Scripted::new(&[(1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]);
        let mut slots = JobSlots::with_reaper(2, reaper);
        let mut peak = 0;
        for pid in 1..=5 {
            slots.admit().unwrap();
            assert!(slots.active() < 2);
            slots.launched(pid);
            peak = peak.max(slots.active());
        }
        assert_eq!(peak, 2);
        slots.drain().unwrap();
        assert_eq!(slots.active(), 0);
    }

    #[test]
    fn limit_one_serializes() {
        let mut slots = JobSlots::with_reaper(1, Scripted::new(&[(1, 0), (2, 0), (3, 0)]));
        for pid in 1..=3 {
            slots.admit().unwrap();
            assert_eq!(slots.active(), 0);
            slots.launched(pid);
        }
        slots.drain().unwrap();
    }

    #[test]
    fn status_follows_completion_order() {
        // 3 つ起動し、pid 3 → 1 → 2 の順に終了する。最後に reap されたのは pid 2。
        let mut slots = JobSlots::with_reaper(3, Scripted::new(&[(3, 7), (1, 0), (2, 4)]));
        for pid in 1..=3 {
            slots.admit().unwrap();
            slots.launched(pid);
        }
        assert_eq!(slots.drain().unwrap(), 4);
    }

    #[test]
    fn recorded_failure_overwritten_by_later_reap() {
        let mut slots = JobSlots::with_reaper(4, Scripted::new(&[(1, 0)]));
        slots.admit().unwrap();
        slots.launched(1);
        slots.record(94);
        assert_eq!(slots.last_status(), 94);
        assert_eq!(slots.drain().unwrap(), 0);
    }

    #[test]
    fn recorded_failure_kept_when_nothing_running() {
        let mut slots = JobSlots::with_reaper(4, Scripted::new(&[]));
        slots.record(78);
        assert_eq!(slots.drain().unwrap(), 78);
    }

    #[test]
    fn reap_error_propagates() {
        let mut slots = JobSlots::with_reaper(1, Scripted::new(&[]));
        slots.launched(1);
        assert!(slots.admit().is_err());
    }

    #[test]
    fn zero_limit_treated_as_one() {
        let mut slots = JobSlots::with_reaper(0, Scripted::new(&[(1, 0)]));
        slots.admit().unwrap();
        slots.launched(1);
        slots.admit().unwrap();
        assert_eq!(slots.active(), 0);
    }

    #[test]
    fn exit_code_mapping() {
        // raw status: 終了コードは上位バイト、シグナル番号は下位 7 ビット
        assert_eq!(exit_code(0), 0);
        assert_eq!(exit_code(3 << 8), 3);
        assert_eq!(exit_code(libc::SIGKILL), SIGNAL_EXIT_STATUS);
    }
}
