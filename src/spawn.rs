//! `posix_spawnp()` の安全な Rust ラッパー。
//!
//! プロセスイメージの置き換えを境界操作として扱う。成功時は子の PID を返し、
//! 失敗時は [`SpawnError`] を返す（シグナルで失敗を伝えることはしない）。
//!
//! ## 構成
//!
//! | 型 | 役割 |
//! |-----|------|
//! | [`SpawnAttr`] | `posix_spawnattr_t` の RAII ラッパー（シグナル設定） |
//! | [`FileActions`] | `posix_spawn_file_actions_t` の RAII ラッパー（fd 操作） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`ChildIo`] | 子の stdin/stdout/stderr に接続する fd |
//! | [`spawn`] | 上記を組み合わせて `posix_spawnp` を呼ぶ公開関数 |

use std::ffi::CString;
use std::os::unix::io::RawFd;

use thiserror::Error;

// ── エラー型 ──────────────────────────────────────────────────────

/// `posix_spawnp` の失敗を表すエラー。
#[derive(Debug, Error)]
#[error("cannot execute \"{command}\"")]
pub struct SpawnError {
    /// errno 値。
    pub errno: i32,
    /// コマンド名（エラーメッセージ用）。
    pub command: String,
}

impl SpawnError {
    /// errno の説明文。ログ用。
    pub fn reason(&self) -> &'static str {
        match self.errno {
            libc::ENOENT => "command not found",
            libc::EACCES => "permission denied",
            libc::EINVAL => "invalid argument",
            _ => "spawn failed",
        }
    }
}

// ── SpawnAttr ─────────────────────────────────────────────────────

/// `posix_spawnattr_t` の RAII ラッパー。Drop で自動 destroy。
struct SpawnAttr {
    inner: libc::posix_spawnattr_t,
}

impl SpawnAttr {
    /// `posix_spawnattr_init` で初期化する。
    fn new() -> Self {
        unsafe {
            let mut attr: libc::posix_spawnattr_t = std::mem::zeroed();
            libc::posix_spawnattr_init(&mut attr);
            Self { inner: attr }
        }
    }

    /// SIGPIPE をデフォルトに戻す。
    ///
    /// Rust ランタイムは親プロセスで SIGPIPE を無視に設定しており、無視設定は exec 後も継承される。
    /// `POSIX_SPAWN_SETSIGDEF` で子では `SIG_DFL` に戻し、パイプラインの上流が
    /// 下流の終了時に通常どおり終了できるようにする。
    fn set_sigdefault(&mut self) {
        unsafe {
            let mut flags: libc::c_short = 0;
            libc::posix_spawnattr_getflags(&self.inner, &mut flags);
            flags |= libc::POSIX_SPAWN_SETSIGDEF as libc::c_short;
            libc::posix_spawnattr_setflags(&mut self.inner, flags);

            let mut sigset: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut sigset);
            libc::sigaddset(&mut sigset, libc::SIGPIPE);
            libc::posix_spawnattr_setsigdefault(&mut self.inner, &sigset);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        &self.inner
    }
}

impl Drop for SpawnAttr {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawnattr_destroy(&mut self.inner);
        }
    }
}

// ── FileActions ───────────────────────────────────────────────────

/// `posix_spawn_file_actions_t` の RAII ラッパー。Drop で自動 destroy。
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    /// `posix_spawn_file_actions_init` で初期化する。
    fn new() -> Self {
        unsafe {
            let mut actions: libc::posix_spawn_file_actions_t = std::mem::zeroed();
            libc::posix_spawn_file_actions_init(&mut actions);
            Self { inner: actions }
        }
    }

    /// `dup2(fd, newfd)` アクションを追加する。パイプ接続・リダイレクト用。
    fn add_dup2(&mut self, fd: RawFd, newfd: RawFd) {
        unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, newfd);
        }
    }

    /// `close(fd)` アクションを追加する。不要な fd のクローズ用。
    fn add_close(&mut self, fd: RawFd) {
        unsafe {
            libc::posix_spawn_file_actions_addclose(&mut self.inner, fd);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    /// 引数リストから構築する。NUL バイトを含む引数があれば `None`。
    fn from_args(args: &[String]) -> Option<Self> {
        let strings = args
            .iter()
            .map(|s| CString::new(s.as_str()).ok())
            .collect::<Option<Vec<CString>>>()?;
        let mut ptrs: Vec<*mut libc::c_char> = strings
            .iter()
            .map(|s| s.as_ptr() as *mut libc::c_char)
            .collect();
        ptrs.push(std::ptr::null_mut()); // NULL 終端
        Some(Self { strings, ptrs })
    }

    /// 先頭要素（プログラム名）。
    fn program(&self) -> *const libc::c_char {
        self.strings[0].as_ptr()
    }

    /// NULL 終端ポインタ配列を返す。
    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── spawn 関数 ────────────────────────────────────────────────────

/// 子プロセスの標準入出力に接続する fd。`None` は親から継承。
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildIo {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
    pub stderr: Option<RawFd>,
}

/// `posix_spawnp` で子プロセスを起動する。成功時は子 PID を返す。
///
/// - `args`: コマンドと引数（`args[0]` がコマンド名、PATH 検索付き）。空であってはならない
/// - `io`: 子の stdin/stdout/stderr に `dup2` する fd
/// - `fds_to_close`: 子プロセスで閉じる fd のリスト（パイプの未使用端など）
pub fn spawn(
    args: &[String],
    io: &ChildIo,
    fds_to_close: &[RawFd],
) -> Result<libc::pid_t, SpawnError> {
    let command = args.first().cloned().unwrap_or_default();
    let argv = match CStringVec::from_args(args) {
        Some(argv) if !args.is_empty() => argv,
        _ => {
            return Err(SpawnError {
                errno: libc::EINVAL,
                command,
            })
        }
    };

    let mut attr = SpawnAttr::new();
    attr.set_sigdefault();

    // ファイルアクション: fd のリダイレクト + クローズ
    let mut actions = FileActions::new();
    let targets = [
        (io.stdin, libc::STDIN_FILENO),
        (io.stdout, libc::STDOUT_FILENO),
        (io.stderr, libc::STDERR_FILENO),
    ];
    for (fd, target) in targets {
        if let Some(fd) = fd {
            actions.add_dup2(fd, target);
        }
    }
    // dup2 の後で元の fd を閉じる。同じ fd を 2 回 close しないよう重複を除く
    let mut closed: Vec<RawFd> = Vec::with_capacity(fds_to_close.len() + 3);
    let redirected = targets.iter().filter_map(|&(fd, target)| fd.filter(|&fd| fd != target));
    for fd in redirected.chain(fds_to_close.iter().copied()) {
        if !closed.contains(&fd) {
            actions.add_close(fd);
            closed.push(fd);
        }
    }

    // environ を継承
    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;

    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            argv.program(),
            actions.as_ptr(),
            attr.as_ptr(),
            argv.as_ptr(),
            environ as *const *mut libc::c_char,
        )
    };

    if ret != 0 {
        return Err(SpawnError { errno: ret, command });
    }

    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cstring_vec_is_null_terminated() {
        let v = CStringVec::from_args(&args(&["echo", "hi"])).unwrap();
        assert_eq!(v.ptrs.len(), 3);
        assert!(v.ptrs[2].is_null());
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(CStringVec::from_args(&args(&["echo", "a\0b"])).is_none());
    }

    #[test]
    fn spawn_rejects_nul_without_forking() {
        let err = spawn(&args(&["ec\0ho"]), &ChildIo::default(), &[]).unwrap_err();
        assert_eq!(err.errno, libc::EINVAL);
        assert_eq!(err.reason(), "invalid argument");
    }

    #[test]
    fn spawn_rejects_empty_argv() {
        let err = spawn(&[], &ChildIo::default(), &[]).unwrap_err();
        assert_eq!(err.errno, libc::EINVAL);
        assert_eq!(err.command, "");
    }

    #[test]
    fn spawn_error_reason() {
        let err = SpawnError {
            errno: libc::ENOENT,
            command: "nope".into(),
        };
        assert_eq!(err.reason(), "command not found");
        assert_eq!(err.to_string(), "cannot execute \"nope\"");
    }
}
