//! リダイレクト抽出: トークン列から `>file` / `2>file` を取り除き、出力先として記録する。
//!
//! マーカーは常に引数ベクタから除去される。出力先パスを記録するかどうかは
//! [`Capture`] で決まり、パイプモードでは記録しない（パイプ配線を上書きさせない）。

use std::path::PathBuf;

/// stdout リダイレクトの接頭辞。
const STDOUT_MARKER: &str = ">";
/// stderr リダイレクトの接頭辞。
const STDERR_MARKER: &str = "2>";

/// 抽出したリダイレクト先を保持するかどうか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// パスを記録する（非パイプモード）。
    Record,
    /// マーカーは除去するがパスは捨てる（パイプモード）。
    Discard,
}

impl Capture {
    pub fn for_pipe_mode(pipe: bool) -> Self {
        if pipe {
            Self::Discard
        } else {
            Self::Record
        }
    }
}

/// トークン 1 つの分類結果。
#[derive(Debug, PartialEq, Eq)]
enum Marker<'a> {
    Stdout(&'a str),
    Stderr(&'a str),
    Arg,
}

fn classify(token: &str) -> Marker<'_> {
    if let Some(path) = token.strip_prefix(STDOUT_MARKER) {
        Marker::Stdout(path)
    } else if let Some(path) = token.strip_prefix(STDERR_MARKER) {
        Marker::Stderr(path)
    } else {
        Marker::Arg
    }
}

/// 抽出結果。`args` はマーカーを除いた引数、`stdout` / `stderr` は記録された出力先。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub args: Vec<String>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

/// `prefix`（コマンド + 固定引数）の後ろに `tokens` を積み、リダイレクトを抽出する。
///
/// 同じ種類のマーカーが複数あれば最後の指定が有効。
pub fn extract<I, S>(prefix: &[String], tokens: I, capture: Capture) -> Extracted
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Extracted {
        args: prefix.to_vec(),
        ..Default::default()
    };

    for token in tokens {
        let token = token.as_ref();
        match classify(token) {
            Marker::Stdout(path) => {
                if capture == Capture::Record {
                    out.stdout = Some(PathBuf::from(path));
                }
            }
            Marker::Stderr(path) => {
                if capture == Capture::Record {
                    out.stderr = Some(PathBuf::from(path));
                }
            }
            Marker::Arg => out.args.push(token.to_owned()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_tokens_appended_after_prefix() {
        let e = extract(&strings(&["grep", "-n"]), ["foo", "bar.txt"], Capture::Record);
        assert_eq!(e.args, strings(&["grep", "-n", "foo", "bar.txt"]));
        assert_eq!(e.stdout, None);
        assert_eq!(e.stderr, None);
    }

    #[test]
    fn stdout_marker_recorded() {
        let e = extract(&[], ["foo", ">out.txt"], Capture::Record);
        assert_eq!(e.args, strings(&["foo"]));
        assert_eq!(e.stdout, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn stderr_marker_recorded() {
        let e = extract(&[], ["bar", "2>err.txt"], Capture::Record);
        assert_eq!(e.args, strings(&["bar"]));
        assert_eq!(e.stderr, Some(PathBuf::from("err.txt")));
    }

    #[test]
    fn markers_stripped_but_discarded_in_pipe_mode() {
        let e = extract(&[], ["foo", ">out.txt", "2>err.txt"], Capture::Discard);
        assert_eq!(e.args, strings(&["foo"]));
        assert_eq!(e.stdout, None);
        assert_eq!(e.stderr, None);
    }

    #[test]
    fn last_marker_wins() {
        let e = extract(&[], [">a", "x", ">b"], Capture::Record);
        assert_eq!(e.args, strings(&["x"]));
        assert_eq!(e.stdout, Some(PathBuf::from("b")));
    }

    #[test]
    fn marker_in_middle_of_word_is_argument() {
        let e = extract(&[], ["a>b", "file2>x"], Capture::Record);
        assert_eq!(e.args, strings(&["a>b", "file2>x"]));
        assert_eq!(e.stdout, None);
        assert_eq!(e.stderr, None);
    }

    #[test]
    fn bare_marker_yields_empty_path() {
        let e = extract(&[], [">"], Capture::Record);
        assert!(e.args.is_empty());
        assert_eq!(e.stdout, Some(PathBuf::new()));
    }

    #[test]
    fn capture_from_pipe_flag() {
        assert_eq!(Capture::for_pipe_mode(true), Capture::Discard);
        assert_eq!(Capture::for_pipe_mode(false), Capture::Record);
    }
}
