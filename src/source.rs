//! 行の読み取り。引数ファイルと標準入力の両方で使う。
//!
//! 固定長バッファは使わず、`read_until(b'\n')` で改行まで読むので長い行も切り詰められない。
//! 不正な UTF-8 は置換文字に変換する。

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::tokenize;

/// `BufRead` から 1 行ずつ取り出すイテレータ。末尾の `\n` は取り除く。
pub struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// 引数ファイルを読み、各行を正規化して返す。
///
/// 開けない場合は [`Error::FileRead`]。空行もそのまま 1 要素として残す（捨てるかどうかは展開側で決める）。
pub fn read_args_file(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let lines = Lines::new(BufReader::new(file))
        .map(|line| line.map(|l| tokenize::normalize(&l)))
        .collect::<io::Result<Vec<String>>>()
        .map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), lines = lines.len(), "args file loaded");
    Ok(lines)
}
