//! トークナイザ: 1 行のテキストを引数トークン列に分割する。
//!
//! 引数ファイルと標準入力の各行は、まず [`normalize`] で空白を正規化してから
//! [`Tokens`] イテレータで分割される。
//!
//! ## 規則
//!
//! - クォート外の空白（スペース/タブ）は区切り。連続した空白は 1 つにまとめる
//! - ダブルクォート (`"..."`) 内は空白も含めてリテラル。クォート文字自体もトークンに残す
//! - 閉じクォート直後のスペースは 1 つだけ保持する（次のトークンと連結しないため）
//! - 閉じられていないクォートは行末までクォート内として扱う（エラーにはしない）

/// クォート外で区切りとして扱う文字。
fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

// ── 正規化 ──────────────────────────────────────────────────────────

/// 行の空白を正規化したコピーを返す。
///
/// クォート外の空白の連続は単一スペースに置き換え、行頭の空白は捨てる。
/// 末尾に残ったスペースは 1 つだけ削る。dry-run 表示と引数ファイルの保存に使う。
pub fn normalize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    let mut space_allowed = false;

    for ch in line.chars() {
        if in_quotes && ch != '"' {
            out.push(ch);
            continue;
        }
        if ch == '"' {
            out.push(ch);
            in_quotes = !in_quotes;
            if !in_quotes {
                space_allowed = true;
            }
            continue;
        }
        if ch == ' ' || ch == '\t' {
            if space_allowed {
                out.push(' ');
                space_allowed = false;
            }
            continue;
        }
        out.push(ch);
        space_allowed = true;
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

// ── トークン分割 ────────────────────────────────────────────────────

/// 入力行を空白で分割するイテレータ。各トークンは入力のスライス（ゼロコピー）。
///
/// `"b c"` のようなクォート区間は 1 トークンになり、クォート文字を含んだまま返る。
pub struct Tokens<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_blanks(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_blank(bytes[self.pos]) {
            self.pos += 1;
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_blanks();
        let bytes = self.input.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        let mut in_quotes = false;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'"' => in_quotes = !in_quotes,
                b if is_blank(b) && !in_quotes => break,
                _ => {}
            }
            self.pos += 1;
        }
        // 区切りはすべて ASCII なので、スライス境界は常に char 境界になる
        Some(&self.input[start..self.pos])
    }
}

/// 行をトークンに分割し、所有権付きのベクタで返す。
pub fn split(line: &str) -> Vec<String> {
    Tokens::new(line).map(str::to_owned).collect()
}

/// 正規化済みの行とそのトークン列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub normalized: String,
    pub tokens: Vec<String>,
}

/// 行を正規化し、正規化後のテキストをトークンに分割する。
pub fn tokenize_line(line: &str) -> Tokenized {
    let normalized = normalize(line);
    let tokens = split(&normalized);
    Tokenized { normalized, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── 正規化 ──

    #[test]
    fn normalize_collapses_spaces() {
        assert_eq!(normalize("  echo   hello   world  "), "echo hello world");
    }

    #[test]
    fn normalize_tabs_are_separators() {
        assert_eq!(normalize("echo\t\thello\tworld"), "echo hello world");
    }

    #[test]
    fn normalize_keeps_quoted_whitespace() {
        assert_eq!(normalize("a   \"b    c\"   d"), "a \"b    c\" d");
    }

    #[test]
    fn normalize_trims_single_trailing_space() {
        assert_eq!(normalize("foo "), "foo");
        assert_eq!(normalize("\"x\" "), "\"x\"");
    }

    #[test]
    fn normalize_blank_line() {
        assert_eq!(normalize(" \t  "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_adjacent_quotes_not_split() {
        assert_eq!(normalize("\"x\"\"y\""), "\"x\"\"y\"");
    }

    // ── 分割 ──

    #[test]
    fn split_quoted_span() {
        assert_eq!(split("a \"b c\" d"), vec!["a", "\"b c\"", "d"]);
    }

    #[test]
    fn split_simple() {
        assert_eq!(split("echo hello"), vec!["echo", "hello"]);
    }

    #[test]
    fn split_empty() {
        assert!(split("").is_empty());
        assert!(split("   ").is_empty());
    }

    #[test]
    fn split_quote_glued_to_word() {
        assert_eq!(split("x=\"1 2\"y z"), vec!["x=\"1 2\"y", "z"]);
    }

    #[test]
    fn split_unterminated_quote_runs_to_end() {
        assert_eq!(split("a \"b c d"), vec!["a", "\"b c d"]);
    }

    #[test]
    fn split_redirect_tokens_are_plain_words() {
        assert_eq!(split("foo >out.txt 2>err.txt"), vec!["foo", ">out.txt", "2>err.txt"]);
    }

    #[test]
    fn tokens_borrow_from_input() {
        let line = String::from("one two");
        let toks: Vec<&str> = Tokens::new(&line).collect();
        assert_eq!(toks, vec!["one", "two"]);
        assert!(std::ptr::eq(toks[0].as_ptr(), line.as_ptr()));
    }

    #[test]
    fn tokenize_line_reports_normalized() {
        let t = tokenize_line("  cat   \"a  b\"  ");
        assert_eq!(t.normalized, "cat \"a  b\"");
        assert_eq!(t.tokens, vec!["cat", "\"a  b\""]);
    }

    #[test]
    fn rejoined_tokens_reproduce_normalized_line() {
        let lines = [
            "a \"b c\" d",
            "   grep   -n  \"two  words\"   file.txt ",
            "x\t\"\ty\"\tz",
            "\"only quoted\"",
            "plain",
            "\"x\"\"y\" tail",
            "",
        ];
        for line in lines {
            let t = tokenize_line(line);
            assert_eq!(t.tokens.join(" "), t.normalized, "line: {line:?}");
        }
    }
}
