//! Splitting a migration script into statements.

use crate::error::{SimError, SimResult};
use crate::scan;

/// One statement of a script, with comments replaced by whitespace and the terminating
/// `;` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    /// 1-based line where the statement starts.
    pub line: usize,
}

/// Split `sql` at top-level `;`.
///
/// `--` and `/* */` comments (nested block comments included) are dropped. Semicolons
/// inside quoted strings, quoted identifiers and dollar-quoted bodies (`$$...$$`,
/// `$tag$...$tag$`) do not split. Blank statements are skipped.
pub fn split_statements(sql: &str) -> SimResult<Vec<Statement>> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut start_line: Option<usize> = None;
    let mut line = 1usize;
    let mut pos = 0usize;

    while let Some(c) = sql[pos..].chars().next() {
        let rest = &sql[pos..];

        if rest.starts_with("--") {
            let len = rest.find('\n').unwrap_or(rest.len());
            buf.push(' ');
            pos += len;
            continue;
        }

        if rest.starts_with("/*") {
            let len = block_comment_len(rest).ok_or_else(|| {
                SimError::parse("unterminated block comment", pos)
            })?;
            line += count_lines(&rest[..len]);
            buf.push(' ');
            pos += len;
            continue;
        }

        let segment_len = if c == '$' {
            dollar_quoted_len(rest, pos)?
        } else if matches!(c, '\'' | '"' | '`') {
            Some(scan::scope(sql, pos)?.end - pos)
        } else {
            None
        };
        if let Some(len) = segment_len {
            start_line.get_or_insert(line);
            buf.push_str(&rest[..len]);
            line += count_lines(&rest[..len]);
            pos += len;
            continue;
        }

        match c {
            ';' => {
                flush(&mut out, &mut buf, &mut start_line);
            }
            '\n' => {
                line += 1;
                buf.push(c);
            }
            c if c.is_whitespace() => buf.push(c),
            c => {
                start_line.get_or_insert(line);
                buf.push(c);
            }
        }
        pos += c.len_utf8();
    }
    flush(&mut out, &mut buf, &mut start_line);

    Ok(out)
}

fn flush(out: &mut Vec<Statement>, buf: &mut String, start_line: &mut Option<usize>) {
    let sql = buf.trim();
    if let Some(line) = start_line.take() {
        if !sql.is_empty() {
            out.push(Statement {
                sql: sql.to_string(),
                line,
            });
        }
    }
    buf.clear();
}

fn count_lines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

/// `sql` without the whitespace and `--` / `/* */` comments in front of it.
pub(crate) fn skip_leading_comments(sql: &str) -> SimResult<&str> {
    let mut rest = sql.trim_start();
    loop {
        if rest.starts_with("--") {
            rest = rest.find('\n').map_or("", |at| &rest[at..]).trim_start();
        } else if rest.starts_with("/*") {
            let offset = sql.len() - rest.len();
            let len = block_comment_len(rest)
                .ok_or_else(|| SimError::parse("unterminated block comment", offset))?;
            rest = rest[len..].trim_start();
        } else {
            return Ok(rest);
        }
    }
}

/// Length of the (possibly nested) block comment at the start of `s`.
fn block_comment_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = 0usize;
    while pos < s.len() {
        let rest = &s[pos..];
        if rest.starts_with("/*") {
            depth += 1;
            pos += 2;
        } else if rest.starts_with("*/") {
            depth -= 1;
            pos += 2;
            if depth == 0 {
                return Some(pos);
            }
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

/// Length of the dollar-quoted body at the start of `s`, if `s` starts with a tag.
/// `offset` is only used for error positions.
fn dollar_quoted_len(s: &str, offset: usize) -> SimResult<Option<usize>> {
    let tag_body: String = s[1..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if tag_body.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }
    let tag_len = 1 + tag_body.len();
    if !s[tag_len..].starts_with('$') {
        return Ok(None);
    }

    let tag = &s[..tag_len + 1];
    match s[tag.len()..].find(tag) {
        Some(close) => Ok(Some(tag.len() + close + tag.len())),
        None => Err(SimError::parse(
            format!("unterminated dollar-quoted string {tag}"),
            offset,
        )),
    }
}
