//! Scope scanning.
//!
//! [`scope`] locates the text between an opening delimiter and its matching closing
//! delimiter. It is a five-state machine driven by one forward cursor:
//!
//! - `Normal`: counts nested parentheses and enters a quoted state on `'`, `"` or `` ` ``
//! - `InSingleQuote` / `InDoubleQuote` / `InBacktick`: only the matching quote leaves the
//!   state (a doubled quote stays inside)
//! - `Escaped`: entered on `\` from any other state; the next character is taken verbatim
//!   and the previous state resumes
//!
//! Escapes are never unescaped: the returned slice is the exact source text.

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    InBacktick,
    /// Holds the state to resume once the escaped character is consumed.
    Escaped(Resume),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
}

impl State {
    fn escape(self) -> State {
        let resume = match self {
            State::Normal | State::Escaped(_) => Resume::Normal,
            State::InSingleQuote => Resume::SingleQuote,
            State::InDoubleQuote => Resume::DoubleQuote,
            State::InBacktick => Resume::Backtick,
        };
        State::Escaped(resume)
    }

    fn quote_char(self) -> Option<char> {
        match self {
            State::InSingleQuote => Some('\''),
            State::InDoubleQuote => Some('"'),
            State::InBacktick => Some('`'),
            _ => None,
        }
    }
}

impl From<Resume> for State {
    fn from(r: Resume) -> Self {
        match r {
            Resume::Normal => State::Normal,
            Resume::SingleQuote => State::InSingleQuote,
            Resume::DoubleQuote => State::InDoubleQuote,
            Resume::Backtick => State::InBacktick,
        }
    }
}

/// A delimited region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'a> {
    /// Text between the delimiters, verbatim.
    pub inner: &'a str,
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset just past the closing delimiter.
    pub end: usize,
}

/// Returns true if `c` opens a scope that [`scope`] can scan.
pub fn is_opener(c: char) -> bool {
    matches!(c, '(' | '\'' | '"' | '`')
}

/// Scan the scope opened by the delimiter at byte offset `open` in `text`.
///
/// The opener may be `(`, `'`, `"` or `` ` ``. Parenthesis scopes close on the `)` that
/// brings nesting depth back to zero; quote scopes close on the first unescaped,
/// undoubled matching quote.
pub fn scope(text: &str, open: usize) -> SimResult<Scope<'_>> {
    let Some(opener) = text.get(open..).and_then(|s| s.chars().next()) else {
        return Err(SimError::parse("expected an opening delimiter", open));
    };

    let mut state = match opener {
        '(' => State::Normal,
        '\'' => State::InSingleQuote,
        '"' => State::InDoubleQuote,
        '`' => State::InBacktick,
        other => {
            return Err(SimError::parse(
                format!("'{other}' is not an opening delimiter"),
                open,
            ));
        }
    };
    let quoted_scope = opener != '(';

    let body = open + opener.len_utf8();
    let mut depth = 0usize;
    let mut chars = text[body..].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let pos = body + i;
        state = match state {
            State::Escaped(resume) => resume.into(),
            _ if c == '\\' => state.escape(),
            State::Normal => match c {
                '(' => {
                    depth += 1;
                    State::Normal
                }
                ')' if depth == 0 => {
                    return Ok(Scope {
                        inner: &text[body..pos],
                        start: open,
                        end: pos + 1,
                    });
                }
                ')' => {
                    depth -= 1;
                    State::Normal
                }
                '\'' => State::InSingleQuote,
                '"' => State::InDoubleQuote,
                '`' => State::InBacktick,
                _ => State::Normal,
            },
            quoted => {
                if Some(c) != quoted.quote_char() {
                    quoted
                } else if chars.peek().map(|&(_, n)| n) == Some(c) {
                    chars.next();
                    quoted
                } else if quoted_scope {
                    return Ok(Scope {
                        inner: &text[body..pos],
                        start: open,
                        end: pos + c.len_utf8(),
                    });
                } else {
                    State::Normal
                }
            }
        };
    }

    let message = match state {
        State::Normal => "unbalanced parenthesis",
        State::InSingleQuote => "unterminated quoted string",
        State::InDoubleQuote => "unterminated quoted identifier",
        State::InBacktick => "unterminated backtick-quoted segment",
        State::Escaped(_) => "dangling escape at end of input",
    };
    Err(SimError::parse(message, open))
}

/// Split `text` at every top-level `sep`, skipping separators inside parentheses,
/// quotes and escapes. Items are trimmed; an empty item is a parse error.
pub fn split_top_level(text: &str, sep: char) -> SimResult<Vec<&str>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let mut item_start = 0usize;
    let mut pos = 0usize;

    while let Some(c) = text[pos..].chars().next() {
        if is_opener(c) {
            pos = scope(text, pos)?.end;
            continue;
        }
        match c {
            '\\' => {
                pos += 1;
                match text[pos..].chars().next() {
                    Some(next) => pos += next.len_utf8(),
                    None => return Err(SimError::parse("dangling escape at end of input", pos)),
                }
            }
            ')' => return Err(SimError::parse("unbalanced parenthesis", pos)),
            c if c == sep => {
                items.push(non_empty_item(text, item_start, pos)?);
                pos += c.len_utf8();
                item_start = pos;
            }
            c => pos += c.len_utf8(),
        }
    }
    items.push(non_empty_item(text, item_start, text.len())?);

    Ok(items)
}

fn non_empty_item(text: &str, start: usize, end: usize) -> SimResult<&str> {
    let item = text[start..end].trim();
    if item.is_empty() {
        return Err(SimError::parse("empty list item", start));
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(text: &str) -> &str {
        scope(text, 0).expect("scope").inner
    }

    #[test]
    fn paren_scope_returns_inner_text() {
        assert_eq!(inner("(a, b)"), "a, b");
        assert_eq!(inner("()"), "");
    }

    #[test]
    fn paren_scope_skips_nested_parens() {
        assert_eq!(inner("(length(name) > 0) NOT NULL"), "length(name) > 0");
        let s = scope("x (coalesce(a, (b)), c) tail", 2).unwrap();
        assert_eq!(s.inner, "coalesce(a, (b)), c");
        assert_eq!(&"x (coalesce(a, (b)), c) tail"[s.end..], " tail");
    }

    #[test]
    fn paren_scope_skips_delimiters_inside_quotes() {
        assert_eq!(inner("(')', \"a)b\", `c)`)"), "')', \"a)b\", `c)`");
        assert_eq!(inner("('it''s)')"), "'it''s)'");
    }

    #[test]
    fn escaped_paren_passes_through() {
        assert_eq!(inner(r"(a\)b)"), r"a\)b");
        assert_eq!(inner(r"('a\'b')"), r"'a\'b'");
    }

    #[test]
    fn wrapping_balanced_text_is_idempotent() {
        for body in [
            "a, (b, c)",
            "')' || `x)`",
            r"a \) b",
            "\"q(\" , 'x''y'",
            "",
        ] {
            let wrapped = format!("({body})");
            assert_eq!(inner(&wrapped), body);
        }
    }

    #[test]
    fn quote_scope_keeps_escape_verbatim() {
        assert_eq!(inner(r"'b\''"), r"b\'");
        assert_eq!(inner("'plain', 'next'"), "plain");
        assert_eq!(inner("''"), "");
        assert_eq!(inner("\"Account\""), "Account");
    }

    #[test]
    fn unterminated_input_is_an_error() {
        assert!(scope("(a, (b)", 0).unwrap_err().is_parse());
        assert!(scope("('a)", 0).unwrap_err().is_parse());
        assert!(scope("'abc", 0).unwrap_err().is_parse());
        assert!(scope(r"(a\", 0).unwrap_err().is_parse());
        assert!(scope("abc", 0).unwrap_err().is_parse());
    }

    #[test]
    fn split_top_level_respects_scopes() {
        let items = split_top_level("id INTEGER, price numeric(10, 2), CHECK (a IN (1, 2))", ',')
            .unwrap();
        assert_eq!(
            items,
            vec!["id INTEGER", "price numeric(10, 2)", "CHECK (a IN (1, 2))"]
        );

        let labels = split_top_level(r"'a', 'b,c', 'd\''", ',').unwrap();
        assert_eq!(labels, vec!["'a'", "'b,c'", r"'d\''"]);
    }

    #[test]
    fn split_top_level_rejects_empty_items() {
        assert!(split_top_level("a,,b", ',').is_err());
        assert!(split_top_level("a, ", ',').is_err());
        assert!(split_top_level("   ", ',').unwrap().is_empty());
        assert!(split_top_level("a)", ',').is_err());
    }
}
