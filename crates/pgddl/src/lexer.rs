//! Token cursor over a single DDL statement.
//!
//! Tokens are raw slices of the statement. Delimited tokens (parenthesized groups,
//! string literals, quoted identifiers) are located with [`crate::scan::scope`], so
//! nothing inside them is ever tokenized here.

use crate::error::{SimError, SimResult};
use crate::scan::{self, is_opener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Bare run of non-delimiter characters (keywords, identifiers, numbers, operators).
    Word,
    /// `'...'` string literal.
    Literal,
    /// `"..."` or `` `...` `` quoted identifier.
    QuotedIdent,
    /// `(...)` group.
    Group,
    /// `,` or `;`.
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    /// Raw source text including delimiters.
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    /// Text between the delimiters for literals, quoted identifiers and groups.
    pub fn inner(&self) -> &'a str {
        match self.kind {
            TokenKind::Word | TokenKind::Punct => self.text,
            _ => &self.text[1..self.text.len() - 1],
        }
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(kw)
    }

    pub fn is_any_keyword(&self, kws: &[&str]) -> bool {
        kws.iter().any(|kw| self.is_keyword(kw))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Remaining text, trimmed.
    pub fn rest(&self) -> &'a str {
        self.src[self.pos..].trim()
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    pub fn is_eof(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.src.len()
    }

    fn scan_token(&self, at: usize) -> SimResult<Option<Token<'a>>> {
        let Some(c) = self.src[at..].chars().next() else {
            return Ok(None);
        };

        if is_opener(c) {
            let s = scan::scope(self.src, at)?;
            let kind = match c {
                '(' => TokenKind::Group,
                '\'' => TokenKind::Literal,
                _ => TokenKind::QuotedIdent,
            };
            return Ok(Some(Token {
                kind,
                text: &self.src[s.start..s.end],
                start: s.start,
                end: s.end,
            }));
        }

        match c {
            ',' | ';' => Ok(Some(Token {
                kind: TokenKind::Punct,
                text: &self.src[at..at + 1],
                start: at,
                end: at + 1,
            })),
            ')' => Err(SimError::parse("unbalanced parenthesis", at)),
            _ => {
                let mut end = at;
                let mut chars = self.src[at..].chars();
                while let Some(ch) = chars.next() {
                    if ch.is_whitespace() || is_opener(ch) || matches!(ch, ',' | ';' | ')') {
                        break;
                    }
                    end += ch.len_utf8();
                    if ch == '\\' {
                        match chars.next() {
                            Some(escaped) => end += escaped.len_utf8(),
                            None => {
                                return Err(SimError::parse(
                                    "dangling escape at end of input",
                                    end,
                                ));
                            }
                        }
                    }
                }
                Ok(Some(Token {
                    kind: TokenKind::Word,
                    text: &self.src[at..end],
                    start: at,
                    end,
                }))
            }
        }
    }

    pub fn peek(&mut self) -> SimResult<Option<Token<'a>>> {
        self.skip_ws();
        self.scan_token(self.pos)
    }

    pub fn next_token(&mut self) -> SimResult<Option<Token<'a>>> {
        let tok = self.peek()?;
        if let Some(t) = tok {
            self.pos = t.end;
        }
        Ok(tok)
    }

    pub fn peek_keyword(&mut self, kw: &str) -> SimResult<bool> {
        Ok(self.peek()?.is_some_and(|t| t.is_keyword(kw)))
    }

    /// Consume `kw` if it is the next token.
    pub fn eat_keyword(&mut self, kw: &str) -> SimResult<bool> {
        match self.peek()? {
            Some(t) if t.is_keyword(kw) => {
                self.pos = t.end;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Consume the keyword sequence `kws` if all of it follows; otherwise consume nothing.
    pub fn eat_keywords(&mut self, kws: &[&str]) -> SimResult<bool> {
        let saved = self.pos;
        for kw in kws {
            if !self.eat_keyword(kw)? {
                self.pos = saved;
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn expect_keyword(&mut self, kw: &str) -> SimResult<()> {
        if self.eat_keyword(kw)? {
            return Ok(());
        }
        Err(self.unexpected(&format!("expected {}", kw.to_ascii_uppercase())))
    }

    pub fn expect_keywords(&mut self, kws: &[&str]) -> SimResult<()> {
        for kw in kws {
            self.expect_keyword(kw)?;
        }
        Ok(())
    }

    /// Consume `,` or `;` if it is the next token.
    pub fn eat_punct(&mut self, p: char) -> SimResult<bool> {
        match self.peek()? {
            Some(t) if t.kind == TokenKind::Punct && t.text.starts_with(p) => {
                self.pos = t.end;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Consume `name[, name...]`.
    pub fn ident_seq(&mut self) -> SimResult<Vec<String>> {
        let mut names = vec![self.ident()?];
        while self.eat_punct(',')? {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    /// Consume an identifier: a bare word or a quoted identifier, or a dotted name made
    /// of them (`"public"."account"` becomes `public.account`).
    pub fn ident(&mut self) -> SimResult<String> {
        let mut last = match self.peek()? {
            Some(t) if is_ident_token(&t) => t,
            _ => return Err(self.unexpected("expected an identifier")),
        };
        let mut name = ident_text(&last);
        self.pos = last.end;

        // Parts of a dotted name are adjacent tokens; a bare part carries the dot.
        while let Some(t) = self.scan_token(self.pos)? {
            let dotted = (last.kind == TokenKind::Word && last.text.ends_with('.'))
                || (t.kind == TokenKind::Word && t.text.starts_with('.'));
            if !dotted || t.text.is_empty() || !is_ident_token(&t) {
                break;
            }
            name.push_str(&ident_text(&t));
            self.pos = t.end;
            last = t;
        }
        Ok(name)
    }

    /// Consume a `'...'` literal and return its inner text verbatim.
    pub fn literal(&mut self) -> SimResult<&'a str> {
        match self.peek()? {
            Some(t) if t.kind == TokenKind::Literal => {
                self.pos = t.end;
                Ok(t.inner())
            }
            _ => Err(self.unexpected("expected a quoted string")),
        }
    }

    /// Consume a `(...)` group and return its inner text.
    pub fn group(&mut self) -> SimResult<&'a str> {
        match self.peek()? {
            Some(t) if t.kind == TokenKind::Group => {
                self.pos = t.end;
                Ok(t.inner())
            }
            _ => Err(self.unexpected("expected '('")),
        }
    }

    /// Consume a `(...)` group if it is the next token.
    pub fn opt_group(&mut self) -> SimResult<Option<&'a str>> {
        match self.peek()? {
            Some(t) if t.kind == TokenKind::Group => {
                self.pos = t.end;
                Ok(Some(t.inner()))
            }
            _ => Ok(None),
        }
    }

    /// Consume tokens up to (not including) the first word in `stop`, returning the
    /// verbatim source span they cover. `None` if no token was consumed.
    pub fn span_until(&mut self, stop: &[&str]) -> SimResult<Option<&'a str>> {
        Ok(self.range_until(stop)?.map(|(s, e)| &self.src[s..e]))
    }

    /// Like [`Lexer::span_until`], returning byte offsets instead of the slice.
    pub fn range_until(&mut self, stop: &[&str]) -> SimResult<Option<(usize, usize)>> {
        let mut span: Option<(usize, usize)> = None;
        while let Some(t) = self.peek()? {
            if t.is_any_keyword(stop) || t.kind == TokenKind::Punct {
                break;
            }
            self.pos = t.end;
            span = Some((span.map_or(t.start, |(s, _)| s), t.end));
        }
        Ok(span)
    }

    /// Error if any token remains.
    pub fn expect_eof(&mut self) -> SimResult<()> {
        if self.is_eof() {
            return Ok(());
        }
        Err(self.unexpected("unexpected trailing input"))
    }

    pub fn unexpected(&mut self, message: &str) -> SimError {
        self.skip_ws();
        let found: String = self.src[self.pos..].chars().take(24).collect();
        if found.is_empty() {
            SimError::parse(format!("{message}, found end of input"), self.pos)
        } else {
            SimError::parse(format!("{message}, found \"{found}\""), self.pos)
        }
    }
}

fn is_ident_token(t: &Token<'_>) -> bool {
    matches!(t.kind, TokenKind::Word | TokenKind::QuotedIdent)
}

fn ident_text(t: &Token<'_>) -> String {
    match t.kind {
        TokenKind::QuotedIdent => unquote_ident(t.inner(), t.text),
        _ => t.text.to_string(),
    }
}

fn unquote_ident(inner: &str, raw: &str) -> String {
    if raw.starts_with('"') {
        inner.replace("\"\"", "\"")
    } else {
        inner.replace("``", "`")
    }
}

/// Parse a comma-separated identifier list such as the inside of `PRIMARY KEY (a, b)`.
pub(crate) fn ident_list(text: &str) -> SimResult<Vec<String>> {
    let mut out = Vec::new();
    for item in scan::split_top_level(text, ',')? {
        let mut lx = Lexer::new(item);
        out.push(lx.ident()?);
        lx.expect_eof()?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        let mut lx = Lexer::new(src);
        let mut out = Vec::new();
        while let Some(t) = lx.next_token().unwrap() {
            out.push((t.kind, t.text));
        }
        out
    }

    #[test]
    fn tokenizes_delimited_tokens_whole() {
        assert_eq!(
            kinds("name varchar(255) DEFAULT 'a b'::text, \"Weird Col\""),
            vec![
                (TokenKind::Word, "name"),
                (TokenKind::Word, "varchar"),
                (TokenKind::Group, "(255)"),
                (TokenKind::Word, "DEFAULT"),
                (TokenKind::Literal, "'a b'"),
                (TokenKind::Word, "::text"),
                (TokenKind::Punct, ","),
                (TokenKind::QuotedIdent, "\"Weird Col\""),
            ]
        );
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let mut lx = Lexer::new("create Table t");
        assert!(lx.eat_keywords(&["CREATE", "TABLE"]).unwrap());
        assert_eq!(lx.ident().unwrap(), "t");
        assert!(lx.is_eof());
    }

    #[test]
    fn eat_keywords_is_all_or_nothing() {
        let mut lx = Lexer::new("SET NOT NULL");
        assert!(!lx.eat_keywords(&["SET", "DEFAULT"]).unwrap());
        assert!(lx.eat_keywords(&["SET", "NOT", "NULL"]).unwrap());
    }

    #[test]
    fn span_until_keeps_source_verbatim() {
        let mut lx = Lexer::new("timestamp  without time zone NOT NULL");
        let span = lx.span_until(&["NOT", "NULL"]).unwrap();
        assert_eq!(span, Some("timestamp  without time zone"));
        assert!(lx.eat_keywords(&["NOT", "NULL"]).unwrap());
    }

    #[test]
    fn quoted_identifiers_are_unquoted() {
        let mut lx = Lexer::new("\"Say \"\"hi\"\"\" `tick`");
        assert_eq!(lx.ident().unwrap(), "Say \"hi\"");
        assert_eq!(lx.ident().unwrap(), "tick");
    }

    #[test]
    fn dotted_names_join_quoted_and_bare_parts() {
        for (src, want) in [
            ("\"public\".\"account\" (", "public.account"),
            ("public.\"Account\"", "public.Account"),
            ("\"my schema\".account", "my schema.account"),
            ("public.account", "public.account"),
        ] {
            let mut lx = Lexer::new(src);
            assert_eq!(lx.ident().unwrap(), want, "{src}");
        }

        let mut lx = Lexer::new("\"a\" \"b\"");
        assert_eq!(lx.ident().unwrap(), "a");
        assert_eq!(lx.ident().unwrap(), "b");
    }

    #[test]
    fn ident_list_parses_columns() {
        assert_eq!(
            ident_list("id, \"Name\" ,tenant_id").unwrap(),
            vec!["id", "Name", "tenant_id"]
        );
        assert!(ident_list("id name").is_err());
    }
}
