// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::interpreter::error::RenderError;

use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use anyhow::Result;

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// Text of a single template expression along with where it came from
/// (usually the directive or fact definition name).
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Source {
        let mut lines = vec![];
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                lines.push((start, i as u32));
                start = i as u32 + 1;
            }
        }
        lines.push((start, contents.len() as u32));

        Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        }
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    /// 1-based line and column of a byte offset.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        for (idx, (start, end)) in self.src.lines.iter().enumerate() {
            if offset >= *start && offset <= *end {
                let col = self.src.contents[*start as usize..offset as usize]
                    .chars()
                    .count() as u32;
                return (idx as u32 + 1, col + 1);
            }
        }
        (self.src.lines.len() as u32, 1)
    }

    pub fn message(&self, offset: u32, kind: &str, msg: &str) -> String {
        let (line, col) = self.position(offset);
        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, offset: u32, msg: &str) -> anyhow::Error {
        RenderError::TemplateSyntax(self.message(offset, "error", msg).into()).into()
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.start, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.start, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            (&t[0..max], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}, \"{}{}\"",
            self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

/// Tokenizes the inside of a `{{ ... }}` segment, or a whole bare
/// expression. `}}` is returned as a symbol so the parser can find the end
/// of a segment without the lexer knowing about templates.
#[derive(Clone)]
pub struct Lexer {
    source: Source,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &Source) -> Self {
        Self::new_at(source, 0)
    }

    pub fn new_at(source: &Source, pos: usize) -> Self {
        Self {
            source: source.clone(),
            pos,
        }
    }

    fn peek(&self) -> char {
        self.peekahead(0)
    }

    fn peekahead(&self, n: usize) -> char {
        self.source.contents()[self.pos..]
            .chars()
            .nth(n)
            .unwrap_or('\x00')
    }

    fn advance(&mut self) {
        if let Some(ch) = self.source.contents()[self.pos..].chars().next() {
            self.pos += ch.len_utf8();
        }
    }

    fn span(&self, start: usize) -> Span {
        Span {
            source: self.source.clone(),
            start: start as u32,
            end: self.pos as u32,
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r' | '\n') {
            self.advance();
        }
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        Token(TokenKind::Ident, self.span(start))
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // . must be followed by at least 1 digit.
        if self.peek() == '.' && self.peekahead(1).is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let ch = self.peek();
        if ch == '_' || ch.is_ascii_alphabetic() {
            return Err(self.source.error(self.pos as u32, "invalid number"));
        }
        Ok(Token(TokenKind::Number, self.span(start)))
    }

    // The token span includes the quotes. Escapes are decoded by the parser.
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let start = self.pos;
        self.advance();
        loop {
            match self.peek() {
                '\x00' if self.pos >= self.source.contents().len() => {
                    return Err(self.source.error(start as u32, "unmatched quote"));
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                c if c == quote => {
                    self.advance();
                    break;
                }
                _ => self.advance(),
            }
        }
        Ok(Token(TokenKind::String, self.span(start)))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let start = self.pos;
        let chr = self.peek();
        if self.pos >= self.source.contents().len() {
            return Ok(Token(TokenKind::Eof, self.span(start)));
        }

        match chr {
            '"' | '\'' => self.read_string(chr),
            '0'..='9' => self.read_number(),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.read_ident()),
            '=' | '!' | '<' | '>' if self.peekahead(1) == '=' => {
                self.advance();
                self.advance();
                Ok(Token(TokenKind::Symbol, self.span(start)))
            }
            '}' if self.peekahead(1) == '}' => {
                self.advance();
                self.advance();
                Ok(Token(TokenKind::Symbol, self.span(start)))
            }
            '<' | '>' | '(' | ')' | '[' | ']' | '.' | ',' | '|' | '~' | '-' => {
                self.advance();
                Ok(Token(TokenKind::Symbol, self.span(start)))
            }
            _ => Err(self
                .source
                .error(start as u32, &format!("invalid character `{chr}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Result<Vec<(TokenKind, String)>> {
        let source = Source::from_contents("<test>".into(), text.into());
        let mut lexer = Lexer::new(&source);
        let mut out = vec![];
        loop {
            let Token(kind, span) = lexer.next_token()?;
            if kind == TokenKind::Eof {
                break;
            }
            out.push((kind, span.text().to_string()));
        }
        Ok(out)
    }

    #[test]
    fn symbols_and_idents() -> Result<()> {
        let toks = tokens("a.b[0] != 'x' }}")?;
        let texts: Vec<&str> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["a", ".", "b", "[", "0", "]", "!=", "'x'", "}}"]);
        assert_eq!(toks[7].0, TokenKind::String);
        Ok(())
    }

    #[test]
    fn invalid_character() {
        let err = tokens("a @ b").unwrap_err();
        assert!(err.to_string().contains("invalid character `@`"));
    }

    #[test]
    fn unmatched_quote() {
        assert!(tokens("'abc").is_err());
    }

    #[test]
    fn position_is_one_based() {
        let source = Source::from_contents("<test>".into(), "ab\ncd".into());
        assert_eq!(source.position(0), (1, 1));
        assert_eq!(source.position(4), (2, 2));
    }
}
