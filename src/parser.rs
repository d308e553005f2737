// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::builtins::FILTERS;
use crate::lexer::*;
use crate::number::*;

use core::str::FromStr;
use std::rc::Rc;

use anyhow::{bail, Result};

const KEYWORDS: [&str; 13] = [
    "and", "or", "not", "in", "is", "if", "else", "true", "false", "none", "True", "False",
    "None",
];

const TESTS: [&str; 7] = [
    "defined",
    "undefined",
    "none",
    "string",
    "number",
    "mapping",
    "sequence",
];

#[derive(Clone)]
pub struct Parser {
    source: Source,
    lexer: Lexer,
    tok: Token,
    end: u32,
}

impl Parser {
    pub fn new(source: &Source) -> Result<Self> {
        Self::new_at(source, 0)
    }

    fn new_at(source: &Source, pos: usize) -> Result<Self> {
        let mut lexer = Lexer::new_at(source, pos);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: pos as u32,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.start, &msg))
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span {
            source: self.source.clone(),
            start,
            end: self.end,
        }
    }

    fn is_keyword(&self, ident: &str) -> bool {
        KEYWORDS.contains(&ident)
    }

    /// Parses a template string: literal text with embedded `{{ expr }}`
    /// segments.
    pub fn parse_template(source: &Source) -> Result<Template> {
        let text = source.contents();
        let mut segments = vec![];
        let mut pos = 0;

        while let Some(idx) = text[pos..].find("{{") {
            let open = pos + idx;
            if open > pos {
                segments.push(Segment::Text(text[pos..open].into()));
            }

            let mut parser = Parser::new_at(source, open + 2)?;
            let expr = parser.parse_expr()?;
            if parser.token_text() != "}}" {
                let msg = "expecting `}}` to close template expression";
                return Err(source.error(parser.tok.1.start, msg));
            }
            segments.push(Segment::Expr(expr));
            pos = parser.tok.1.end as usize;
        }

        if pos < text.len() {
            segments.push(Segment::Text(text[pos..].into()));
        }

        Ok(Template {
            source: source.clone(),
            segments,
        })
    }

    /// Parses a source that is a single expression with no surrounding
    /// braces, such as a `when` condition.
    pub fn parse_bare(source: &Source) -> Result<ExprRef> {
        let mut parser = Parser::new(source)?;
        let expr = parser.parse_expr()?;
        if parser.tok.0 != TokenKind::Eof {
            return Err(source.error(parser.tok.1.start, "unexpected token after expression"));
        }
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let then = self.parse_or_expr()?;
        if self.token_text() != "if" {
            return Ok(then);
        }

        self.next_token()?;
        let cond = self.parse_or_expr()?;
        let otherwise = if self.token_text() == "else" {
            self.next_token()?;
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Ref::new(Expr::IfElse {
            span: self.span_from(start),
            cond,
            then,
            otherwise,
        }))
    }

    fn parse_or_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let mut expr = self.parse_and_expr()?;
        while self.token_text() == "or" {
            self.next_token()?;
            let rhs = self.parse_and_expr()?;
            expr = Ref::new(Expr::BoolExpr {
                span: self.span_from(start),
                op: BoolOp::Or,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_and_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let mut expr = self.parse_not_expr()?;
        while self.token_text() == "and" {
            self.next_token()?;
            let rhs = self.parse_not_expr()?;
            expr = Ref::new(Expr::BoolExpr {
                span: self.span_from(start),
                op: BoolOp::And,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_not_expr(&mut self) -> Result<ExprRef> {
        if self.token_text() != "not" {
            return self.parse_compare_expr();
        }
        let start = self.tok.1.start;
        self.next_token()?;
        let expr = self.parse_not_expr()?;
        Ok(Ref::new(Expr::Not {
            span: self.span_from(start),
            expr,
        }))
    }

    fn parse_compare_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let lhs = self.parse_concat_expr()?;

        let op = match self.token_text() {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            "in" => CompareOp::In,
            "not" => {
                self.next_token()?;
                if self.token_text() != "in" {
                    return Err(self.source.error(self.tok.1.start, "expecting `in` after `not`"));
                }
                CompareOp::NotIn
            }
            "is" => return self.parse_test(start, lhs),
            _ => return Ok(lhs),
        };
        self.next_token()?;
        let rhs = self.parse_concat_expr()?;
        Ok(Ref::new(Expr::CompareExpr {
            span: self.span_from(start),
            op,
            lhs,
            rhs,
        }))
    }

    fn parse_test(&mut self, start: u32, expr: ExprRef) -> Result<ExprRef> {
        self.next_token()?;
        let negated = self.token_text() == "not";
        if negated {
            self.next_token()?;
        }

        let name = self.tok.1.clone();
        if self.tok.0 != TokenKind::Ident || !TESTS.contains(&name.text()) {
            bail!(name.error(&format!("unknown test `{}`", name.text())));
        }
        self.next_token()?;
        Ok(Ref::new(Expr::Test {
            span: self.span_from(start),
            expr,
            name,
            negated,
        }))
    }

    fn parse_concat_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let mut expr = self.parse_filter_expr()?;
        while self.token_text() == "~" {
            self.next_token()?;
            let rhs = self.parse_filter_expr()?;
            expr = Ref::new(Expr::Concat {
                span: self.span_from(start),
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_filter_expr(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let mut expr = self.parse_ref()?;

        while self.token_text() == "|" {
            self.next_token()?;
            let name = self.tok.1.clone();
            if self.tok.0 != TokenKind::Ident {
                bail!(name.error("expecting filter name"));
            }
            self.next_token()?;

            let mut args = vec![];
            if self.token_text() == "(" {
                self.next_token()?;
                while self.token_text() != ")" {
                    args.push(self.parse_expr()?);
                    if self.token_text() != ")" {
                        self.expect(",", "between filter arguments")?;
                    }
                }
                self.next_token()?;
            }

            match FILTERS.get(name.text()) {
                None => bail!(name.error(&format!("unknown filter `{}`", name.text()))),
                Some((_, min, max)) if args.len() < *min || args.len() > *max => {
                    bail!(name.error(&format!(
                        "`{}` expects {min} to {max} arguments, got {}",
                        name.text(),
                        args.len()
                    )))
                }
                _ => (),
            }

            expr = Ref::new(Expr::Filter {
                span: self.span_from(start),
                expr,
                name,
                args,
            });
        }
        Ok(expr)
    }

    fn parse_ref(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.start;
        let mut expr = self.parse_primary()?;

        loop {
            match self.token_text() {
                "." => {
                    self.next_token()?;
                    let field = self.tok.1.clone();
                    match self.tok.0 {
                        TokenKind::Ident => {
                            self.next_token()?;
                            expr = Ref::new(Expr::RefDot {
                                span: self.span_from(start),
                                refr: expr,
                                field,
                            });
                        }
                        // `ports.0` is the same as `ports[0]`.
                        TokenKind::Number => {
                            let index = Self::read_number(field)?;
                            self.next_token()?;
                            expr = Ref::new(Expr::RefBrack {
                                span: self.span_from(start),
                                refr: expr,
                                index: Ref::new(index),
                            });
                        }
                        _ => bail!(field.error("expecting field name after `.`")),
                    }
                }
                "[" => {
                    self.next_token()?;
                    let index = self.parse_expr()?;
                    self.expect("]", "to close index expression")?;
                    expr = Ref::new(Expr::RefBrack {
                        span: self.span_from(start),
                        refr: expr,
                        index,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    fn read_number(span: Span) -> Result<Expr> {
        match Number::from_str(span.text()) {
            Ok(n) => Ok(Expr::Number(span, n)),
            Err(_) => bail!(span.error("invalid number")),
        }
    }

    fn read_string(span: &Span) -> Rc<str> {
        let text = span.text();
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => out.push('\\'),
            }
        }
        out.into()
    }

    fn parse_primary(&mut self) -> Result<ExprRef> {
        let span = self.tok.1.clone();
        let expr = match self.tok.0 {
            TokenKind::String => {
                self.next_token()?;
                Expr::String(span.clone(), Self::read_string(&span))
            }
            TokenKind::Number => {
                self.next_token()?;
                Self::read_number(span)?
            }
            TokenKind::Ident => match span.text() {
                "true" | "True" => {
                    self.next_token()?;
                    Expr::Bool(span, true)
                }
                "false" | "False" => {
                    self.next_token()?;
                    Expr::Bool(span, false)
                }
                "none" | "None" => {
                    self.next_token()?;
                    Expr::Null(span)
                }
                ident if self.is_keyword(ident) => {
                    bail!(span.error(&format!("unexpected keyword `{ident}`")))
                }
                _ => {
                    self.next_token()?;
                    Expr::Var(span)
                }
            },
            TokenKind::Symbol => match span.text() {
                "(" => {
                    self.next_token()?;
                    let expr = self.parse_expr()?;
                    self.expect(")", "while parsing parenthesized expression")?;
                    return Ok(expr);
                }
                "[" => {
                    self.next_token()?;
                    let mut items = vec![];
                    while self.token_text() != "]" {
                        items.push(self.parse_expr()?);
                        if self.token_text() != "]" {
                            self.expect(",", "between list items")?;
                        }
                    }
                    self.next_token()?;
                    Expr::Array {
                        span: self.span_from(span.start),
                        items,
                    }
                }
                "-" => {
                    self.next_token()?;
                    if self.tok.0 != TokenKind::Number {
                        bail!(span.error("unary - can only be used with numeric literals"));
                    }
                    let mut number = self.tok.1.clone();
                    number.start = span.start;
                    self.next_token()?;
                    Self::read_number(number)?
                }
                t => bail!(span.error(&format!("unexpected `{t}`"))),
            },
            TokenKind::Eof => bail!(span.error("unexpected end of expression")),
        };
        Ok(Ref::new(expr))
    }
}
