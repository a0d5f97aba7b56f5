//! Textual filter parsing.
//!
//! A logos token layer feeds a recursive-descent parser that type-checks
//! property chains against the record descriptor while it descends.
//! Precedence is `|` < `&` < `!` < atom. Errors carry the byte offset and a
//! short excerpt of the surrounding text.

use crate::{
    filter::{Binding, Filter, FilterError, RelOp},
    model::{ChainSegment, ChainedProperty, PropertyKind, PropertyModel, RecordModel},
    value::Value,
};
use logos::Logos;
use std::ops::Range;
use thiserror::Error as ThisError;

// Excerpt window for parse errors.
const EXCERPT_CHARS: usize = 20;

///
/// ParseError
///
/// Malformed filter text: human-readable message, byte offset, and an
/// excerpt of the surrounding filter text.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message} at offset {offset}: \"{excerpt}\"")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub excerpt: String,
}

///
/// Token
///

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("!")]
    Bang,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,

    #[token("=")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    #[token("?")]
    Question,
    #[regex(r"\?\[[0-9]+\]", parse_bind_id)]
    BoundQuestion(u32),

    #[token("open")]
    Open,
    #[token("closed")]
    Closed,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    Int(i128),
    #[regex(r"'(\\.|[^'\\])*'", parse_quoted)]
    Str(String),
    #[regex(r"x'[0-9a-fA-F]*'", parse_hex)]
    Blob(Vec<u8>),
}

fn parse_bind_id(lex: &mut logos::Lexer<'_, Token>) -> Option<u32> {
    let slice = lex.slice();
    slice[2..slice.len() - 1].parse().ok()
}

fn parse_quoted(lex: &mut logos::Lexer<'_, Token>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_hex(lex: &mut logos::Lexer<'_, Token>) -> Option<Vec<u8>> {
    let slice = lex.slice();
    let inner = &slice[2..slice.len() - 1];
    if inner.len() % 2 != 0 {
        return None;
    }
    (0..inner.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&inner[i..i + 2], 16).ok())
        .collect()
}

pub(crate) fn parse(record: &'static RecordModel, expr: &str) -> Result<Filter, FilterError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(expr);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(error_at(expr, span.start, "unrecognized token").into());
            }
        }
    }

    let mut parser = Parser { source: expr, tokens, pos: 0 };
    let filter = parser.parse_or(record)?;

    if let Some((_, span)) = parser.peek_span() {
        return Err(error_at(expr, span.start, "unexpected trailing input").into());
    }

    Ok(filter)
}

fn error_at(source: &str, offset: usize, message: impl Into<String>) -> ParseError {
    let start = source
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i + EXCERPT_CHARS / 2 <= offset)
        .last()
        .unwrap_or(0);
    let excerpt: String = source[start..].chars().take(EXCERPT_CHARS).collect();

    ParseError { message: message.into(), offset, excerpt }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(token, _)| token)
    }

    fn peek_span(&self) -> Option<(&Token, Range<usize>)> {
        self.tokens.get(self.pos).map(|(token, span)| (token, span.clone()))
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or_else(|| self.source.len(), |(_, span)| span.start)
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, FilterError> {
        Err(error_at(self.source, self.offset(), message).into())
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), FilterError> {
        match self.peek() {
            Some(found) if found == token => {
                self.pos += 1;
                Ok(())
            }
            _ => self.fail(format!("expected {what}")),
        }
    }

    fn parse_or(&mut self, record: &'static RecordModel) -> Result<Filter, FilterError> {
        let mut left = self.parse_and(record)?;
        while matches!(self.peek(), Some(Token::Pipe)) {
            self.pos += 1;
            let right = self.parse_and(record)?;
            left = left.or(&right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self, record: &'static RecordModel) -> Result<Filter, FilterError> {
        let mut left = self.parse_not(record)?;
        while matches!(self.peek(), Some(Token::Amp)) {
            self.pos += 1;
            let right = self.parse_not(record)?;
            left = left.and(&right)?;
        }
        Ok(left)
    }

    fn parse_not(&mut self, record: &'static RecordModel) -> Result<Filter, FilterError> {
        if matches!(self.peek(), Some(Token::Bang)) {
            self.pos += 1;
            let entity = self.parse_entity(record)?;
            return Ok(entity.not());
        }
        self.parse_entity(record)
    }

    fn parse_entity(&mut self, record: &'static RecordModel) -> Result<Filter, FilterError> {
        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                Ok(Filter::open(record))
            }
            Some(Token::Closed) => {
                self.pos += 1;
                Ok(Filter::closed(record))
            }
            Some(Token::LParen) if !self.at_outer_join_segment() => {
                self.pos += 1;
                let inner = self.parse_or(record)?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(_) | Token::LParen) => self.parse_chained(record),
            _ => self.fail("expected a filter"),
        }
    }

    // `(ident).` starts an outer-join chain segment rather than a
    // parenthesized sub-expression.
    fn at_outer_join_segment(&self) -> bool {
        matches!(
            (self.peek_at(1), self.peek_at(2), self.peek_at(3)),
            (Some(Token::Ident(_)), Some(Token::RParen), Some(Token::Dot))
        )
    }

    fn parse_chained(&mut self, record: &'static RecordModel) -> Result<Filter, FilterError> {
        let chain_offset = self.offset();
        let mut owner = record;
        let mut segments = Vec::new();

        loop {
            let segment = self.parse_segment(owner)?;
            owner = segment.property.join_target().unwrap_or(owner);
            let is_join = segment.is_join();
            segments.push(segment);

            match self.peek() {
                Some(Token::Dot) => {
                    if !is_join {
                        return self.fail("only join properties can be chained through");
                    }
                    self.pos += 1;
                }
                Some(Token::LParen) if is_join => {
                    // chain(subfilter): existential quantifier.
                    self.pos += 1;
                    let sub = self.parse_or(owner)?;
                    self.expect(&Token::RParen, "')'")?;

                    let chain = self.chain_at(record, segments, chain_offset)?;
                    return Filter::exists(record, chain, &sub, false)
                        .or_else(|err| self.fail(err.to_string()));
                }
                _ => break,
            }
        }

        let op = self.parse_relop()?;
        let last = segments.last().expect("chain has at least one segment").property;
        if last.kind.is_join() {
            return self.fail(format!("join property '{}' cannot be compared", last.name));
        }
        let binding = self.parse_rhs(last)?;

        self.build_property_filter(record, segments, op, binding, chain_offset)
    }

    // A chain that crosses a one-to-many join has no single value; the test
    // becomes an exists over the first such join, recursively.
    fn build_property_filter(
        &self,
        record: &'static RecordModel,
        segments: Vec<ChainSegment>,
        op: RelOp,
        binding: Binding,
        chain_offset: usize,
    ) -> Result<Filter, FilterError> {
        let split = segments.iter().position(|s| s.property.kind.is_to_many_join());

        match split {
            None => {
                let chain = self.chain_at(record, segments, chain_offset)?;
                Ok(Filter::property_test(record, chain, op, binding))
            }
            Some(index) => {
                let join_segments = segments[..=index].to_vec();
                let rest = segments[index + 1..].to_vec();
                let target = segments[index]
                    .property
                    .join_target()
                    .expect("to-many segment is a join");

                let sub = self.build_property_filter(target, rest, op, binding, chain_offset)?;
                let join_chain = self.chain_at(record, join_segments, chain_offset)?;
                Filter::exists(record, join_chain, &sub, false)
                    .or_else(|err| self.fail(err.to_string()))
            }
        }
    }

    fn parse_segment(
        &mut self,
        owner: &'static RecordModel,
    ) -> Result<ChainSegment, FilterError> {
        let outer = matches!(self.peek(), Some(Token::LParen));
        if outer {
            self.pos += 1;
        }

        let offset = self.offset();
        let Some((Token::Ident(name), _)) = self.advance() else {
            return self.fail("expected a property name");
        };

        let Some(property) = owner.property(&name) else {
            return Err(error_at(
                self.source,
                offset,
                format!("unknown property '{name}' on record type '{}'", owner.name),
            )
            .into());
        };

        if outer {
            if !property.kind.is_join() {
                return Err(error_at(
                    self.source,
                    offset,
                    format!("outer-join marker on non-join property '{name}'"),
                )
                .into());
            }
            self.expect(&Token::RParen, "')'")?;
            Ok(ChainSegment::outer(property))
        } else {
            Ok(ChainSegment::new(property))
        }
    }

    fn parse_relop(&mut self) -> Result<RelOp, FilterError> {
        let op = match self.peek() {
            Some(Token::Eq) => RelOp::Eq,
            Some(Token::Ne) => RelOp::Ne,
            Some(Token::Lt) => RelOp::Lt,
            Some(Token::Le) => RelOp::Le,
            Some(Token::Gt) => RelOp::Gt,
            Some(Token::Ge) => RelOp::Ge,
            _ => return self.fail("expected a relational operator"),
        };
        self.pos += 1;
        Ok(op)
    }

    fn parse_rhs(&mut self, property: &'static PropertyModel) -> Result<Binding, FilterError> {
        let offset = self.offset();
        let Some((token, _)) = self.advance() else {
            return self.fail("expected '?' or a literal");
        };

        let value = match token {
            Token::Question => return Ok(Binding::Unbound),
            Token::BoundQuestion(0) => {
                return Err(error_at(self.source, offset, "bind-id must be positive").into());
            }
            Token::BoundQuestion(id) => return Ok(Binding::Bound(id)),

            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::Null => Value::Null,
            Token::Int(raw) => integer_literal(property.kind, raw).ok_or_else(|| {
                error_at(
                    self.source,
                    offset,
                    format!("integer literal out of range for {} property", property.kind.label()),
                )
            })?,
            Token::Float(raw) => match property.kind {
                #[allow(clippy::cast_possible_truncation)]
                PropertyKind::F32 => Value::F32(raw as f32),
                _ => Value::F64(raw),
            },
            Token::Str(text) => match property.kind {
                PropertyKind::Char => {
                    let mut chars = text.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Value::Char(c),
                        _ => {
                            return Err(error_at(
                                self.source,
                                offset,
                                "char literal must hold exactly one character",
                            )
                            .into());
                        }
                    }
                }
                _ => Value::Text(text),
            },
            Token::Blob(bytes) => Value::Blob(bytes),
            _ => return Err(error_at(self.source, offset, "expected '?' or a literal").into()),
        };

        let value = value
            .adapt_to(property)
            .map_err(|err| error_at(self.source, offset, err.to_string()))?;
        Ok(Binding::Constant(value))
    }

    fn chain_at(
        &self,
        record: &'static RecordModel,
        segments: Vec<ChainSegment>,
        offset: usize,
    ) -> Result<ChainedProperty, FilterError> {
        ChainedProperty::new(record, segments)
            .map_err(|err| error_at(self.source, offset, err.to_string()).into())
    }
}

// Integer literals are built directly at the property's declared width.
fn integer_literal(kind: PropertyKind, raw: i128) -> Option<Value> {
    let value = match kind {
        PropertyKind::I8 => Value::I8(i8::try_from(raw).ok()?),
        PropertyKind::I16 => Value::I16(i16::try_from(raw).ok()?),
        PropertyKind::I32 => Value::I32(i32::try_from(raw).ok()?),
        PropertyKind::I64 => Value::I64(i64::try_from(raw).ok()?),
        PropertyKind::U8 => Value::U8(u8::try_from(raw).ok()?),
        PropertyKind::U16 => Value::U16(u16::try_from(raw).ok()?),
        PropertyKind::U32 => Value::U32(u32::try_from(raw).ok()?),
        PropertyKind::U64 => Value::U64(u64::try_from(raw).ok()?),
        #[allow(clippy::cast_precision_loss)]
        PropertyKind::F32 => Value::F32(raw as f32),
        #[allow(clippy::cast_precision_loss)]
        PropertyKind::F64 => Value::F64(raw as f64),
        _ => return None,
    };
    Some(value)
}
