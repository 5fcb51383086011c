//! Splits template source into text and tag tokens.
//!
//! The lexer owns two pieces of syntax that depend on raw positions rather
//! than tree structure: set-delimiter tags, which change how the rest of the
//! source is scanned, and standalone lines. A standalone line holds exactly one
//! non-interpolating tag and otherwise only whitespace; the whole line,
//! including its newline, is dropped from the text.

use super::node::Delimiters;
use crate::error::{CompileError, CompileErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Variable,
    Raw,
    Section,
    Inverted,
    Close,
    Comment,
    Partial,
    Parent,
    Block,
    SetDelimiters,
}

impl TagKind {
    fn from_sigil(c: char) -> Option<Self> {
        Some(match c {
            '#' => TagKind::Section,
            '^' => TagKind::Inverted,
            '/' => TagKind::Close,
            '!' => TagKind::Comment,
            '>' => TagKind::Partial,
            '<' => TagKind::Parent,
            '$' => TagKind::Block,
            '&' => TagKind::Raw,
            _ => return None,
        })
    }

    /// Interpolations are never standalone: they produce output on their line.
    fn can_stand_alone(self) -> bool {
        !matches!(self, TagKind::Variable | TagKind::Raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'s> {
    Text(&'s str),
    Tag {
        kind: TagKind,
        content: &'s str,
        line: usize,
        /// Byte offset of the opening delimiter.
        start: usize,
        /// Byte offset just past the closing delimiter.
        end: usize,
        /// Leading whitespace when the tag stood alone on its line.
        standalone: Option<&'s str>,
    },
    SetDelimiters(Delimiters),
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>, CompileError> {
    Lexer::new(src).run()
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    delimiters: Delimiters,
    line: usize,
    line_pos: usize,
    tokens: Vec<Token<'s>>,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            delimiters: Delimiters::default(),
            line: 1,
            line_pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Line number of a byte offset; offsets must be requested in increasing order.
    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.src[self.line_pos..offset].matches('\n').count();
        self.line_pos = offset;
        self.line
    }

    fn push_text(&mut self, text: &'s str) {
        if !text.is_empty() {
            self.tokens.push(Token::Text(text));
        }
    }

    fn run(mut self) -> Result<Vec<Token<'s>>, CompileError> {
        let src = self.src;
        while self.pos < src.len() {
            let rest = &src[self.pos..];
            let Some(offset) = rest.find(self.delimiters.open.as_str()) else {
                self.push_text(rest);
                break;
            };
            let start = self.pos + offset;
            self.push_text(&src[self.pos..start]);
            self.tag(start)?;
        }
        Ok(self.tokens)
    }

    fn tag(&mut self, start: usize) -> Result<(), CompileError> {
        let src = self.src;
        let line = self.line_at(start);
        let after_open = start + self.delimiters.open.len();

        let (kind, inner_start, close) = match src[after_open..].chars().next() {
            Some('{') => (
                TagKind::Raw,
                after_open + 1,
                format!("}}{}", self.delimiters.close),
            ),
            Some('=') => (
                TagKind::SetDelimiters,
                after_open + 1,
                format!("={}", self.delimiters.close),
            ),
            Some(c) => match TagKind::from_sigil(c) {
                Some(kind) => (kind, after_open + c.len_utf8(), self.delimiters.close.clone()),
                None => (TagKind::Variable, after_open, self.delimiters.close.clone()),
            },
            None => (TagKind::Variable, after_open, self.delimiters.close.clone()),
        };

        let close_at = src[inner_start..]
            .find(close.as_str())
            .map(|i| inner_start + i)
            .ok_or_else(|| {
                CompileError::new(CompileErrorKind::UnclosedTag { expected: close.clone() }, line)
            })?;
        let content = src[inner_start..close_at].trim();
        let end = close_at + close.len();

        if content.is_empty() && kind != TagKind::Comment {
            return Err(CompileError::new(CompileErrorKind::EmptyTag, line));
        }

        let standalone = if kind.can_stand_alone() {
            self.standalone_prefix(start, end)
        } else {
            None
        };

        let next_pos = match standalone {
            Some((prefix, line_end)) => {
                self.trim_last_text(prefix.len());
                line_end
            }
            None => end,
        };

        if kind == TagKind::SetDelimiters {
            let delimiters = parse_delimiters(content)
                .ok_or_else(|| {
                    CompileError::new(
                        CompileErrorKind::InvalidDelimiters {
                            content: content.to_string(),
                        },
                        line,
                    )
                })?;
            self.delimiters = delimiters.clone();
            self.tokens.push(Token::SetDelimiters(delimiters));
        } else {
            self.tokens.push(Token::Tag {
                kind,
                content,
                line,
                start,
                end,
                standalone: standalone.map(|(prefix, _)| prefix),
            });
        }

        self.pos = next_pos;
        Ok(())
    }

    /// If the tag spanning `start..end` is alone on its line, returns its
    /// leading whitespace and the offset where the next line begins.
    fn standalone_prefix(&self, start: usize, end: usize) -> Option<(&'s str, usize)> {
        let src = self.src;
        let line_start = src[..start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &src[line_start..start];
        if !prefix.chars().all(|c| c == ' ' || c == '\t') {
            return None;
        }

        let rest = &src[end..];
        let line_len = rest.find('\n').map_or(rest.len(), |i| i + 1);
        let suffix = &rest[..line_len];
        let trailing = suffix.strip_suffix('\n').unwrap_or(suffix);
        let trailing = trailing.strip_suffix('\r').unwrap_or(trailing);
        if !trailing.chars().all(|c| c == ' ' || c == '\t') {
            return None;
        }

        Some((prefix, end + line_len))
    }

    /// Drops a standalone tag's leading whitespace from the preceding text token.
    fn trim_last_text(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(&Token::Text(text)) = self.tokens.last() {
            let kept = &text[..text.len() - len];
            self.tokens.pop();
            self.push_text(kept);
        }
    }
}

fn parse_delimiters(content: &str) -> Option<Delimiters> {
    let mut parts = content.split_whitespace();
    let open = parts.next()?;
    let close = parts.next()?;
    if parts.next().is_some() || open.contains('=') || close.contains('=') {
        return None;
    }
    Some(Delimiters::new(open, close))
}
