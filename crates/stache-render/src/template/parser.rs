//! Builds the node tree from lexer tokens.

use std::rc::Rc;

use super::lexer::{tokenize, TagKind, Token};
use super::node::{BlockMap, Delimiters, Name, Node};
use crate::error::{CompileError, CompileErrorKind};

/// Compiles template source into nodes.
pub(crate) fn parse(src: &str) -> Result<Vec<Node>, CompileError> {
    let mut parser = Parser {
        src,
        delimiters: Delimiters::default(),
        root: Vec::new(),
        open: Vec::new(),
    };
    for token in tokenize(src)? {
        parser.token(token)?;
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenKind {
    Section,
    Inverted,
    Parent,
    Block,
}

/// A tag whose closing tag hasn't been seen yet.
struct Open<'s> {
    kind: OpenKind,
    name: &'s str,
    line: usize,
    /// Offset just past the opening tag, where the section's source begins.
    body_start: usize,
    indent: Option<&'s str>,
    delimiters: Delimiters,
    nodes: Vec<Node>,
}

struct Parser<'s> {
    src: &'s str,
    delimiters: Delimiters,
    root: Vec<Node>,
    open: Vec<Open<'s>>,
}

impl<'s> Parser<'s> {
    fn nodes(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(open) => &mut open.nodes,
            None => &mut self.root,
        }
    }

    fn token(&mut self, token: Token<'s>) -> Result<(), CompileError> {
        match token {
            Token::Text(text) => self.nodes().push(Node::Text(text.to_string())),
            Token::SetDelimiters(delimiters) => self.delimiters = delimiters,
            Token::Tag {
                kind,
                content,
                line,
                start,
                end,
                standalone,
            } => {
                let open_kind = match kind {
                    TagKind::Variable | TagKind::Raw => {
                        self.nodes().push(Node::Variable {
                            name: Name::parse(content),
                            escape: kind == TagKind::Variable,
                        });
                        return Ok(());
                    }
                    TagKind::Comment | TagKind::SetDelimiters => return Ok(()),
                    TagKind::Partial => {
                        self.nodes().push(Node::Partial {
                            name: content.to_string(),
                            indent: standalone.map(str::to_string),
                        });
                        return Ok(());
                    }
                    TagKind::Close => return self.close(content, line, start),
                    TagKind::Section => OpenKind::Section,
                    TagKind::Inverted => OpenKind::Inverted,
                    TagKind::Parent => OpenKind::Parent,
                    TagKind::Block => OpenKind::Block,
                };
                self.open.push(Open {
                    kind: open_kind,
                    name: content,
                    line,
                    body_start: end,
                    indent: standalone,
                    delimiters: self.delimiters.clone(),
                    nodes: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &'s str, line: usize, close_start: usize) -> Result<(), CompileError> {
        let open = self.open.pop().ok_or_else(|| {
            CompileError::new(
                CompileErrorKind::UnexpectedClose {
                    name: name.to_string(),
                },
                line,
            )
        })?;
        if open.name != name {
            return Err(CompileError::new(
                CompileErrorKind::MismatchedClose {
                    expected: open.name.to_string(),
                    found: name.to_string(),
                },
                line,
            ));
        }

        let node = match open.kind {
            OpenKind::Section | OpenKind::Inverted => Node::Section {
                name: Name::parse(open.name),
                inverted: open.kind == OpenKind::Inverted,
                children: open.nodes,
                source: self.src[open.body_start..close_start].to_string(),
                delimiters: open.delimiters,
            },
            OpenKind::Parent => {
                // Only block overrides count inside a parent tag.
                let blocks: BlockMap = open
                    .nodes
                    .into_iter()
                    .filter_map(|node| match node {
                        Node::Block { name, children } => Some((name, children)),
                        _ => None,
                    })
                    .collect();
                Node::Parent {
                    name: open.name.to_string(),
                    indent: open.indent.map(str::to_string),
                    blocks: Rc::new(blocks),
                }
            }
            OpenKind::Block => Node::Block {
                name: open.name.to_string(),
                children: Rc::from(open.nodes),
            },
        };
        self.nodes().push(node);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Node>, CompileError> {
        if let Some(open) = self.open.pop() {
            return Err(CompileError::new(
                CompileErrorKind::UnclosedSection {
                    name: open.name.to_string(),
                },
                open.line,
            ));
        }
        Ok(self.root)
    }
}
