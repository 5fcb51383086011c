//! The scope stack names are resolved against during rendering.
//!
//! A [`Context`] is an ordered stack of frames. Sections push the value they
//! iterate over, so inner names shadow outer ones, and lookups fall back to
//! enclosing frames when the inner frame doesn't have the key:
//!
//! ```rust
//! use stache_render::{Context, Value};
//!
//! let page = Value::map().insert("title", "Quiz").insert("user", "ana");
//! let row = Value::map().insert("title", "Attempt 1");
//!
//! let mut ctx = Context::new(&page);
//! {
//!     let scoped = ctx.scope(&row);
//!     assert_eq!(scoped.find("title"), Some(&Value::from("Attempt 1")));
//!     assert_eq!(scoped.find("user"), Some(&Value::from("ana")));
//! }
//! // The guard popped the frame when it went out of scope.
//! assert_eq!(ctx.find("title"), Some(&Value::from("Quiz")));
//! ```
//!
//! # Stack Discipline
//!
//! Frames borrow their values for `'a`, so a context is cheap to clone (lambda
//! helpers take a snapshot). Every push made by the renderer goes through
//! [`Context::scope`] or [`Context::block_scope`], whose guards pop on drop:
//! the stack is restored even when rendering inside the scope fails.
//!
//! # Blocks
//!
//! Alongside the frames, the context carries the block overrides supplied by
//! `{{<parent}}` tags. A `{{$name}}` tag uses the *outermost* override, so the
//! template that started an inheritance chain always wins.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::RenderError;
use crate::template::{BlockMap, Node};
use crate::value::Value;

/// A stack of scope frames plus the block-override stack.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    frames: Vec<&'a Value>,
    blocks: Vec<Rc<BlockMap>>,
}

impl<'a> Context<'a> {
    /// Creates a context with a single frame.
    pub fn new(data: &'a Value) -> Self {
        Self {
            frames: vec![data],
            blocks: Vec::new(),
        }
    }

    /// Creates a context with no frames.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pushes a frame, making it the first place lookups search.
    pub fn push(&mut self, value: &'a Value) {
        self.frames.push(value);
    }

    /// Removes and returns the top frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Context`] when the stack is already empty.
    pub fn pop(&mut self) -> Result<&'a Value, RenderError> {
        self.frames
            .pop()
            .ok_or_else(|| RenderError::Context("pop called on an empty context".into()))
    }

    /// Pushes a frame and returns a guard that pops it when dropped.
    pub fn scope(&mut self, value: &'a Value) -> Scope<'_, 'a> {
        self.push(value);
        Scope {
            ctx: self,
            pushed: Pushed::Frame,
        }
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame, which is what `{{.}}` renders.
    pub fn top(&self) -> Option<&'a Value> {
        self.frames.last().copied()
    }

    /// Finds `key` in the innermost frame that has it.
    ///
    /// Only map frames take part in key lookup; a key that is present with a
    /// `null` value is found and shadows outer frames.
    pub fn find(&self, key: &str) -> Option<&'a Value> {
        self.frames.iter().rev().find_map(|&frame| match frame {
            Value::Map(map) => map.get(key),
            _ => None,
        })
    }

    /// Resolves a dotted path such as `element.id`.
    ///
    /// The first segment goes through [`find`](Self::find); each following
    /// segment indexes into the previous result (map key or list index). Any
    /// miss yields `None`. The path `.` is the top frame.
    ///
    /// ```rust
    /// use stache_render::{Context, Value};
    ///
    /// let data = Value::map().insert("element", Value::map().insert("id", "q1"));
    /// let ctx = Context::new(&data);
    /// assert_eq!(ctx.find_dot("element.id"), Some(&Value::from("q1")));
    /// assert_eq!(ctx.find_dot("element.name"), None);
    /// ```
    pub fn find_dot(&self, path: &str) -> Option<&'a Value> {
        if path == "." {
            return self.top();
        }
        let mut segments = path.split('.');
        let first = self.find(segments.next()?)?;
        segments.try_fold(first, |current, segment| current.get(segment))
    }

    /// Pushes a set of block overrides and returns a guard that pops them.
    pub fn block_scope(&mut self, blocks: Rc<BlockMap>) -> Scope<'_, 'a> {
        self.blocks.push(blocks);
        Scope {
            ctx: self,
            pushed: Pushed::Blocks,
        }
    }

    /// Finds the outermost override for a block name.
    pub fn find_block(&self, name: &str) -> Option<Rc<[Node]>> {
        self.blocks
            .iter()
            .find_map(|blocks| blocks.get(name).cloned())
    }
}

#[derive(Debug, Clone, Copy)]
enum Pushed {
    Frame,
    Blocks,
}

/// Guard returned by [`Context::scope`] and [`Context::block_scope`].
///
/// Derefs to the context, so rendering continues through it; dropping it
/// removes exactly what it pushed.
#[derive(Debug)]
pub struct Scope<'c, 'a> {
    ctx: &'c mut Context<'a>,
    pushed: Pushed,
}

impl<'a> Deref for Scope<'_, 'a> {
    type Target = Context<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Scope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        match self.pushed {
            Pushed::Frame => {
                self.ctx.frames.pop();
            }
            Pushed::Blocks => {
                self.ctx.blocks.pop();
            }
        }
    }
}
