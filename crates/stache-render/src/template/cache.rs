//! Content-addressed cache of compiled templates.
//!
//! Every compiled unit is keyed by the SHA-256 of its exact source text. The
//! same text always maps to the same [`CacheKey`] and therefore to one shared
//! [`CompiledTemplate`]; edited text hashes differently, so stale entries are
//! simply never looked up again. Names never take part in the key: two names
//! with identical source share one compiled unit.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use sha2::{Digest, Sha256};

use super::node::Node;
use super::parser;
use crate::error::CompileError;

/// Lowercase hex SHA-256 of template source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key for a source string.
    ///
    /// ```rust
    /// use stache_render::CacheKey;
    ///
    /// let key = CacheKey::for_source("{{name}}");
    /// assert_eq!(key.as_str().len(), 64);
    /// assert_eq!(key, CacheKey::for_source("{{name}}"));
    /// ```
    #[must_use]
    pub fn for_source(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable compiled template.
#[derive(Debug, PartialEq)]
pub struct CompiledTemplate {
    key: CacheKey,
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Hit/miss counters for a [`TemplateCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Maps [`CacheKey`]s to compiled templates.
///
/// Partials are compiled lazily while a render is in progress, so the cache
/// uses interior mutability and is not `Sync`.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RefCell<HashMap<CacheKey, Rc<CompiledTemplate>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled unit for `source`, compiling it on first sight.
    ///
    /// Compile errors are returned and nothing is cached for that source.
    pub fn get_or_compile(&self, source: &str) -> Result<Rc<CompiledTemplate>, CompileError> {
        let key = CacheKey::for_source(source);
        if let Some(found) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            tracing::trace!(key = %key, "template cache hit");
            return Ok(Rc::clone(found));
        }

        let nodes = parser::parse(source)?;
        self.misses.set(self.misses.get() + 1);
        tracing::debug!(key = %key, nodes = nodes.len(), "compiled template");

        let compiled = Rc::new(CompiledTemplate {
            key: key.clone(),
            nodes,
        });
        self.entries.borrow_mut().insert(key, Rc::clone(&compiled));
        Ok(compiled)
    }

    /// Like [`get_or_compile`](Self::get_or_compile), but a miss is compiled
    /// without being stored.
    ///
    /// Used for text produced at render time (lambda output), which may be
    /// different on every call.
    pub fn get_or_compile_transient(&self, source: &str) -> Result<Rc<CompiledTemplate>, CompileError> {
        let key = CacheKey::for_source(source);
        if let Some(found) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(Rc::clone(found));
        }
        let nodes = parser::parse(source)?;
        tracing::trace!(key = %key, "compiled transient template");
        Ok(Rc::new(CompiledTemplate { key, nodes }))
    }

    /// Looks up an already compiled unit.
    pub fn get(&self, key: &CacheKey) -> Option<Rc<CompiledTemplate>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drops every entry. Templates already handed out stay valid.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.len(),
        }
    }
}
