//! Compilation and rendering of Mustache templates.
//!
//! Source text goes through two stages:
//!
//! **Compile**: the lexer splits source into text and tags (handling
//! set-delimiter tags and standalone lines), and the parser builds a tree of
//! [`Node`]s. Compiled trees live in a [`TemplateCache`] keyed by the SHA-256
//! of their source.
//! ```text
//! Source:  {{#items}}<td>{{title}}</td>{{/items}}
//! Nodes:   Section(items) [ Text("<td>"), Variable(title), Text("</td>") ]
//! ```
//!
//! **Render**: nodes are walked against a [`Context`](crate::Context). Each
//! section classifies its value into a [`Shape`](crate::Shape) and expands
//! accordingly; partials and parents are resolved through the engine.
//!
//! ## Which Entry Point?
//!
//! | Function | Use When |
//! |----------|----------|
//! | [`MustacheEngine::render_str`] | One-off source string with [`Value`](crate::Value) data |
//! | [`Template::render`] | Named template registered with [`MustacheEngine::add_template`] |
//! | [`Template::render_in`] | You manage the [`Context`](crate::Context) stack yourself |
//! | [`TemplateEngine::render_template`] | Backend-neutral code working on JSON |
//!
//! ## Partials
//!
//! `{{> name}}` looks in the engine's named templates first, then asks its
//! [`PartialLoader`]. A [`TemplateRegistry`] serves partials from template
//! directories:
//!
//! ```rust,ignore
//! let mut registry = TemplateRegistry::new();
//! registry.add_template_dir("./templates")?;
//! let engine = MustacheEngine::new().with_loader(registry);
//! ```
//!
//! Supported extensions: `.mustache`, `.mst`, `.html`, `.txt` (in priority order).
//!
//! ## Inheritance
//!
//! `{{< layout}}{{$title}}Mine{{/title}}{{/layout}}` renders `layout` with its
//! `{{$title}}...{{/title}}` block replaced. Blocks not overridden render
//! their default content.

mod cache;
mod engine;
mod lexer;
mod loader;
mod node;
mod parser;
pub mod registry;
mod render;

pub use cache::{CacheKey, CacheStats, CompiledTemplate, TemplateCache};
pub use engine::{MustacheEngine, Template, TemplateEngine, DEFAULT_RECURSION_LIMIT};
pub use loader::{FnLoader, PartialLoader};
pub use node::{BlockMap, Delimiters, Name, Node};
pub use registry::{
    walk_template_dir, RegistryError, ResolvedTemplate, TemplateFile, TemplateRegistry,
    TEMPLATE_EXTENSIONS,
};
pub use render::LambdaHelper;
