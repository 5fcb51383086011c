//! # Stache Render - Logic-less Mustache Templates
//!
//! `stache-render` compiles and renders Mustache templates: variables,
//! sections, inverted sections, partials, template inheritance, set
//! delimiters and lambdas. Compiled templates are cached by the SHA-256 of
//! their source, so the same text is compiled once no matter how many names
//! or partial references point at it.
//!
//! ## Core Concepts
//!
//! - [`Value`]: data visible to templates, including [`Lambda`]s
//! - [`Context`]: the scope stack names are resolved against
//! - [`MustacheEngine`]: named templates, partial loading, escaping, helpers
//! - [`TemplateCache`]: content-addressed compiled templates
//! - [`TemplateRegistry`]: templates from inline strings and directories
//!
//! ## Quick Start
//!
//! ```rust
//! use stache_render::{MustacheEngine, Value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Row { title: String, content: String }
//!
//! #[derive(Serialize)]
//! struct Summary { caption: String, items: Vec<Row> }
//!
//! let template = "\
//! <caption>{{caption}}</caption>
//! {{#items}}
//! <tr><th>{{{title}}}</th><td>{{content}}</td></tr>
//! {{/items}}
//! ";
//!
//! let data = Value::from_serialize(&Summary {
//!     caption: "Attempt summary".into(),
//!     items: vec![
//!         Row { title: "<b>Status</b>".into(), content: "Finished".into() },
//!         Row { title: "Marks".into(), content: "7 < 10".into() },
//!     ],
//! }).unwrap();
//!
//! let output = MustacheEngine::new().render_str(template, &data).unwrap();
//! assert_eq!(output, "\
//! <caption>Attempt summary</caption>
//! <tr><th><b>Status</b></th><td>Finished</td></tr>
//! <tr><th>Marks</th><td>7 &lt; 10</td></tr>
//! ");
//! ```
//!
//! ## Lambdas and Helpers
//!
//! A lambda in a section receives the section's raw source and a
//! [`LambdaHelper`] that renders text against the current context. Helpers
//! added to the engine are visible from every template:
//!
//! ```rust
//! use stache_render::{MustacheEngine, Value};
//!
//! let engine = MustacheEngine::new().with_helper(
//!     "str",
//!     Value::lambda(|source, _helper| {
//!         let key = source.split(',').next().unwrap_or_default().trim();
//!         Ok(match key {
//!             "summaryofattempts" => "Summary of your previous attempts".to_string(),
//!             other => format!("[[{}]]", other),
//!         })
//!     }),
//! );
//!
//! let out = engine
//!     .render_str("<h3>{{#str}}summaryofattempts, quiz{{/str}}</h3>", &Value::map())
//!     .unwrap();
//! assert_eq!(out, "<h3>Summary of your previous attempts</h3>");
//! ```

pub mod context;
mod error;
pub mod escape;
pub mod template;
pub mod value;

pub use error::{CompileError, CompileErrorKind, RenderError};

pub use context::{Context, Scope};
pub use escape::{html_escape, no_escape, Escaper};
pub use value::{Lambda, Shape, Value};

pub use template::{
    walk_template_dir,
    BlockMap,
    // Cache
    CacheKey,
    CacheStats,
    CompiledTemplate,
    Delimiters,
    FnLoader,
    LambdaHelper,
    // Engine
    MustacheEngine,
    Name,
    Node,
    PartialLoader,
    RegistryError,
    ResolvedTemplate,
    Template,
    TemplateCache,
    TemplateEngine,
    TemplateFile,
    // Registry
    TemplateRegistry,
    DEFAULT_RECURSION_LIMIT,
    TEMPLATE_EXTENSIONS,
};
