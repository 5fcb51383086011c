//! Template engine abstraction and the Mustache implementation.
//!
//! [`TemplateEngine`] is the backend-neutral interface: JSON data in, text
//! out. [`MustacheEngine`] implements it and adds the richer API that
//! templates with lambdas need, working on [`Value`] and [`Context`] directly.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use super::cache::{CacheKey, CompiledTemplate, TemplateCache};
use super::loader::PartialLoader;
use super::render::{Output, Renderer};
use crate::context::Context;
use crate::error::RenderError;
use crate::escape::{default_escaper, Escaper};
use crate::value::Value;

/// Partial and parent nesting allowed before rendering fails.
pub const DEFAULT_RECURSION_LIMIT: usize = 64;

/// A template engine that can render templates with data.
///
/// Template engines handle:
/// - Template compilation and caching
/// - Variable substitution
/// - Template logic (sections, inverted sections) - if supported
/// - Includes (partials) - if supported
pub trait TemplateEngine {
    /// Renders a template string with the given data.
    ///
    /// This compiles and renders the template in one step. Compilation goes
    /// through a content-hash cache, so rendering the same string again does
    /// not recompile it.
    fn render_template(&self, template: &str, data: &serde_json::Value) -> Result<String, RenderError>;

    /// Adds a named template to the engine.
    ///
    /// The template is compiled immediately; syntax errors are returned here
    /// rather than at render time.
    fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError>;

    /// Renders a previously registered template.
    fn render_named(&self, name: &str, data: &serde_json::Value) -> Result<String, RenderError>;

    /// Checks if a template with the given name exists.
    fn has_template(&self, name: &str) -> bool;

    /// Renders a template with additional context values.
    ///
    /// The `context` values sit in a frame below `data`, so on key conflicts
    /// `data` takes precedence.
    fn render_with_context(
        &self,
        template: &str,
        data: &serde_json::Value,
        context: HashMap<String, serde_json::Value>,
    ) -> Result<String, RenderError>;

    /// Whether this engine supports template includes (`{{> partial}}`).
    fn supports_includes(&self) -> bool;

    /// Whether this engine supports filters (`{{ value | filter }}`).
    fn supports_filters(&self) -> bool;

    /// Whether this engine supports control flow (sections).
    fn supports_control_flow(&self) -> bool;
}

/// Logic-less Mustache engine.
///
/// Holds named templates, the compile cache, an optional partial loader,
/// the escaping function and global helpers. Helpers form the outermost
/// context frame of every render, so a `str` lambda added once is visible to
/// every template and partial.
///
/// # Example
///
/// ```rust
/// use stache_render::{MustacheEngine, Value};
///
/// let mut engine = MustacheEngine::new();
/// engine.add_template("row", "<td>{{title}}</td>").unwrap();
/// engine.add_template("table", "{{#items}}{{>row}}{{/items}}").unwrap();
///
/// let data = Value::from(serde_json::json!({
///     "items": [{"title": "Started"}, {"title": "<b>Finished</b>"}]
/// }));
/// let out = engine.get_template("table").unwrap().render(&data).unwrap();
/// assert_eq!(out, "<td>Started</td><td>&lt;b&gt;Finished&lt;/b&gt;</td>");
/// ```
pub struct MustacheEngine {
    templates: HashMap<String, Rc<CompiledTemplate>>,
    cache: TemplateCache,
    loader: Option<Box<dyn PartialLoader>>,
    escaper: Escaper,
    helpers: Value,
    recursion_limit: usize,
}

impl MustacheEngine {
    /// Creates an engine with HTML escaping, no loader and no helpers.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            cache: TemplateCache::new(),
            loader: None,
            escaper: default_escaper(),
            helpers: Value::map(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Replaces the escaping function used by `{{name}}` tags.
    pub fn with_escape<F>(mut self, escape: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.set_escape(escape);
        self
    }

    pub fn set_escape<F>(&mut self, escape: F)
    where
        F: Fn(&str) -> String + 'static,
    {
        self.escaper = Rc::new(escape);
    }

    /// Sets where partials not added with `add_template` come from.
    pub fn with_loader<L: PartialLoader + 'static>(mut self, loader: L) -> Self {
        self.set_loader(loader);
        self
    }

    pub fn set_loader<L: PartialLoader + 'static>(&mut self, loader: L) {
        self.loader = Some(Box::new(loader));
    }

    /// Adds a global value visible to every render.
    pub fn add_helper(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let helpers = std::mem::take(&mut self.helpers);
        self.helpers = helpers.insert(name, value);
    }

    pub fn with_helper(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_helper(name, value);
        self
    }

    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// The compile cache shared by named templates, partials and lambda re-renders.
    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Applies the configured escaping function.
    pub fn escape(&self, text: &str) -> String {
        (self.escaper)(text)
    }

    /// Compiles source through the cache without registering a name.
    pub fn compile(&self, source: &str) -> Result<Rc<CompiledTemplate>, RenderError> {
        self.cache
            .get_or_compile(source)
            .map_err(|err| RenderError::compile("<string>", err))
    }

    /// Looks up a template added with `add_template`.
    pub fn get_template(&self, name: &str) -> Result<Template<'_>, RenderError> {
        let compiled = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))?;
        Ok(Template {
            engine: self,
            name: name.to_string(),
            compiled: Rc::clone(compiled),
        })
    }

    /// Wraps ad-hoc source as a [`Template`].
    pub fn template_from_str(&self, source: &str) -> Result<Template<'_>, RenderError> {
        Ok(Template {
            engine: self,
            name: "<string>".to_string(),
            compiled: self.compile(source)?,
        })
    }

    /// Compiles (through the cache) and renders `source` in one step.
    pub fn render_str(&self, source: &str, data: &Value) -> Result<String, RenderError> {
        self.template_from_str(source)?.render(data)
    }

    /// Compiles and registers a named template, usable as a partial too.
    ///
    /// Syntax errors are returned here rather than at render time.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        let compiled = self
            .cache
            .get_or_compile(source)
            .map_err(|err| RenderError::compile(name, err))?;
        tracing::debug!(name, key = %compiled.key(), "registered template");
        self.templates.insert(name.to_string(), compiled);
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Resolves a partial: named templates first, then the loader.
    pub(crate) fn load_partial(&self, name: &str) -> Result<Option<Rc<CompiledTemplate>>, RenderError> {
        if let Some(compiled) = self.templates.get(name) {
            return Ok(Some(Rc::clone(compiled)));
        }
        let Some(loader) = &self.loader else {
            return Ok(None);
        };
        let Some(source) = loader.load(name)? else {
            return Ok(None);
        };
        self.cache
            .get_or_compile(&source)
            .map(Some)
            .map_err(|err| RenderError::compile(name, err))
    }

    fn render_json(
        &self,
        template: Template<'_>,
        data: &serde_json::Value,
        extra: Option<Value>,
    ) -> Result<String, RenderError> {
        let data = Value::from(data);
        let mut ctx = Context::new(&self.helpers);
        if let Some(extra) = &extra {
            ctx.push(extra);
        }
        ctx.push(&data);
        template.render_in(&mut ctx)
    }
}

impl Default for MustacheEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MustacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MustacheEngine")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("cache", &self.cache.stats())
            .field("has_loader", &self.loader.is_some())
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl TemplateEngine for MustacheEngine {
    fn render_template(&self, template: &str, data: &serde_json::Value) -> Result<String, RenderError> {
        self.render_json(self.template_from_str(template)?, data, None)
    }

    fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        MustacheEngine::add_template(self, name, source)
    }

    fn render_named(&self, name: &str, data: &serde_json::Value) -> Result<String, RenderError> {
        self.render_json(self.get_template(name)?, data, None)
    }

    fn has_template(&self, name: &str) -> bool {
        MustacheEngine::has_template(self, name)
    }

    fn render_with_context(
        &self,
        template: &str,
        data: &serde_json::Value,
        context: HashMap<String, serde_json::Value>,
    ) -> Result<String, RenderError> {
        let extra: Value = context.into_iter().collect();
        self.render_json(self.template_from_str(template)?, data, Some(extra))
    }

    fn supports_includes(&self) -> bool {
        true
    }

    fn supports_filters(&self) -> bool {
        false
    }

    fn supports_control_flow(&self) -> bool {
        true
    }
}

/// A compiled template bound to the engine that resolves its partials.
#[derive(Debug, Clone)]
pub struct Template<'e> {
    engine: &'e MustacheEngine,
    name: String,
    compiled: Rc<CompiledTemplate>,
}

impl<'e> Template<'e> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content hash of the template source.
    pub fn key(&self) -> &CacheKey {
        self.compiled.key()
    }

    /// Renders with `data` as the only frame above the engine's helpers.
    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        let mut ctx = Context::new(&self.engine.helpers);
        ctx.push(data);
        self.render_in(&mut ctx)
    }

    /// Converts `data` with serde and renders it.
    pub fn render_serialize<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, RenderError> {
        self.render(&Value::from_serialize(data)?)
    }

    /// Renders against a caller-supplied context.
    ///
    /// The context's depth is the same after the call as before it, whether
    /// rendering succeeds or fails.
    pub fn render_in(&self, ctx: &mut Context<'_>) -> Result<String, RenderError> {
        let mut out = Output::new();
        Renderer::new(self.engine).render_nodes(self.compiled.nodes(), ctx, &mut out)?;
        let rendered = out.finish();
        tracing::trace!(template = %self.name, bytes = rendered.len(), "rendered template");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::no_escape;
    use serde_json::json;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        count: usize,
    }

    #[test]
    fn test_render_template_simple() {
        let engine = MustacheEngine::new();
        let data = serde_json::to_value(TestData {
            name: "World".into(),
            count: 42,
        })
        .unwrap();
        let output = engine
            .render_template("Hello, {{name}}! ({{count}})", &data)
            .unwrap();
        assert_eq!(output, "Hello, World! (42)");
    }

    #[test]
    fn test_render_template_with_section() {
        let engine = MustacheEngine::new();
        let data = json!({"items": ["a", "b", "c"]});
        let output = engine
            .render_template("{{#items}}{{.}},{{/items}}", &data)
            .unwrap();
        assert_eq!(output, "a,b,c,");
    }

    #[test]
    fn test_named_template() {
        let mut engine = MustacheEngine::new();
        engine.add_template("greeting", "Hello, {{name}}!").unwrap();
        assert!(engine.has_template("greeting"));
        assert!(!engine.has_template("farewell"));
        let output = engine
            .render_named("greeting", &json!({"name": "World"}))
            .unwrap();
        assert_eq!(output, "Hello, World!");
    }

    #[test]
    fn test_render_named_missing() {
        let engine = MustacheEngine::new();
        let err = engine.render_named("nope", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_add_template_reports_compile_error() {
        let mut engine = MustacheEngine::new();
        let err = engine.add_template("broken", "a\n{{#open}}").unwrap_err();
        match err {
            RenderError::Compile { name, source } => {
                assert_eq!(name, "broken");
                assert_eq!(source.line, 2);
            }
            other => panic!("expected compile error, got {:?}", other),
        }
        assert!(!engine.has_template("broken"));
    }

    #[test]
    fn test_render_with_context_data_wins() {
        let engine = MustacheEngine::new();
        let mut context = HashMap::new();
        context.insert("version".to_string(), json!("1.0.0"));
        context.insert("name".to_string(), json!("shadowed"));
        let output = engine
            .render_with_context("{{name}} v{{version}}", &json!({"name": "Test"}), context)
            .unwrap();
        assert_eq!(output, "Test v1.0.0");
    }

    #[test]
    fn test_supports_features() {
        let engine = MustacheEngine::new();
        assert!(engine.supports_includes());
        assert!(!engine.supports_filters());
        assert!(engine.supports_control_flow());
    }

    #[test]
    fn test_helpers_are_outermost_frame() {
        let engine = MustacheEngine::new()
            .with_helper("site", "Moodle")
            .with_helper("name", "helper");
        let data = Value::map().insert("name", "data");
        assert_eq!(
            engine.render_str("{{name}}@{{site}}", &data).unwrap(),
            "data@Moodle"
        );
    }

    #[test]
    fn test_custom_escape() {
        let engine = MustacheEngine::new().with_escape(no_escape);
        let data = Value::map().insert("html", "<b>");
        assert_eq!(engine.render_str("{{html}}", &data).unwrap(), "<b>");
    }

    #[test]
    fn test_named_templates_shadow_loader() {
        let mut partials = HashMap::new();
        partials.insert("p".to_string(), "from loader".to_string());
        let mut engine = MustacheEngine::new().with_loader(partials);
        engine.add_template("p", "from engine").unwrap();
        assert_eq!(
            engine.render_str("{{>p}}", &Value::map()).unwrap(),
            "from engine"
        );
    }

    #[test]
    fn test_identical_sources_share_compiled_unit() {
        let mut engine = MustacheEngine::new();
        engine.add_template("a", "{{x}}").unwrap();
        engine.add_template("b", "{{x}}").unwrap();
        let a = engine.get_template("a").unwrap();
        let b = engine.get_template("b").unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_partial_compile_error_names_partial() {
        let mut partials = HashMap::new();
        partials.insert("bad".to_string(), "{{/x}}".to_string());
        let engine = MustacheEngine::new().with_loader(partials);
        let err = engine.render_str("{{>bad}}", &Value::map()).unwrap_err();
        assert!(matches!(err, RenderError::Compile { name, .. } if name == "bad"));
    }

    #[test]
    fn test_render_serialize() {
        let mut engine = MustacheEngine::new();
        engine.add_template("t", "{{name}}={{count}}").unwrap();
        let out = engine
            .get_template("t")
            .unwrap()
            .render_serialize(&TestData {
                name: "n".into(),
                count: 3,
            })
            .unwrap();
        assert_eq!(out, "n=3");
    }
}
