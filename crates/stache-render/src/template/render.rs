//! Walks compiled nodes against a [`Context`] and writes the output.

use std::borrow::Cow;
use std::rc::Rc;

use super::engine::MustacheEngine;
use super::node::{Delimiters, Name, Node};
use crate::context::Context;
use crate::error::RenderError;
use crate::value::{Shape, Value};

/// Output buffer that knows the indentation of the partial being rendered.
///
/// Indentation is written before each line of template text. Interpolated
/// values and lambda output are written as they are, so newlines inside them
/// are not re-indented, but a trailing newline still puts the next line of
/// template text at a line start.
#[derive(Debug)]
pub(crate) struct Output {
    buf: String,
    indent: String,
    at_line_start: bool,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            buf: String::new(),
            indent: String::new(),
            at_line_start: true,
        }
    }

    fn text(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            if self.at_line_start {
                self.buf.push_str(&self.indent);
            }
            self.buf.push_str(line);
            self.at_line_start = line.ends_with('\n');
        }
    }

    fn value(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start {
            self.buf.push_str(&self.indent);
        }
        self.buf.push_str(text);
        self.at_line_start = text.ends_with('\n');
    }

    fn raw(&mut self, text: &str) {
        if !text.is_empty() {
            self.buf.push_str(text);
            self.at_line_start = text.ends_with('\n');
        }
    }

    /// Adds a standalone tag's indentation; returns the indentation to restore.
    fn indent_by(&mut self, extra: Option<&str>) -> String {
        let mut indent = self.indent.clone();
        if let Some(extra) = extra {
            indent.push_str(extra);
            self.at_line_start = true;
        }
        std::mem::replace(&mut self.indent, indent)
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

/// Renders node trees for one engine.
///
/// `depth` counts partial and parent inclusions so runaway recursion fails
/// instead of overflowing the stack.
#[derive(Clone, Copy)]
pub(crate) struct Renderer<'e> {
    engine: &'e MustacheEngine,
    depth: usize,
}

impl<'e> Renderer<'e> {
    pub(crate) fn new(engine: &'e MustacheEngine) -> Self {
        Self { engine, depth: 0 }
    }

    fn nested(self, name: &str) -> Result<Self, RenderError> {
        let limit = self.engine.recursion_limit();
        if self.depth >= limit {
            return Err(RenderError::RecursionLimit {
                name: name.to_string(),
                limit,
            });
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self
        })
    }

    pub(crate) fn render_nodes<'a>(
        self,
        nodes: &[Node],
        ctx: &mut Context<'a>,
        out: &mut Output,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.text(text),
                Node::Variable { name, escape } => self.interpolate(name, *escape, ctx, out)?,
                Node::Section {
                    name,
                    inverted,
                    children,
                    source,
                    delimiters,
                } => {
                    let shape = Shape::of(resolve(name, ctx));
                    if *inverted {
                        if shape == Shape::Falsy {
                            self.render_nodes(children, ctx, out)?;
                        }
                        continue;
                    }
                    match shape {
                        Shape::Falsy => {}
                        Shape::Lambda(lambda) => {
                            let helper =
                                LambdaHelper::new(self, ctx.clone(), source, delimiters.clone());
                            out.raw(&lambda.call(source, &helper)?);
                        }
                        Shape::List(items) => {
                            for item in items {
                                let mut scoped = ctx.scope(item);
                                self.render_nodes(children, &mut scoped, out)?;
                            }
                        }
                        Shape::Scalar(value) => {
                            let mut scoped = ctx.scope(value);
                            self.render_nodes(children, &mut scoped, out)?;
                        }
                    }
                }
                Node::Partial { name, indent } => {
                    self.include(name, indent.as_deref(), ctx, out)?;
                }
                Node::Parent {
                    name,
                    indent,
                    blocks,
                } => {
                    let mut scoped = ctx.block_scope(Rc::clone(blocks));
                    self.include(name, indent.as_deref(), &mut scoped, out)?;
                }
                Node::Block { name, children } => match ctx.find_block(name) {
                    Some(overridden) => self.render_nodes(&overridden, ctx, out)?,
                    None => self.render_nodes(children, ctx, out)?,
                },
            }
        }
        Ok(())
    }

    fn interpolate(
        self,
        name: &Name,
        escape: bool,
        ctx: &Context<'_>,
        out: &mut Output,
    ) -> Result<(), RenderError> {
        let text = match resolve(name, ctx) {
            Some(Value::Lambda(lambda)) => {
                let helper = LambdaHelper::new(self, ctx.clone(), "", Delimiters::default());
                let produced = lambda.call("", &helper)?;
                helper.render(&produced)?
            }
            Some(value) => value.to_text(),
            None => String::new(),
        };
        if escape {
            out.value(&self.engine.escape(&text));
        } else {
            out.value(&text);
        }
        Ok(())
    }

    /// Renders a partial or parent template in the current context.
    fn include(
        self,
        name: &str,
        indent: Option<&str>,
        ctx: &mut Context<'_>,
        out: &mut Output,
    ) -> Result<(), RenderError> {
        let nested = self.nested(name)?;
        let Some(compiled) = self.engine.load_partial(name)? else {
            tracing::debug!(partial = name, "partial not found, rendering nothing");
            return Ok(());
        };
        let outer = out.indent_by(indent);
        let result = nested.render_nodes(compiled.nodes(), ctx, out);
        out.indent = outer;
        result
    }
}

fn resolve<'a>(name: &Name, ctx: &Context<'a>) -> Option<&'a Value> {
    match name {
        Name::Implicit => ctx.top(),
        Name::Key(key) => ctx.find(key),
        Name::Dotted(path) => ctx.find_dot(path),
    }
}

/// Handed to lambdas so they can render text against the context they were
/// called in.
///
/// ```rust
/// use stache_render::{MustacheEngine, Value};
///
/// let data = Value::map()
///     .insert("name", "ana")
///     .insert("bold", Value::lambda(|text, helper| {
///         Ok(format!("<b>{}</b>", helper.render(text)?))
///     }));
/// let engine = MustacheEngine::new();
/// assert_eq!(
///     engine.render_str("{{#bold}}Hi {{name}}{{/bold}}", &data).unwrap(),
///     "<b>Hi ana</b>"
/// );
/// ```
pub struct LambdaHelper<'h> {
    renderer: Renderer<'h>,
    context: Context<'h>,
    section_source: &'h str,
    delimiters: Delimiters,
}

impl<'h> LambdaHelper<'h> {
    pub(crate) fn new(
        renderer: Renderer<'h>,
        context: Context<'h>,
        section_source: &'h str,
        delimiters: Delimiters,
    ) -> Self {
        Self {
            renderer,
            context,
            section_source,
            delimiters,
        }
    }

    /// Compiles `text` and renders it against a snapshot of the calling
    /// context.
    ///
    /// Text is parsed with the delimiters that were active at the section.
    /// The section's own source is kept in the engine's cache; any other
    /// text is compiled for this call only, so lambdas producing different
    /// text on every call don't grow the cache.
    pub fn render(&self, text: &str) -> Result<String, RenderError> {
        let source = if self.delimiters.is_default() {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(format!("{}\n{}", self.delimiters.switch_tag(), text))
        };
        let cache = self.renderer.engine.cache();
        let compiled = if !text.is_empty() && text == self.section_source {
            cache.get_or_compile(&source)
        } else {
            cache.get_or_compile_transient(&source)
        }
        .map_err(|err| RenderError::compile("lambda", err))?;

        let renderer = self.renderer.nested("lambda")?;
        let mut ctx = self.context.clone();
        let mut out = Output::new();
        renderer.render_nodes(compiled.nodes(), &mut ctx, &mut out)?;
        Ok(out.finish())
    }

    /// The context the lambda was called in.
    pub fn context(&self) -> &Context<'h> {
        &self.context
    }

    /// Applies the engine's escaping function.
    pub fn escape(&self, text: &str) -> String {
        self.renderer.engine.escape(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_indents_text_lines() {
        let mut out = Output::new();
        let outer = out.indent_by(Some("  "));
        out.text("a\nb\n");
        out.indent = outer;
        out.text("c");
        assert_eq!(out.finish(), "  a\n  b\nc");
    }

    #[test]
    fn test_output_does_not_reindent_values() {
        let mut out = Output::new();
        out.indent_by(Some("> "));
        out.value("one\ntwo");
        out.text("\nthree");
        assert_eq!(out.finish(), "> one\ntwo\n> three");
    }

    #[test]
    fn test_output_raw_has_no_indent() {
        let mut out = Output::new();
        out.indent_by(Some("    "));
        out.raw("verbatim");
        out.text(" tail");
        assert_eq!(out.finish(), "verbatim tail");
    }

    #[test]
    fn test_trailing_newline_restores_line_start() {
        let mut out = Output::new();
        out.indent_by(Some("  "));
        out.raw("from lambda\n");
        out.text("a\n");
        out.value("b\n");
        out.text("c");
        assert_eq!(out.finish(), "from lambda\n  a\n  b\n  c");
    }

    #[test]
    fn test_empty_value_keeps_line_start() {
        let mut out = Output::new();
        out.indent_by(Some("  "));
        out.value("");
        out.text("x");
        assert_eq!(out.finish(), "  x");
    }

    #[test]
    fn test_recursion_limit() {
        let mut engine = MustacheEngine::new();
        engine.set_recursion_limit(3);
        engine.add_template("loop", "x{{>loop}}").unwrap();
        let err = engine
            .get_template("loop")
            .unwrap()
            .render(&Value::map())
            .unwrap_err();
        assert!(matches!(err, RenderError::RecursionLimit { limit: 3, .. }));
    }

    #[test]
    fn test_lambda_helper_uses_section_delimiters() {
        let data = Value::map()
            .insert("who", "ana")
            .insert("wrap", Value::lambda(|text, helper| helper.render(text)));
        let engine = MustacheEngine::new();
        let out = engine
            .render_str("{{=<% %>=}}<%#wrap%>hi <%who%> {{who}}<%/wrap%>", &data)
            .unwrap();
        assert_eq!(out, "hi ana {{who}}");
    }

    #[test]
    fn test_lambda_output_does_not_grow_cache() {
        let counter = std::cell::Cell::new(0);
        let data = Value::map()
            .insert(
                "stamp",
                Value::lambda(move |_, _| {
                    counter.set(counter.get() + 1);
                    Ok(format!("call {{{{n}}}} #{}", counter.get()))
                }),
            )
            .insert("n", 7)
            .insert("wrap", Value::lambda(|text, helper| helper.render(text)));
        let engine = MustacheEngine::new();
        let source = "{{stamp}} {{#wrap}}[{{n}}]{{/wrap}}";

        assert_eq!(engine.render_str(source, &data).unwrap(), "call 7 #1 [7]");
        let entries = engine.cache().len();
        assert_eq!(engine.render_str(source, &data).unwrap(), "call 7 #2 [7]");
        assert_eq!(engine.cache().len(), entries);
        // template plus the wrapped section source
        assert_eq!(entries, 2);
    }

    #[test]
    fn test_lambda_helper_sees_section_context() {
        let data = Value::map()
            .insert("items", vec![Value::map().insert("n", 1), Value::map().insert("n", 2)])
            .insert(
                "twice",
                Value::lambda(|text, helper| Ok(helper.render(text)?.repeat(2))),
            );
        let engine = MustacheEngine::new();
        let out = engine
            .render_str("{{#items}}{{#twice}}{{n}}{{/twice}}{{/items}}", &data)
            .unwrap();
        assert_eq!(out, "1122");
    }
}
