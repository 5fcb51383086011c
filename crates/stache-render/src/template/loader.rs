//! Partial loading.
//!
//! The engine asks a [`PartialLoader`] for the *source* of a partial by name
//! and compiles it through its own cache. Returning `Ok(None)` means "no such
//! partial", which renders as nothing; errors are reserved for partials that
//! exist but cannot be read.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::RenderError;

/// Resolves partial names to template source.
pub trait PartialLoader {
    /// Returns the source of the named partial, or `None` if there is none.
    fn load(&self, name: &str) -> Result<Option<Cow<'_, str>>, RenderError>;
}

impl PartialLoader for HashMap<String, String> {
    fn load(&self, name: &str) -> Result<Option<Cow<'_, str>>, RenderError> {
        Ok(self.get(name).map(|source| Cow::Borrowed(source.as_str())))
    }
}

/// Adapts a closure into a [`PartialLoader`].
///
/// ```rust
/// use stache_render::{FnLoader, MustacheEngine, Value};
///
/// let engine = MustacheEngine::new().with_loader(FnLoader(|name: &str| {
///     (name == "greeting").then(|| "Hi {{who}}".to_string())
/// }));
/// let data = Value::map().insert("who", "ana");
/// assert_eq!(engine.render_str("{{>greeting}}!", &data).unwrap(), "Hi ana!");
/// ```
pub struct FnLoader<F>(pub F);

impl<F> PartialLoader for FnLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn load(&self, name: &str) -> Result<Option<Cow<'_, str>>, RenderError> {
        Ok((self.0)(name).map(Cow::Owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_loader() {
        let mut partials = HashMap::new();
        partials.insert("row".to_string(), "<tr>{{.}}</tr>".to_string());
        assert_eq!(
            partials.load("row").unwrap().as_deref(),
            Some("<tr>{{.}}</tr>")
        );
        assert!(partials.load("missing").unwrap().is_none());
    }

    #[test]
    fn test_fn_loader() {
        let loader = FnLoader(|name: &str| Some(format!("[{}]", name)));
        assert_eq!(loader.load("x").unwrap().as_deref(), Some("[x]"));
    }
}
