//! Escaping applied to `{{name}}` interpolations.
//!
//! The engine holds an [`Escaper`]; the default is [`html_escape`]. Triple
//! mustache (`{{{name}}}`) and ampersand (`{{& name}}`) tags bypass it.

use std::rc::Rc;

/// An injectable escaping function.
pub type Escaper = Rc<dyn Fn(&str) -> String>;

/// Escapes text for safe inclusion in HTML element content and attribute values.
///
/// ```rust
/// use stache_render::html_escape;
///
/// assert_eq!(html_escape("<b>"), "&lt;b&gt;");
/// assert_eq!(html_escape("\"Tom\" & 'Jerry'"), "&quot;Tom&quot; &amp; &#39;Jerry&#39;");
/// ```
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// An escaper that returns its input unchanged.
///
/// Useful for rendering plain-text output such as emails or config files.
pub fn no_escape(text: &str) -> String {
    text.to_string()
}

pub(crate) fn default_escaper() -> Escaper {
    Rc::new(html_escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(html_escape("hello world"), "hello world");
    }

    #[test]
    fn test_all_special_chars() {
        assert_eq!(html_escape("&<>\"'"), "&amp;&lt;&gt;&quot;&#39;");
    }

    #[test]
    fn test_multibyte_preserved() {
        assert_eq!(html_escape("café <ü>"), "café &lt;ü&gt;");
    }

    #[test]
    fn test_no_escape() {
        assert_eq!(no_escape("<b>"), "<b>");
    }
}
