//! # Stencil - Template Rendering for Generated Sources
//!
//! A small layer over [minijinja](https://docs.rs/minijinja) for producing
//! source files from named templates.
//!
//! ## The Problem
//!
//! Code generators need to turn free-form names (attribute keys, message types,
//! algorithm names) into identifiers of several casings, and they need the
//! output to be byte-identical for identical input:
//! - Building source text with `format!` scatters layout across the generator
//! - Casing rules get reimplemented at every call site
//! - Whitespace handling of block tags makes templates hard to read
//!
//! ## The Solution
//!
//! Stencil separates concerns:
//! - **Templates** define layout using Jinja2 syntax (via minijinja)
//! - **Casing filters** (`pascal`, `camel`, `snake`, `screaming`) turn names into identifiers
//! - **Literal filter** (`rust_str`) quotes text as an escaped string literal
//! - **Block trimming** is on, so `{% for %}` lines leave no blank lines behind
//!
//! ## Quick Example
//!
//! ```rust
//! use stencil::render;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Data {
//!     name: String,
//! }
//!
//! let output = render(
//!     "pub const {{ name | screaming }}: &str = {{ name | rust_str }};",
//!     &Data { name: "retryCount".into() },
//! )
//! .unwrap();
//! assert_eq!(output, "pub const RETRY_COUNT: &str = \"retryCount\";");
//! ```
//!
//! ## Renderer for Multiple Templates
//!
//! Generators with several templates pre-register them with [`Renderer`]:
//!
//! ```rust
//! use stencil::Renderer;
//! # use serde::Serialize;
//! # #[derive(Serialize)]
//! # struct Item { name: String }
//!
//! let mut renderer = Renderer::new();
//! renderer.add_template("fn", "fn {{ name | snake }}() {}").unwrap();
//! let out = renderer.render("fn", &Item { name: "SendPing".into() }).unwrap();
//! assert_eq!(out, "fn send_ping() {}");
//! ```

use minijinja::{Environment, Value};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

pub use minijinja::Error;

/// Identifier casings available as template filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Casing {
    /// `SendPing`
    Pascal,
    /// `sendPing`
    Camel,
    /// `send_ping`
    Snake,
    /// `SEND_PING`
    Screaming,
}

static CASINGS: Lazy<HashMap<&'static str, Casing>> = Lazy::new(|| {
    HashMap::from([
        ("pascal", Casing::Pascal),
        ("camel", Casing::Camel),
        ("snake", Casing::Snake),
        ("screaming", Casing::Screaming),
    ])
});

impl Casing {
    /// Looks up a casing by its filter name.
    pub fn from_name(name: &str) -> Option<Casing> {
        CASINGS.get(name).copied()
    }

    /// The filter name templates use for this casing.
    pub fn filter_name(self) -> &'static str {
        match self {
            Casing::Pascal => "pascal",
            Casing::Camel => "camel",
            Casing::Snake => "snake",
            Casing::Screaming => "screaming",
        }
    }

    /// Applies the casing to free-form text.
    ///
    /// Words are split by [`split_words`]; an input without any alphanumeric
    /// character yields an empty string.
    pub fn apply(self, text: &str) -> String {
        let words = split_words(text);
        match self {
            Casing::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Casing::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    if i == 0 {
                        w.to_lowercase()
                    } else {
                        capitalize(w)
                    }
                })
                .collect(),
            Casing::Snake => words
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
            Casing::Screaming => words
                .iter()
                .map(|w| w.to_uppercase())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

/// Splits free-form text into words.
///
/// Rules:
/// 1. Any non-alphanumeric character separates words (and is dropped).
/// 2. A lowercase letter or digit followed by an uppercase letter starts a new word.
/// 3. Inside an uppercase run, the last capital before a lowercase letter starts
///    a new word (`HTTPServer` -> `HTTP`, `Server`).
pub fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Renders an inline template once.
///
/// Prefer [`Renderer`] when the same template is rendered repeatedly.
pub fn render<T: Serialize>(template: &str, data: &T) -> Result<String, Error> {
    let mut env = new_environment();
    env.add_template_owned("_inline".to_string(), template.to_string())?;
    let tmpl = env.get_template("_inline")?;
    tmpl.render(data)
}

/// A renderer with pre-registered templates.
///
/// Templates are compiled when added and reused for every render. Rendering
/// is deterministic: the same data always yields the same text.
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            env: new_environment(),
        }
    }

    /// Registers a named template.
    ///
    /// The template is compiled immediately; errors are returned if syntax is invalid.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), Error> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
    }

    /// Returns true if a template with the given name is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Renders a registered template with the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if the template name is not found or rendering fails.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, Error> {
        let tmpl = self.env.get_template(name)?;
        tmpl.render(data)
    }
}

fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    register_filters(&mut env);
    env
}

/// Registers the casing filters and `rust_str` on a minijinja environment.
fn register_filters(env: &mut Environment<'static>) {
    for casing in [
        Casing::Pascal,
        Casing::Camel,
        Casing::Snake,
        Casing::Screaming,
    ] {
        env.add_filter(casing.filter_name(), move |value: Value| -> String {
            casing.apply(&value.to_string())
        });
    }
    env.add_filter("rust_str", |value: Value| -> String {
        format!("{:?}", value.to_string())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_words_on_separators() {
        assert_eq!(split_words("send ping"), vec!["send", "ping"]);
        assert_eq!(split_words("send-ping_now"), vec!["send", "ping", "now"]);
        assert_eq!(split_words("  "), Vec::<String>::new());
    }

    #[test]
    fn split_words_on_case_changes() {
        assert_eq!(split_words("sendPing"), vec!["send", "Ping"]);
        assert_eq!(split_words("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_words("round2Trip"), vec!["round2", "Trip"]);
    }

    #[test]
    fn casing_apply() {
        assert_eq!(Casing::Pascal.apply("send ping"), "SendPing");
        assert_eq!(Casing::Camel.apply("Send Ping"), "sendPing");
        assert_eq!(Casing::Snake.apply("SendPing"), "send_ping");
        assert_eq!(Casing::Screaming.apply("sendPing"), "SEND_PING");
        assert_eq!(Casing::Pascal.apply("HTTPServer"), "HttpServer");
    }

    #[test]
    fn casing_from_name() {
        assert_eq!(Casing::from_name("snake"), Some(Casing::Snake));
        assert_eq!(Casing::from_name("kebab"), None);
    }

    #[test]
    fn render_inline_with_filters() {
        let out = render(
            "{{ name | pascal }}/{{ name | snake }}/{{ name | screaming }}",
            &json!({ "name": "max rounds" }),
        )
        .unwrap();
        assert_eq!(out, "MaxRounds/max_rounds/MAX_ROUNDS");
    }

    #[test]
    fn rust_str_escapes_quotes() {
        let out = render("{{ s | rust_str }}", &json!({ "s": "say \"hi\"" })).unwrap();
        assert_eq!(out, r#""say \"hi\"""#);
    }

    #[test]
    fn block_tags_leave_no_blank_lines() {
        let template = "start\n{% for i in items %}\n- {{ i }}\n{% endfor %}\nend\n";
        let out = render(template, &json!({ "items": [1, 2] })).unwrap();
        assert_eq!(out, "start\n- 1\n- 2\nend\n");
    }

    #[test]
    fn renderer_named_templates() {
        let mut renderer = Renderer::new();
        renderer.add_template("const", "{{ n | screaming }}").unwrap();
        assert!(renderer.has_template("const"));
        assert!(!renderer.has_template("missing"));

        let out = renderer.render("const", &json!({ "n": "Foo" })).unwrap();
        assert_eq!(out, "FOO");
        assert!(renderer.render("missing", &json!({})).is_err());
    }

    #[test]
    fn renderer_rejects_bad_syntax() {
        let mut renderer = Renderer::new();
        assert!(renderer.add_template("bad", "{% for %}").is_err());
    }
}
