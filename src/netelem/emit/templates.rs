//! Templates for generated units.
//!
//! Each template lives in its own file under `templates/` so it can be read
//! and diffed as the code it produces. Rust expressions inside the output
//! (key expressions, attribute constructors) are built by [`super::literal`]
//! and passed in ready-made; templates only lay them out.

use stencil::Renderer;

use crate::error::Result;

pub const HEADER_TEMPLATE: &str = include_str!("templates/header.tmp");
pub const CONSTANTS_TEMPLATE: &str = include_str!("templates/constants.tmp");
pub const KEY_ENUM_TEMPLATE: &str = include_str!("templates/key_enum.tmp");
pub const INITIALIZER_TEMPLATE: &str = include_str!("templates/initializer.tmp");
pub const BUILDER_TEMPLATE: &str = include_str!("templates/builder.tmp");
pub const FOOTER_TEMPLATE: &str = include_str!("templates/footer.tmp");

pub const HEADER: &str = "header";
pub const CONSTANTS: &str = "constants";
pub const KEY_ENUM: &str = "key_enum";
pub const INITIALIZER: &str = "initializer";
pub const BUILDER: &str = "builder";
pub const FOOTER: &str = "footer";

/// A renderer with every unit template registered.
pub fn renderer() -> Result<Renderer> {
    let mut renderer = Renderer::new();
    for (name, source) in [
        (HEADER, HEADER_TEMPLATE),
        (CONSTANTS, CONSTANTS_TEMPLATE),
        (KEY_ENUM, KEY_ENUM_TEMPLATE),
        (INITIALIZER, INITIALIZER_TEMPLATE),
        (BUILDER, BUILDER_TEMPLATE),
        (FOOTER, FOOTER_TEMPLATE),
    ] {
        renderer.add_template(name, source)?;
    }
    Ok(renderer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_templates_compile() {
        let renderer = renderer().unwrap();
        for name in [HEADER, CONSTANTS, KEY_ENUM, INITIALIZER, BUILDER, FOOTER] {
            assert!(renderer.has_template(name), "{} missing", name);
        }
    }

    #[test]
    fn key_enum_layout() {
        let renderer = renderer().unwrap();
        let out = renderer
            .render(
                KEY_ENUM,
                &json!({
                    "path": "own",
                    "name": "OwnKey",
                    "members": [
                        { "ident": "State", "text": "STATE" },
                        { "ident": "Round", "text": "ROUND" },
                    ],
                }),
            )
            .unwrap();
        assert!(out.contains("pub enum OwnKey {\n    State,\n    Round,\n}\n"));
        assert!(out.contains("            OwnKey::Round => ROUND,\n"));
    }

    #[test]
    fn initializer_without_entries() {
        let renderer = renderer().unwrap();
        let out = renderer
            .render(
                INITIALIZER,
                &json!({ "path": "private", "name": "init_private", "entries": [] }),
            )
            .unwrap();
        assert_eq!(
            out,
            "/// Baseline content of `private`\n\
             pub fn init_private(functions: &FunctionRegistry) -> Result<AttributeDictionary, DuplicateKeyError> {\n    \
             let mut dict = AttributeDictionary::new();\n    \
             Ok(dict)\n\
             }\n"
        );
    }
}
