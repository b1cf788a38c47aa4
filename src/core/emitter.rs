use crate::domain::model::{Descriptor, Modifier, PackageDirective};
use crate::utils::error::Result;

/// Joins lines into UTF-8 source text, each line newline-terminated.
pub fn emit_text(lines: &[String]) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Renders a descriptor as module declaration source. Only modifiers that
/// have a source keyword (`transitive`, `static`) are written.
pub fn render_descriptor(descriptor: &Descriptor) -> Vec<String> {
    let mut lines = Vec::new();
    let open = if descriptor.open { "open " } else { "" };
    lines.push(format!("{}module {} {{", open, descriptor.name));

    for require in &descriptor.requires {
        let mut line = String::from("  requires ");
        for modifier in &require.modifiers {
            if matches!(modifier, Modifier::Transitive | Modifier::Static) {
                line.push_str(modifier.keyword());
                line.push(' ');
            }
        }
        line.push_str(&require.name);
        line.push(';');
        lines.push(line);
    }
    lines.extend(descriptor.exports.iter().map(|e| package_line("exports", e)));
    lines.extend(descriptor.opens.iter().map(|o| package_line("opens", o)));
    lines.extend(descriptor.uses.iter().map(|s| format!("  uses {};", s)));
    for provide in &descriptor.provides {
        lines.push(format!(
            "  provides {} with {};",
            provide.service,
            provide.providers.join(", ")
        ));
    }

    lines.push("}".to_string());
    lines
}

pub fn render_json(descriptor: &Descriptor) -> Result<String> {
    Ok(serde_json::to_string_pretty(descriptor)?)
}

fn package_line(keyword: &str, directive: &PackageDirective) -> String {
    if directive.targets.is_empty() {
        format!("  {} {};", keyword, directive.source)
    } else {
        let targets: Vec<&str> = directive.targets.iter().map(String::as_str).collect();
        format!("  {} {} to {};", keyword, directive.source, targets.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merge::merge_structural;
    use crate::domain::model::{Export, Open, Provide, Require};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_emit_text_terminates_every_line() {
        let lines = vec!["open module app {".to_string(), "}".to_string()];
        assert_eq!(emit_text(&lines), "open module app {\n}\n");
        assert_eq!(emit_text(&[]), "");
    }

    #[test]
    fn test_emit_text_keeps_whitespace() {
        let lines = vec!["  requires t;   ".to_string()];
        assert_eq!(emit_text(&lines), "  requires t;   \n");
    }

    #[test]
    fn test_render_structural_merge_example() {
        let main = Descriptor::new("app")
            .requires(Require::new("java.base"))
            .exports(Export::new("app.api"));
        let merged = merge_structural(&main, &["test.framework".to_string()]).unwrap();

        assert_eq!(
            render_descriptor(&merged),
            vec![
                "open module app {",
                "  requires java.base;",
                "  requires test.framework;",
                "  exports app.api;",
                "}",
            ]
        );
    }

    #[test]
    fn test_render_json_lists_modifiers_by_name() {
        let descriptor = Descriptor::open_module("app")
            .requires(Require::new("java.sql").with_modifier(Modifier::Transitive));
        let json = render_json(&descriptor).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "app");
        assert_eq!(value["open"], true);
        assert_eq!(value["requires"][0]["modifiers"][0], "transitive");
        assert_eq!(value["version"], serde_json::Value::Null);
    }

    #[test]
    fn test_render_all_directive_kinds() {
        let descriptor = Descriptor::new("app")
            .requires(
                Require::new("java.sql")
                    .with_modifier(Modifier::Static)
                    .with_modifier(Modifier::Mandated),
            )
            .exports(Export::new("app.spi").to("b.mod").to("a.mod"))
            .opens(Open::new("app.model"))
            .uses("app.spi.Codec")
            .provides(Provide::new("app.spi.Codec", ["app.Z", "app.A"]));

        assert_eq!(
            render_descriptor(&descriptor),
            vec![
                "module app {",
                "  requires static java.sql;",
                "  exports app.spi to a.mod, b.mod;",
                "  opens app.model;",
                "  uses app.spi.Codec;",
                "  provides app.spi.Codec with app.Z, app.A;",
                "}",
            ]
        );
    }
}
