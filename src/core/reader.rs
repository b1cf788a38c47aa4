use crate::core::decoder;
use crate::domain::model::Descriptor;
use crate::domain::ports::Storage;
use crate::utils::error::{ModuleError, Result};
use regex::Regex;
use std::sync::LazyLock;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w$.])module\s+([^\s{]+)\s*\{").expect("declaration pattern is valid")
});

/// Extracts the module name from descriptor source text. Directive bodies
/// are not parsed; the result is an open descriptor carrying only the name.
pub fn parse_source(origin: &str, text: &str) -> Result<Descriptor> {
    let caps = DECLARATION
        .captures(text)
        .ok_or_else(|| ModuleError::MalformedDescriptorSource {
            path: origin.to_string(),
            message: "no `module <name> {` declaration found".to_string(),
        })?;
    Ok(Descriptor::open_module(caps[1].trim()))
}

pub fn read_source_lines<S: Storage>(storage: &S, path: &str) -> Result<Vec<String>> {
    let text = read_text(storage, path)?;
    Ok(text.lines().map(str::to_string).collect())
}

pub fn read_from_text<S: Storage>(storage: &S, path: &str) -> Result<Descriptor> {
    let text = read_text(storage, path)?;
    let descriptor = parse_source(path, &text)?;
    tracing::debug!(path, module = %descriptor.name, "read main descriptor source");
    Ok(descriptor)
}

pub fn read_from_binary<S: Storage>(storage: &S, path: &str) -> Result<Descriptor> {
    let bytes = storage.read_file(path)?;
    let descriptor = decoder::decode(&bytes)?;
    tracing::debug!(
        path,
        module = %descriptor.name,
        requires = descriptor.requires.len(),
        "read main descriptor binary"
    );
    Ok(descriptor)
}

fn read_text<S: Storage>(storage: &S, path: &str) -> Result<String> {
    let bytes = storage.read_file(path)?;
    String::from_utf8(bytes).map_err(|e| ModuleError::MalformedDescriptorSource {
        path: path.to_string(),
        message: format!("not valid UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_declaration() {
        let d = parse_source("module-info.java", "module app {\n  exports app.api;\n}\n").unwrap();
        assert_eq!(d.name, "app");
        assert!(d.open);
        assert!(d.requires.is_empty());
    }

    #[test]
    fn test_parse_open_declaration_with_dotted_name() {
        let d = parse_source("m", "open module com.example.app{ requires java.base; }").unwrap();
        assert_eq!(d.name, "com.example.app");
    }

    #[test]
    fn test_parse_skips_comment_prose() {
        let text = "// the test module for app\n/** module docs */\nmodule app {\n}\n";
        assert_eq!(parse_source("m", text).unwrap().name, "app");
    }

    #[test]
    fn test_parse_ignores_identifiers_ending_in_module() {
        let text = "@submodule x {\nmodule app {\n}\n";
        assert_eq!(parse_source("m", text).unwrap().name, "app");
    }

    #[test]
    fn test_parse_without_declaration_fails() {
        let err = parse_source("src/main/java/module-info.java", "package app;\nclass A {}\n")
            .unwrap_err();
        match err {
            ModuleError::MalformedDescriptorSource { path, .. } => {
                assert_eq!(path, "src/main/java/module-info.java")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
