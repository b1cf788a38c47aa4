use crate::domain::model::{Descriptor, MergeStrategy, Modifier, Require};
use crate::utils::error::{ModuleError, Result};

pub const BEGIN_MARKER: &str = "  // BEGIN";
pub const END_MARKER: &str = "  // END.";
pub const BASE_MODULE: &str = "java.base";

/// Derives an open descriptor from `main` and appends one plain `requires`
/// per test module. Existing requires are not deduplicated against the
/// test ones.
///
/// Every module other than `java.base` must require it, so a mandated
/// `requires java.base` is put first when the merged set lacks one. This
/// is the usual case for a main descriptor read from source, which only
/// yields the name.
pub fn merge_structural(main: &Descriptor, test_requires: &[String]) -> Result<Descriptor> {
    if test_requires.is_empty() {
        return Err(ModuleError::EmptyTestDirectives {
            strategy: MergeStrategy::Structural.to_string(),
        });
    }

    let mut merged = Descriptor::open_module(main.name.clone());
    merged.packages = main.packages.clone();
    merged.requires = main.requires.clone();
    merged.exports = main.exports.clone();
    merged.opens = main.opens.clone();
    merged.uses = main.uses.clone();
    merged.provides = main.provides.clone();
    merged
        .requires
        .extend(test_requires.iter().map(|name| Require::new(name.as_str())));
    if merged.name != BASE_MODULE && !merged.requires.iter().any(|r| r.name == BASE_MODULE) {
        merged.requires.insert(
            0,
            Require::new(BASE_MODULE).with_modifier(Modifier::Mandated),
        );
    }

    tracing::debug!(
        module = %merged.name,
        main_requires = main.requires.len(),
        test_requires = test_requires.len(),
        "structural merge"
    );
    Ok(merged)
}

/// Splices `test_lines` between markers ahead of every line containing `}`
/// and rewrites each `module ` occurrence to `open module `.
///
/// The rewrite is a plain substring replace on every line, so comments or
/// directives containing `module ` are rewritten too.
pub fn merge_textual(main_lines: &[String], test_lines: &[String]) -> Result<Vec<String>> {
    if test_lines.is_empty() {
        return Err(ModuleError::EmptyTestDirectives {
            strategy: MergeStrategy::Textual.to_string(),
        });
    }

    let mut merged = Vec::with_capacity(main_lines.len() + test_lines.len() + 2);
    for line in main_lines {
        if line.contains('}') {
            merged.push(BEGIN_MARKER.to_string());
            merged.extend(test_lines.iter().cloned());
            merged.push(END_MARKER.to_string());
        }
        merged.push(line.replace("module ", "open module "));
    }
    Ok(merged)
}
