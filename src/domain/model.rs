use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Directive modifier. Requires accept all four, exports and opens only
/// `Synthetic` and `Mandated`; the encoder enforces the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Transitive,
    Static,
    Synthetic,
    Mandated,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Transitive => "transitive",
            Modifier::Static => "static",
            Modifier::Synthetic => "synthetic",
            Modifier::Mandated => "mandated",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Require {
    pub name: String,
    pub modifiers: BTreeSet<Modifier>,
    pub version: Option<String>,
}

impl Require {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: BTreeSet::new(),
            version: None,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }
}

/// Shape shared by `exports` and `opens`. An empty target set means the
/// package is visible to every module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDirective {
    pub source: String,
    pub modifiers: BTreeSet<Modifier>,
    pub targets: BTreeSet<String>,
}

pub type Export = PackageDirective;
pub type Open = PackageDirective;

impl PackageDirective {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            modifiers: BTreeSet::new(),
            targets: BTreeSet::new(),
        }
    }

    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.targets.insert(target.into());
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn is_qualified(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Provider order is the service lookup priority and must survive every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
    pub service: String,
    pub providers: Vec<String>,
}

impl Provide {
    pub fn new<I, S>(service: impl Into<String>, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: service.into(),
            providers: providers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub open: bool,
    pub version: Option<String>,
    pub main_class: Option<String>,
    pub packages: BTreeSet<String>,
    pub requires: Vec<Require>,
    pub exports: Vec<Export>,
    pub opens: Vec<Open>,
    pub uses: BTreeSet<String>,
    pub provides: Vec<Provide>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: false,
            version: None,
            main_class: None,
            packages: BTreeSet::new(),
            requires: Vec::new(),
            exports: Vec::new(),
            opens: Vec::new(),
            uses: BTreeSet::new(),
            provides: Vec::new(),
        }
    }

    pub fn open_module(name: impl Into<String>) -> Self {
        Self {
            open: true,
            ..Self::new(name)
        }
    }

    pub fn requires(mut self, require: Require) -> Self {
        self.requires.push(require);
        self
    }

    pub fn exports(mut self, export: Export) -> Self {
        self.packages.insert(export.source.clone());
        self.exports.push(export);
        self
    }

    pub fn opens(mut self, open: Open) -> Self {
        self.packages.insert(open.source.clone());
        self.opens.push(open);
        self
    }

    pub fn uses(mut self, service: impl Into<String>) -> Self {
        self.uses.insert(service.into());
        self
    }

    /// Also records each provider's package; the runtime requires it to be
    /// listed with the module's packages.
    pub fn provides(mut self, provide: Provide) -> Self {
        self.packages.extend(
            provide
                .providers
                .iter()
                .filter_map(|provider| provider.rsplit_once('.'))
                .map(|(package, _)| package.to_string()),
        );
        self.provides.push(provide);
        self
    }

    /// Module names that appear in more than one `requires` entry.
    pub fn duplicate_requires(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for require in &self.requires {
            if !seen.insert(require.name.as_str()) && !duplicates.contains(&require.name.as_str())
            {
                duplicates.push(require.name.as_str());
            }
        }
        duplicates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Copy the main descriptor's directive sets and append test requires.
    Structural,
    /// Splice test lines into the main source text before its closing brace.
    Textual,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Structural => f.write_str("structural"),
            MergeStrategy::Textual => f.write_str("textual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestDirectives {
    pub lines: Vec<String>,
    pub requires: Vec<String>,
    pub merge: bool,
    pub compile: bool,
}

impl TestDirectives {
    pub fn strategy(&self) -> MergeStrategy {
        if self.compile {
            MergeStrategy::Structural
        } else {
            MergeStrategy::Textual
        }
    }
}

/// One annotated unit to process, with the locations of its main descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    pub name: String,
    pub main_descriptor_path: String,
    pub main_descriptor_binary_path: Option<String>,
    pub output_path: Option<String>,
    pub directives: TestDirectives,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Source,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub unit: String,
    pub path: String,
    pub kind: ArtifactKind,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tracks_packages() {
        let descriptor = Descriptor::new("app")
            .exports(Export::new("app.api"))
            .opens(Open::new("app.internal").to("test.framework"));

        assert!(!descriptor.open);
        assert!(descriptor.packages.contains("app.api"));
        assert!(descriptor.packages.contains("app.internal"));
        assert!(descriptor.opens[0].is_qualified());
        assert!(!descriptor.exports[0].is_qualified());
    }

    #[test]
    fn test_provides_tracks_provider_packages() {
        let descriptor = Descriptor::new("app")
            .exports(Export::new("app.api"))
            .provides(Provide::new("app.api.Svc", ["app.impl.B", "app.other.C", "Bare"]));

        let packages: Vec<&str> = descriptor.packages.iter().map(String::as_str).collect();
        assert_eq!(packages, vec!["app.api", "app.impl", "app.other"]);
    }

    #[test]
    fn test_duplicate_requires() {
        let descriptor = Descriptor::new("app")
            .requires(Require::new("java.base"))
            .requires(Require::new("test.framework"))
            .requires(Require::new("java.base"))
            .requires(Require::new("java.base"));

        assert_eq!(descriptor.duplicate_requires(), vec!["java.base"]);
    }

    #[test]
    fn test_strategy_follows_compile_switch() {
        let mut directives = TestDirectives::default();
        assert_eq!(directives.strategy(), MergeStrategy::Textual);
        directives.compile = true;
        assert_eq!(directives.strategy(), MergeStrategy::Structural);
    }
}
