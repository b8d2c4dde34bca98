//! # Translation References
//!
//! A settings value either holds a literal or defers to a translatable
//! string through the wire form `t:<dot.separated.path>`. The path resolves
//! against the merged translation tree.
//!
//! There is no escaping: any string starting with `t:` is a reference.
//! Inside the engine values are viewed through [`SettingValue`]; the `t:`
//! string only exists at the page-config boundary.

use pagewright_common::{PageConfig, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker prefix of a translation reference
pub const REFERENCE_PREFIX: &str = "t:";

/// Dot-separated path into a translation tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct TranslationPath(Vec<String>);

impl TranslationPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split a dotted path. The empty string is the empty path.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self(Vec::new());
        }
        Self(dotted.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First segment, the namespace the path lives in
    pub fn namespace(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Joined form used as the provenance key
    pub fn dotted(&self) -> String {
        self.0.join(".")
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.0.len() >= prefix.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

impl fmt::Display for TranslationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<&str> for TranslationPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<String> for TranslationPath {
    fn from(dotted: String) -> Self {
        Self::parse(&dotted)
    }
}

impl From<TranslationPath> for String {
    fn from(path: TranslationPath) -> Self {
        path.dotted()
    }
}

/// Whether a string is a translation reference
pub fn is_reference_str(value: &str) -> bool {
    value.starts_with(REFERENCE_PREFIX)
}

/// Whether a settings value is a translation reference
pub fn is_reference(value: &Value) -> bool {
    value.as_str().is_some_and(is_reference_str)
}

/// Path a reference points at, `None` for anything that is not a reference
pub fn path_of(value: &str) -> Option<TranslationPath> {
    value.strip_prefix(REFERENCE_PREFIX).map(TranslationPath::parse)
}

/// Wire form of a reference to `path`
pub fn to_reference(path: &TranslationPath) -> String {
    format!("{}{}", REFERENCE_PREFIX, path.dotted())
}

/// A settings value seen as either a literal or a reference
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Literal(Value),
    Reference(TranslationPath),
}

impl SettingValue {
    pub fn classify(value: &Value) -> Self {
        match value.as_str().and_then(path_of) {
            Some(path) => SettingValue::Reference(path),
            None => SettingValue::Literal(value.clone()),
        }
    }

    /// Serialize back to the page-config representation
    pub fn to_value(&self) -> Value {
        match self {
            SettingValue::Literal(value) => value.clone(),
            SettingValue::Reference(path) => Value::String(to_reference(path)),
        }
    }

    pub fn reference(&self) -> Option<&TranslationPath> {
        match self {
            SettingValue::Reference(path) => Some(path),
            SettingValue::Literal(_) => None,
        }
    }
}

impl From<&Value> for SettingValue {
    fn from(value: &Value) -> Self {
        Self::classify(value)
    }
}

#[derive(Default)]
struct ReferenceCollector {
    paths: Vec<TranslationPath>,
}

impl Visitor for ReferenceCollector {
    fn visit_string(&mut self, value: &str) {
        if let Some(path) = path_of(value) {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
    }
}

/// Every distinct reference held anywhere in the page, in render order
pub fn collect_references(page: &PageConfig) -> Vec<TranslationPath> {
    let mut collector = ReferenceCollector::default();
    collector.visit_page(page);
    collector.paths
}
