use std::{collections::BTreeMap, fmt};

/// Sanitized, de-duplicated, name-ordered label set.
///
/// Built through [`canonicalize`](super::canonicalize); names always match `[a-z_][a-z0-9_]*`.
/// [`CanonicalLabel::flatten`] is the aggregation key and the text a serializer prints between braces.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalLabel(BTreeMap<String, String>);

impl CanonicalLabel {
    /// Create an empty label set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or overwrite a label. The name must already be sanitized.
    pub(crate) fn insert(&mut self, name: String, value: String) -> &mut Self {
        debug_assert!(super::is_valid_name(&name));
        self.0.insert(name, value);
        self
    }

    /// Returns `true` if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the value for a name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    /// Returns `true` if the label name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `a="x",b="y"`, values escaped for the exposition format.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            push_pair(&mut out, name, value);
        }
        out
    }

    /// Like [`CanonicalLabel::flatten`] with one trailing label appended (e.g. `le` on histogram buckets).
    pub fn flatten_with(&self, name: &str, value: &str) -> String {
        let mut out = self.flatten();
        push_pair(&mut out, name, value);
        out
    }
}

impl fmt::Display for CanonicalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.flatten())
    }
}

fn push_pair(out: &mut String, name: &str, value: &str) {
    if !out.is_empty() {
        out.push(',');
    }
    out.push_str(name);
    out.push_str("=\"");
    escape_value(out, value);
    out.push('"');
}

fn escape_value(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}
