//! Name matching used by lookups.

use std::sync::LazyLock;

use regex::Regex;

use crate::ReferableElement;

const NAMESPACE_SEPARATORS: [&str; 2] = ["::", "."];

/// Split a qualified name on the first separator style it contains.
pub(crate) fn split_namespaces(name: &str) -> Vec<String> {
    for sep in NAMESPACE_SEPARATORS {
        if name.contains(sep) {
            return name
                .split(sep)
                .filter(|part| !part.trim().is_empty())
                .map(|part| part.trim().to_owned())
                .collect();
        }
    }
    vec![name.to_owned()]
}

/// Last component of a qualified name.
pub(crate) fn short_name(name: &str) -> &str {
    for sep in NAMESPACE_SEPARATORS {
        if let Some((_, short)) = name.rsplit_once(sep) {
            return short;
        }
    }
    name
}

/// Matches the full name of an element, optionally relative to a namespace.
///
/// With a namespace, the name may be given relative to that namespace or to
/// any of its enclosing namespaces.
pub(crate) struct NameFilter<'a> {
    name: &'a str,
    namespace: Option<&'a str>,
    exact_namespace: bool,
    name_parts: Vec<String>,
    namespace_parts: Vec<String>,
}

impl<'a> NameFilter<'a> {
    pub(crate) fn new(name: &'a str, namespace: Option<&'a str>) -> Self {
        let (name_parts, namespace_parts) = match namespace {
            Some(ns) => (split_namespaces(name), split_namespaces(ns)),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            name,
            namespace,
            exact_namespace: false,
            name_parts,
            namespace_parts,
        }
    }

    pub(crate) fn exact(name: &'a str, namespace: &'a str) -> Self {
        Self {
            exact_namespace: true,
            ..Self::new(name, Some(namespace))
        }
    }

    pub(crate) fn matches(&self, element: &ReferableElement) -> bool {
        let full_name = element.full_name.as_str();
        if self.namespace.is_none() {
            return full_name == self.name;
        }
        if !full_name.ends_with(self.name) {
            return false;
        }

        let mut full_parts = split_namespaces(full_name);
        if self.exact_namespace {
            let expected: Vec<&String> = self
                .namespace_parts
                .iter()
                .chain(&self.name_parts)
                .collect();
            return full_parts.iter().collect::<Vec<_>>() == expected;
        }

        if !full_parts.ends_with(&self.name_parts) {
            return false;
        }
        full_parts.truncate(full_parts.len() - self.name_parts.len());
        full_parts.is_empty() || self.namespace_parts.starts_with(&full_parts)
    }
}

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w) (\W)").unwrap());
static SPACE_AFTER_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\W) (\w)").unwrap());
static SPACE_BETWEEN_SYMBOLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\W) (\W)").unwrap());

/// Collapse whitespace that does not separate two words.
fn normalize(text: &str) -> String {
    let text = WHITESPACE_RE.replace_all(text.trim(), " ");
    let text = SPACE_BEFORE_SYMBOL_RE.replace_all(&text, "$1$2");
    let text = SPACE_AFTER_SYMBOL_RE.replace_all(&text, "$1$2");
    let text = SPACE_BETWEEN_SYMBOLS_RE.replace_all(&text, "$1$2");
    text.into_owned()
}

/// Selects overloads by parameter types, written as `name(T1, T2)`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParameterTypeMatcher {
    pub(crate) name: String,
    arg_types: Option<Vec<String>>,
}

impl ParameterTypeMatcher {
    pub(crate) fn parse(spec: &str) -> Self {
        match (spec.find('('), spec.rfind(')')) {
            (Some(start), Some(end)) if start < end => Self {
                name: normalize(&spec[..start]),
                arg_types: Some(split_args(&spec[start + 1..end])),
            },
            _ => Self {
                name: spec.to_owned(),
                arg_types: None,
            },
        }
    }

    pub(crate) fn matches(&self, element: &ReferableElement) -> bool {
        let Some(arg_types) = &self.arg_types else {
            return true;
        };
        arg_types.len() == element.params.len()
            && arg_types
                .iter()
                .zip(&element.params)
                .all(|(expected, param)| normalize(&param.ty.to_string()) == *expected)
    }
}

fn split_args(spec: &str) -> Vec<String> {
    if spec.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut nested = 0_i32;
    let mut start = 0;
    for (i, c) in spec.char_indices() {
        match c {
            '(' | '{' | '[' | '<' => nested += 1,
            ')' | '}' | ']' | '>' => nested -= 1,
            ',' if nested == 0 => {
                args.push(normalize(&spec[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(normalize(&spec[start..]));
    args
}
