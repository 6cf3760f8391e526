//! Symbol records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbol that can be inserted into documents and linked to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferableElement {
    /// Stable anchor id. Elements without id cannot be linked to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Short name.
    pub name: String,
    /// Name including all enclosing namespaces.
    pub full_name: String,
    /// Language tag (`cpp`, `java`, ...).
    pub language: String,
    /// Kind of symbol (`class`, `function`, ...).
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Protection level (`public`, `protected`, `private`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prot: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub brief: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Parameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<ThrowsClause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ReferableElement>,
}

impl ReferableElement {
    /// Human readable identification used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}: {}", self.language, self.full_name)
    }
}

/// Reference to a type, optionally linkable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Text before the name, e.g. `const `.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Text after the name, e.g. `&`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.name, self.suffix)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowsClause {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_minimal_element() {
        let element: ReferableElement =
            serde_json::from_str(r#"{"name": "Foo", "language": "cpp"}"#).unwrap();
        assert_eq!(element.name, "Foo");
        assert_eq!(element.id, None);
        assert!(element.members.is_empty());
    }

    #[test]
    fn test_deserialize_parameter_type() {
        let param: Parameter = serde_json::from_str(
            r#"{"name": "value", "type": {"name": "string", "prefix": "const std::", "suffix": "&"}}"#,
        )
        .unwrap();
        assert_eq!(param.ty.to_string(), "const std::string&");
    }

    #[test]
    fn test_describe() {
        let element = ReferableElement {
            language: "java".to_owned(),
            full_name: "com.example.Logger".to_owned(),
            ..Default::default()
        };
        assert_eq!(element.describe(), "java: com.example.Logger");
    }
}
