//! Selection of members and exceptions for insertion.
//!
//! A filter specification is a string, a list of strings, or a mapping from
//! property name to either of those. It compiles into one rule chain per
//! property:
//!
//! - `ALL` includes everything, `NONE` excludes everything
//! - `pattern` or `+pattern` includes names matching the regex
//! - `-pattern` excludes names matching the regex
//!
//! The last matching rule wins. A chain starting with an include pattern
//! gets an implicit `NONE` in front, one starting with an exclude pattern an
//! implicit `ALL`. Patterns are matched at the start of the value.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::Deserialize;
use xd_reference::{ReferableElement, ThrowsClause};

use crate::EngineError;

/// Properties of a member that can be filtered on.
const MEMBER_PROPERTIES: [&str; 3] = ["name", "kind", "prot"];
/// Properties of an exception that can be filtered on.
const EXCEPTION_PROPERTIES: [&str; 1] = ["name"];

/// Rules for one property.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RuleList {
    Single(String),
    List(Vec<String>),
}

impl RuleList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(rule) => vec![rule],
            Self::List(rules) => rules,
        }
    }
}

/// Filter specification as written in configuration or commands.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FilterSpec {
    /// Rules for the name property.
    Single(String),
    /// Rules for the name property.
    List(Vec<String>),
    /// Rules per property.
    Map(BTreeMap<String, RuleList>),
}

impl FilterSpec {
    /// Normalize into raw rules per property.
    fn into_properties(self) -> BTreeMap<String, Vec<String>> {
        match self {
            Self::Single(rule) => BTreeMap::from([("name".to_owned(), vec![rule])]),
            Self::List(rules) => BTreeMap::from([("name".to_owned(), rules)]),
            Self::Map(map) => map
                .into_iter()
                .map(|(property, rules)| (property, rules.into_vec()))
                .collect(),
        }
    }
}

/// Outcome of a single rule for a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Include,
    Exclude,
    Neutral,
}

/// One compiled rule.
#[derive(Clone, Debug)]
pub enum Rule {
    All,
    None,
    Include(Regex),
    Exclude(Regex),
}

impl Rule {
    fn parse(text: &str) -> Result<Self, EngineError> {
        let text = text.trim();
        let compile = |pattern: &str| {
            Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
                EngineError::InvalidApiCall(format!("invalid filter pattern `{pattern}`: {e}"))
            })
        };
        match text {
            "ALL" => Ok(Self::All),
            "NONE" => Ok(Self::None),
            _ => {
                if let Some(pattern) = text.strip_prefix('-') {
                    Ok(Self::Exclude(compile(pattern)?))
                } else {
                    Ok(Self::Include(compile(text.strip_prefix('+').unwrap_or(text))?))
                }
            }
        }
    }

    fn apply(&self, value: &str) -> Action {
        match self {
            Self::All => Action::Include,
            Self::None => Action::Exclude,
            Self::Include(re) if re.is_match(value) => Action::Include,
            Self::Exclude(re) if re.is_match(value) => Action::Exclude,
            Self::Include(_) | Self::Exclude(_) => Action::Neutral,
        }
    }

    fn pattern(re: &Regex) -> &str {
        let text = re.as_str();
        text.strip_prefix("^(?:")
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(text)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::None => f.write_str("NONE"),
            Self::Include(re) => write!(f, "+{}", Self::pattern(re)),
            Self::Exclude(re) => write!(f, "-{}", Self::pattern(re)),
        }
    }
}

/// Ordered rules for one property, including the implicit default.
#[derive(Clone, Debug)]
pub struct RuleChain {
    rules: Vec<Rule>,
}

impl RuleChain {
    pub fn compile(rules: &[String]) -> Result<Self, EngineError> {
        let mut compiled = Vec::with_capacity(rules.len() + 1);
        for rule in rules {
            compiled.push(Rule::parse(rule)?);
        }
        match compiled.first() {
            Some(Rule::Include(_)) => compiled.insert(0, Rule::None),
            Some(Rule::Exclude(_)) => compiled.insert(0, Rule::All),
            _ => {}
        }
        Ok(Self { rules: compiled })
    }

    /// Whether the value is not excluded.
    pub fn passes(&self, value: &str) -> bool {
        self.rules
            .iter()
            .map(|rule| rule.apply(value))
            .filter(|action| *action != Action::Neutral)
            .last()
            != Some(Action::Exclude)
    }

    /// The compiled rules, as text.
    pub fn rules(&self) -> Vec<String> {
        self.rules.iter().map(ToString::to_string).collect()
    }
}

/// Rule chains for a fixed set of properties.
#[derive(Clone, Debug, Default)]
pub struct PropertyFilter {
    raw: BTreeMap<String, Vec<String>>,
    chains: BTreeMap<String, RuleChain>,
}

impl PropertyFilter {
    fn new(spec: FilterSpec, allowed: &[&str]) -> Result<Self, EngineError> {
        Self::from_raw(spec.into_properties(), allowed)
    }

    fn from_raw(raw: BTreeMap<String, Vec<String>>, allowed: &[&str]) -> Result<Self, EngineError> {
        let mut chains = BTreeMap::new();
        for (property, rules) in &raw {
            if !allowed.contains(&property.as_str()) {
                return Err(EngineError::InvalidApiCall(format!(
                    "cannot filter on `{property}`, expected one of: {}",
                    allowed.join(", ")
                )));
            }
            chains.insert(property.clone(), RuleChain::compile(rules)?);
        }
        Ok(Self { raw, chains })
    }

    fn extend(&self, other: &Self, allowed: &[&str]) -> Result<Self, EngineError> {
        let mut raw = self.raw.clone();
        for (property, rules) in &other.raw {
            raw.entry(property.clone())
                .or_default()
                .extend(rules.iter().cloned());
        }
        Self::from_raw(raw, allowed)
    }

    fn passes(&self, property: &str, value: &str) -> bool {
        self.chains
            .get(property)
            .is_none_or(|chain| chain.passes(value))
    }

    /// Compiled chain for a property, if any rules were given.
    pub fn chain(&self, property: &str) -> Option<&RuleChain> {
        self.chains.get(property)
    }
}

/// Member and exception filters applied when inserting an element.
#[derive(Clone, Debug, Default)]
pub struct InsertionFilter {
    members: PropertyFilter,
    exceptions: PropertyFilter,
}

impl InsertionFilter {
    pub fn new(
        members: Option<FilterSpec>,
        exceptions: Option<FilterSpec>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            members: members
                .map(|spec| PropertyFilter::new(spec, &MEMBER_PROPERTIES))
                .transpose()?
                .unwrap_or_default(),
            exceptions: exceptions
                .map(|spec| PropertyFilter::new(spec, &EXCEPTION_PROPERTIES))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Combine with more specific rules, which are evaluated after ours.
    pub fn extend(&self, local: &Self) -> Result<Self, EngineError> {
        Ok(Self {
            members: self.members.extend(&local.members, &MEMBER_PROPERTIES)?,
            exceptions: self
                .exceptions
                .extend(&local.exceptions, &EXCEPTION_PROPERTIES)?,
        })
    }

    pub fn member_passes(&self, member: &ReferableElement) -> bool {
        self.members.passes("name", &member.name)
            && self.members.passes("kind", &member.kind)
            && self
                .members
                .passes("prot", member.prot.as_deref().unwrap_or_default())
    }

    pub fn exception_passes(&self, clause: &ThrowsClause) -> bool {
        self.exceptions.passes("name", &clause.ty.name)
    }

    /// Members of an element that pass the filter.
    pub fn members<'e>(
        &self,
        element: &'e ReferableElement,
    ) -> impl Iterator<Item = &'e ReferableElement> {
        element.members.iter().filter(|m| self.member_passes(m))
    }

    /// Exceptions of an element that pass the filter.
    pub fn exceptions<'e>(
        &self,
        element: &'e ReferableElement,
    ) -> impl Iterator<Item = &'e ThrowsClause> {
        element
            .exceptions
            .iter()
            .filter(|c| self.exception_passes(c))
    }

    pub fn member_rules(&self) -> &PropertyFilter {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use xd_reference::TypeRef;

    const FRUIT: [&str; 9] = [
        "",
        "Apple",
        "Banana",
        "AppleTree",
        "BananaTree",
        "Strawberry",
        "StrawberryDaiquiri",
        "AppleJuice",
        "BananaJuice",
    ];

    fn chain(rules: &[&str]) -> RuleChain {
        let rules: Vec<String> = rules.iter().map(|r| (*r).to_owned()).collect();
        RuleChain::compile(&rules).unwrap()
    }

    fn passing(rules: &[&str]) -> Vec<&'static str> {
        let chain = chain(rules);
        let mut result: Vec<&str> = FRUIT.iter().copied().filter(|f| chain.passes(f)).collect();
        result.sort_unstable();
        result
    }

    fn sorted(mut values: Vec<&'static str>) -> Vec<&'static str> {
        values.sort_unstable();
        values
    }

    fn member(name: &str, kind: &str, prot: &str) -> ReferableElement {
        ReferableElement {
            name: name.to_owned(),
            full_name: format!("MyClass::{name}"),
            kind: kind.to_owned(),
            prot: Some(prot.to_owned()),
            ..Default::default()
        }
    }

    fn my_class() -> ReferableElement {
        ReferableElement {
            name: "MyClass".to_owned(),
            full_name: "MyClass".to_owned(),
            kind: "class".to_owned(),
            members: vec![
                member("PublicVariable", "variable", "public"),
                member("PublicMethod", "function", "public"),
                member("ProtectedVariable", "variable", "protected"),
                member("_PrivateMethod", "function", "private"),
            ],
            exceptions: vec![
                ThrowsClause {
                    ty: TypeRef {
                        name: "std::runtime_error".to_owned(),
                        ..Default::default()
                    },
                    description: String::new(),
                },
                ThrowsClause {
                    ty: TypeRef {
                        name: "MyError".to_owned(),
                        ..Default::default()
                    },
                    description: String::new(),
                },
            ],
            ..Default::default()
        }
    }

    fn member_names(filter: &InsertionFilter) -> Vec<String> {
        filter
            .members(&my_class())
            .map(|m| m.name.clone())
            .collect()
    }

    #[test]
    fn test_exclude_compiles_with_implicit_all() {
        assert_eq!(chain(&["-Foo"]).rules(), vec!["ALL", "-Foo"]);
    }

    #[test]
    fn test_include_compiles_with_implicit_none() {
        assert_eq!(chain(&["Foo"]).rules(), vec!["NONE", "+Foo"]);
        assert_eq!(chain(&["+Foo"]).rules(), vec!["NONE", "+Foo"]);
    }

    #[test]
    fn test_explicit_keywords_get_no_default() {
        assert_eq!(chain(&["NONE", "ALL"]).rules(), vec!["NONE", "ALL"]);
    }

    #[test]
    fn test_none_then_all_includes_everything() {
        assert_eq!(passing(&["NONE", "ALL"]), sorted(FRUIT.to_vec()));
    }

    #[test]
    fn test_all_then_none_excludes_everything() {
        assert!(passing(&["ALL", "NONE"]).is_empty());
    }

    #[test]
    fn test_empty_chain_includes_everything() {
        assert_eq!(passing(&[]), sorted(FRUIT.to_vec()));
    }

    #[test]
    fn test_implicit_none() {
        assert_eq!(passing(&["+.*Tree"]), vec!["AppleTree", "BananaTree"]);
        assert_eq!(passing(&[".*Daiquiri"]), vec!["StrawberryDaiquiri"]);
    }

    #[test]
    fn test_patterns_match_at_start() {
        assert_eq!(
            passing(&["-Banana"]),
            sorted(vec![
                "",
                "Apple",
                "AppleTree",
                "AppleJuice",
                "Strawberry",
                "StrawberryDaiquiri"
            ])
        );
    }

    #[test]
    fn test_last_match_wins() {
        assert_eq!(
            passing(&["-.*Banana", "+.*Juice"]),
            sorted(vec![
                "",
                "Apple",
                "AppleJuice",
                "AppleTree",
                "BananaJuice",
                "Strawberry",
                "StrawberryDaiquiri"
            ])
        );
        assert_eq!(passing(&["+.*Tree", "-Banana"]), vec!["AppleTree"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = RuleChain::compile(&["+(unclosed".to_owned()]);
        assert!(matches!(result, Err(EngineError::InvalidApiCall(_))));
    }

    #[test]
    fn test_member_filter_by_name() {
        let filter = InsertionFilter::new(Some(FilterSpec::Single("-_".to_owned())), None).unwrap();
        assert_eq!(
            member_names(&filter),
            vec!["PublicVariable", "PublicMethod", "ProtectedVariable"]
        );
    }

    #[test]
    fn test_member_filter_by_kind_and_prot() {
        let spec = FilterSpec::Map(BTreeMap::from([
            ("kind".to_owned(), RuleList::Single("variable".to_owned())),
            (
                "prot".to_owned(),
                RuleList::List(vec!["ALL".to_owned(), "-protected".to_owned()]),
            ),
        ]));
        let filter = InsertionFilter::new(Some(spec), None).unwrap();
        assert_eq!(member_names(&filter), vec!["PublicVariable"]);
    }

    #[test]
    fn test_unknown_property() {
        let spec = FilterSpec::Map(BTreeMap::from([(
            "colour".to_owned(),
            RuleList::Single("red".to_owned()),
        )]));
        assert!(matches!(
            InsertionFilter::new(Some(spec.clone()), None),
            Err(EngineError::InvalidApiCall(_))
        ));
        assert!(InsertionFilter::new(None, Some(spec)).is_err());
    }

    #[test]
    fn test_exception_filter() {
        let spec = FilterSpec::List(vec!["ALL".to_owned(), "-std::.*".to_owned()]);
        let filter = InsertionFilter::new(None, Some(spec)).unwrap();
        let element = my_class();
        let names: Vec<&str> = filter
            .exceptions(&element)
            .map(|c| c.ty.name.as_str())
            .collect();
        assert_eq!(names, vec!["MyError"]);
    }

    #[test]
    fn test_extend_concatenates_rules() {
        let global = InsertionFilter::new(Some(FilterSpec::Single("NONE".to_owned())), None).unwrap();
        let local = InsertionFilter::new(Some(FilterSpec::Single("ALL".to_owned())), None).unwrap();
        let combined = global.extend(&local).unwrap();
        assert_eq!(
            combined.member_rules().chain("name").unwrap().rules(),
            vec!["NONE", "ALL"]
        );
        assert_eq!(member_names(&combined).len(), 4);
    }

    #[test]
    fn test_extend_default_follows_combined_first_rule() {
        let global = InsertionFilter::new(Some(FilterSpec::Single("-_".to_owned())), None).unwrap();
        let local =
            InsertionFilter::new(Some(FilterSpec::Single("+Public".to_owned())), None).unwrap();
        let combined = global.extend(&local).unwrap();
        assert_eq!(
            combined.member_rules().chain("name").unwrap().rules(),
            vec!["ALL", "-_", "+Public"]
        );
    }

    #[test]
    fn test_extend_merges_properties() {
        let global = InsertionFilter::new(Some(FilterSpec::Single("-_".to_owned())), None).unwrap();
        let local = InsertionFilter::new(
            Some(FilterSpec::Map(BTreeMap::from([(
                "kind".to_owned(),
                RuleList::Single("function".to_owned()),
            )]))),
            None,
        )
        .unwrap();
        let combined = global.extend(&local).unwrap();
        assert_eq!(member_names(&combined), vec!["PublicMethod"]);
    }

    #[test]
    fn test_extend_does_not_change_original() {
        let global = InsertionFilter::new(Some(FilterSpec::Single("-_".to_owned())), None).unwrap();
        let local = InsertionFilter::new(Some(FilterSpec::Single("NONE".to_owned())), None).unwrap();
        let _combined = global.extend(&local).unwrap();
        assert_eq!(member_names(&global).len(), 3);
    }

    #[test]
    fn test_deserialize_spec_forms() {
        let single: FilterSpec = serde_json::from_str(r#""-_""#).unwrap();
        assert_eq!(single, FilterSpec::Single("-_".to_owned()));

        let list: FilterSpec = serde_json::from_str(r#"["NONE", "Get"]"#).unwrap();
        assert_eq!(list, FilterSpec::List(vec!["NONE".to_owned(), "Get".to_owned()]));

        let map: FilterSpec = serde_json::from_str(r#"{"kind": "function", "prot": ["-private"]}"#).unwrap();
        assert!(matches!(map, FilterSpec::Map(m) if m.len() == 2));
    }
}
