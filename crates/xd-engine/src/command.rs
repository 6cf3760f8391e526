//! Typed commands parsed from directives.

use std::collections::BTreeMap;

use crate::EngineError;
use crate::directive::{DirectiveArgs, ParsedDirective};
use crate::filter::{FilterSpec, RuleList};

/// Arguments of `insert`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct InsertArgs {
    pub name: String,
    pub kind: Option<String>,
    pub lang: Option<String>,
    pub members: Option<FilterSpec>,
    pub exceptions: Option<FilterSpec>,
    pub ignore_global_filter: bool,
    pub leveloffset: String,
    /// Render with the template of another kind.
    pub template: Option<String>,
    /// Passed on as attributes of the generated include.
    pub extra: BTreeMap<String, String>,
}

/// Arguments of `link`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LinkArgs {
    pub name: String,
    pub kind: Option<String>,
    pub lang: Option<String>,
    pub text: Option<String>,
    pub full_name: bool,
    pub allow_overloads: bool,
}

/// Arguments of `include`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct IncludeArgs {
    pub file: String,
    pub package: Option<String>,
    pub leveloffset: String,
    pub link_text: Option<String>,
    pub link_prefix: String,
    pub multipage_link: bool,
    pub always_embed: bool,
    pub extra: BTreeMap<String, String>,
}

/// Arguments of `cross_document_ref`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CrossDocumentRefArgs {
    pub file: Option<String>,
    pub package: Option<String>,
    pub anchor: Option<String>,
    pub link_text: Option<String>,
}

/// A command embedded in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Filter {
        members: Option<FilterSpec>,
        exceptions: Option<FilterSpec>,
    },
    Insert(InsertArgs),
    Link(LinkArgs),
    Include(IncludeArgs),
    Language {
        lang: Option<String>,
        source: Option<String>,
    },
    Namespace(Option<String>),
    CrossDocumentRef(CrossDocumentRefArgs),
    Anchor {
        name: String,
        link_text: Option<String>,
    },
    RequireVersion(String),
    MultipageToc {
        side: String,
    },
}

impl Command {
    /// Parse a directive into a command.
    ///
    /// Returns `None` for directives that are not commands.
    pub(crate) fn parse(directive: &ParsedDirective) -> Option<Result<Self, EngineError>> {
        let name = directive.name.as_str();
        let mut args = ArgReader::new(name, directive.args.clone());
        let command = match name {
            "filter" => Self::parse_filter(&mut args),
            "insert" => Self::parse_insert(&mut args),
            "link" => Self::parse_link(&mut args),
            "include" => Self::parse_include(&mut args),
            "language" => Ok(Self::Language {
                lang: args.content(),
                source: args.string("source"),
            }),
            "namespace" => Ok(Self::Namespace(args.content())),
            "cross_document_ref" => Ok(Self::CrossDocumentRef(CrossDocumentRefArgs {
                file: args.content(),
                package: args.string("package"),
                anchor: args.string("anchor"),
                link_text: args.string("link_text"),
            })),
            "anchor" => Ok(Self::Anchor {
                name: args.content().unwrap_or_default(),
                link_text: args.string("link_text"),
            }),
            "require_version" => args
                .content()
                .map(Self::RequireVersion)
                .ok_or_else(|| args.error("a version specifier is required")),
            "multipage_toc" => Ok(Self::MultipageToc {
                side: args.string("side").unwrap_or_else(|| "left".to_owned()),
            }),
            _ => return None,
        };
        Some(command.and_then(|command| args.finish().map(|()| command)))
    }

    fn parse_filter(args: &mut ArgReader) -> Result<Self, EngineError> {
        Ok(Self::Filter {
            members: args.filter("members"),
            exceptions: args.filter("exceptions"),
        })
    }

    fn parse_insert(args: &mut ArgReader) -> Result<Self, EngineError> {
        let name = args.required_content("a name")?;
        Ok(Self::Insert(InsertArgs {
            name,
            kind: args.string("kind"),
            lang: args.string("lang"),
            members: args.filter("members"),
            exceptions: args.filter("exceptions"),
            ignore_global_filter: args.flag("ignore_global_filter", false)?,
            leveloffset: args
                .string("leveloffset")
                .unwrap_or_else(|| "+1".to_owned()),
            template: args.string("template"),
            extra: args.rest(),
        }))
    }

    fn parse_link(args: &mut ArgReader) -> Result<Self, EngineError> {
        let name = args.required_content("a name")?;
        Ok(Self::Link(LinkArgs {
            name,
            kind: args.string("kind"),
            lang: args.string("lang"),
            text: args.string("text"),
            full_name: args.flag("full_name", false)?,
            allow_overloads: args.flag("allow_overloads", true)?,
        }))
    }

    fn parse_include(args: &mut ArgReader) -> Result<Self, EngineError> {
        let file = args.required_content("a file name")?;
        Ok(Self::Include(IncludeArgs {
            file,
            package: args.string("package"),
            leveloffset: args
                .string("leveloffset")
                .unwrap_or_else(|| "+1".to_owned()),
            link_text: args.string("link_text"),
            link_prefix: args.string("link_prefix").unwrap_or_default(),
            multipage_link: args.flag("multipage_link", true)?,
            always_embed: args.flag("always_embed", false)?,
            extra: args.rest(),
        }))
    }

    /// Short description used in command traces.
    pub(crate) fn label(directive: &ParsedDirective) -> String {
        let content = directive.args.content.trim();
        if content.is_empty() {
            directive.name.clone()
        } else {
            format!("{} {content}", directive.name)
        }
    }
}

/// Consumes directive arguments, so leftovers can be reported.
struct ArgReader {
    command: String,
    args: DirectiveArgs,
}

impl ArgReader {
    fn new(command: &str, args: DirectiveArgs) -> Self {
        Self {
            command: command.to_owned(),
            args,
        }
    }

    fn error(&self, message: &str) -> EngineError {
        EngineError::InvalidApiCall(format!("`{}`: {message}", self.command))
    }

    fn content(&mut self) -> Option<String> {
        let content = std::mem::take(&mut self.args.content);
        let content = content.trim();
        (!content.is_empty()).then(|| content.to_owned())
    }

    fn required_content(&mut self, what: &str) -> Result<String, EngineError> {
        self.content()
            .ok_or_else(|| self.error(&format!("{what} is required")))
    }

    fn string(&mut self, key: &str) -> Option<String> {
        self.args.attrs.remove(key)
    }

    fn flag(&mut self, key: &str, default: bool) -> Result<bool, EngineError> {
        if let Some(pos) = self.args.flags.iter().position(|f| f == key) {
            self.args.flags.remove(pos);
            return Ok(true);
        }
        match self.args.attrs.remove(key).as_deref() {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.error(&format!(
                "`{key}` must be true or false, not `{other}`"
            ))),
        }
    }

    /// Filter rules from `key` and `key-<property>` attributes.
    ///
    /// Rules are separated by whitespace.
    fn filter(&mut self, key: &str) -> Option<FilterSpec> {
        let split = |value: &str| -> Vec<String> {
            value.split_whitespace().map(str::to_owned).collect()
        };

        let prefix = format!("{key}-");
        let property_keys: Vec<String> = self
            .args
            .attrs
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        let base = self.args.attrs.remove(key).map(|v| split(&v));

        if property_keys.is_empty() {
            return base.map(FilterSpec::List);
        }

        let mut map = BTreeMap::new();
        if let Some(rules) = base {
            map.insert("name".to_owned(), RuleList::List(rules));
        }
        for property_key in property_keys {
            if let Some(value) = self.args.attrs.remove(&property_key) {
                map.insert(
                    property_key[prefix.len()..].to_owned(),
                    RuleList::List(split(&value)),
                );
            }
        }
        Some(FilterSpec::Map(map))
    }

    /// Take all remaining attributes.
    fn rest(&mut self) -> BTreeMap<String, String> {
        std::mem::take(&mut self.args.attrs)
    }

    fn finish(self) -> Result<(), EngineError> {
        let unknown: Vec<String> = self
            .args
            .attrs
            .keys()
            .cloned()
            .chain(self.args.flags.iter().map(|f| format!(".{f}")))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(self.error(&format!("unknown arguments: {}", unknown.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn parse(name: &str, content: &str, attrs: &str) -> Option<Result<Command, EngineError>> {
        Command::parse(&ParsedDirective {
            name: name.to_owned(),
            args: DirectiveArgs::parse(content, attrs),
            leaf: true,
        })
    }

    fn command(name: &str, content: &str, attrs: &str) -> Command {
        parse(name, content, attrs).unwrap().unwrap()
    }

    fn error(name: &str, content: &str, attrs: &str) -> String {
        parse(name, content, attrs).unwrap().unwrap_err().to_string()
    }

    #[test]
    fn test_unknown_directive_is_not_a_command() {
        assert!(parse("kbd", "Ctrl", "").is_none());
    }

    #[test]
    fn test_insert_defaults() {
        let Command::Insert(args) = command("insert", "log::Logger", "") else {
            panic!("expected insert");
        };
        assert_eq!(args.name, "log::Logger");
        assert_eq!(args.leveloffset, "+1");
        assert!(!args.ignore_global_filter);
        assert!(args.members.is_none());
        assert!(args.extra.is_empty());
    }

    #[test]
    fn test_insert_with_filters_and_extras() {
        let Command::Insert(args) = command(
            "insert",
            "Logger",
            r#"lang=cpp members="-^_ +Get" members-kind=function .ignore_global_filter tag=api"#,
        ) else {
            panic!("expected insert");
        };
        assert_eq!(args.lang.as_deref(), Some("cpp"));
        assert!(args.ignore_global_filter);
        assert_eq!(
            args.members,
            Some(FilterSpec::Map(BTreeMap::from([
                (
                    "kind".to_owned(),
                    RuleList::List(vec!["function".to_owned()])
                ),
                (
                    "name".to_owned(),
                    RuleList::List(vec!["-^_".to_owned(), "+Get".to_owned()])
                ),
            ])))
        );
        assert_eq!(
            args.extra,
            BTreeMap::from([("tag".to_owned(), "api".to_owned())])
        );
    }

    #[test]
    fn test_filter_list_form() {
        let Command::Filter {
            members,
            exceptions,
        } = command("filter", "", r#"members="NONE Get" exceptions=NONE"#)
        else {
            panic!("expected filter");
        };
        assert_eq!(
            members,
            Some(FilterSpec::List(vec!["NONE".to_owned(), "Get".to_owned()]))
        );
        assert_eq!(exceptions, Some(FilterSpec::List(vec!["NONE".to_owned()])));
    }

    #[test]
    fn test_link_flags() {
        let Command::Link(args) = command("link", "Logger", "allow_overloads=false .full_name")
        else {
            panic!("expected link");
        };
        assert!(!args.allow_overloads);
        assert!(args.full_name);
    }

    #[test]
    fn test_include_defaults() {
        let Command::Include(args) = command("include", "a/b.adoc", "") else {
            panic!("expected include");
        };
        assert_eq!(args.file, "a/b.adoc");
        assert_eq!(args.leveloffset, "+1");
        assert!(args.multipage_link);
        assert!(!args.always_embed);
        assert_eq!(args.link_prefix, "");
    }

    #[test]
    fn test_reset_commands() {
        assert_eq!(command("namespace", "", ""), Command::Namespace(None));
        assert_eq!(
            command("language", " ", ""),
            Command::Language {
                lang: None,
                source: None
            }
        );
    }

    #[test]
    fn test_unknown_argument() {
        assert_eq!(
            error("link", "Logger", "colour=red"),
            "Invalid API call: `link`: unknown arguments: colour"
        );
        assert_eq!(
            error("namespace", "a", ".strict"),
            "Invalid API call: `namespace`: unknown arguments: .strict"
        );
    }

    #[test]
    fn test_missing_required_content() {
        assert_eq!(
            error("insert", "", ""),
            "Invalid API call: `insert`: a name is required"
        );
        assert!(parse("require_version", "", "").unwrap().is_err());
    }

    #[test]
    fn test_invalid_flag_value() {
        assert_eq!(
            error("include", "a.adoc", "always_embed=yes"),
            "Invalid API call: `include`: `always_embed` must be true or false, not `yes`"
        );
    }

    #[test]
    fn test_label() {
        let directive = ParsedDirective {
            name: "insert".to_owned(),
            args: DirectiveArgs::parse("log::Logger", "lang=cpp"),
            leaf: true,
        };
        assert_eq!(Command::label(&directive), "insert log::Logger");
    }
}
