//! Rendering of inserted elements.
//!
//! The processor treats rendering as a black box behind [`TemplateRenderer`].
//! [`TemplateSet`] is the bundled implementation: AsciiDoc output for the
//! common kinds of every supported language, optionally overridden per
//! language and kind by user templates.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use xd_reference::{ReferableElement, TypeRef};

use crate::EngineError;
use crate::filter::InsertionFilter;

/// Callbacks available to a renderer while rendering one element.
pub trait RenderScope {
    /// Record that a nested element is rendered as part of the insertion.
    fn inserted(&mut self, element: &ReferableElement) -> Result<(), EngineError>;

    /// Markup for a reference to the element with `id`.
    ///
    /// Falls back to `text` when the element cannot be linked.
    fn link(&mut self, id: &str, text: &str) -> Result<String, EngineError>;

    /// User-defined environment values.
    fn environment(&self) -> &BTreeMap<String, String>;
}

/// What to render.
#[derive(Clone, Copy, Debug)]
pub struct RenderRequest<'a> {
    pub element: &'a ReferableElement,
    /// Kind whose template is used; usually the element's own kind.
    pub kind: &'a str,
    pub filter: &'a InsertionFilter,
}

/// Turns an element into document text.
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        request: &RenderRequest<'_>,
        scope: &mut dyn RenderScope,
    ) -> Result<String, EngineError>;
}

const BUILTIN_LANGUAGES: [&str; 7] = ["cpp", "c", "java", "kotlin", "objc", "swift", "python"];

const BUILTIN_KINDS: [&str; 16] = [
    "class",
    "struct",
    "union",
    "interface",
    "protocol",
    "enum",
    "namespace",
    "exception",
    "function",
    "variable",
    "property",
    "typedef",
    "typealias",
    "define",
    "enumvalue",
    "block",
];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").unwrap());

/// Bundled templates plus user templates loaded once per run.
#[derive(Debug, Default)]
pub struct TemplateSet {
    /// User templates keyed by (language, kind).
    user: HashMap<(String, String), String>,
}

impl TemplateSet {
    /// Only the bundled templates.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Bundled templates overridden by `<dir>/<lang>/<kind>.adoc` files.
    pub fn load(dir: &Path) -> Result<Self, EngineError> {
        let io_error = |path: &Path| {
            let path = path.to_owned();
            move |source| EngineError::Io { path, source }
        };

        let mut user = HashMap::new();
        for lang_entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
            let lang_dir = lang_entry.map_err(io_error(dir))?.path();
            if !lang_dir.is_dir() {
                continue;
            }
            let Some(lang) = lang_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let lang = lang.to_owned();

            for kind_entry in std::fs::read_dir(&lang_dir).map_err(io_error(&lang_dir))? {
                let path = kind_entry.map_err(io_error(&lang_dir))?.path();
                if path.extension().is_none_or(|ext| ext != "adoc") {
                    continue;
                }
                let Some(kind) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let text = std::fs::read_to_string(&path).map_err(io_error(&path))?;
                tracing::debug!(lang = %lang, kind, "Loaded user template");
                user.insert((lang.clone(), kind.to_owned()), text);
            }
        }
        Ok(Self { user })
    }

    #[must_use]
    pub fn has_template(&self, lang: &str, kind: &str) -> bool {
        self.user.contains_key(&(lang.to_owned(), kind.to_owned()))
            || (BUILTIN_LANGUAGES.contains(&lang) && BUILTIN_KINDS.contains(&kind))
    }

    fn render_user(
        template: &str,
        request: &RenderRequest<'_>,
        scope: &mut dyn RenderScope,
    ) -> Result<String, EngineError> {
        let element = request.element;
        let members = if PLACEHOLDER_RE
            .captures_iter(template)
            .any(|c| &c[1] == "members")
        {
            render_members(request, scope)?
        } else {
            String::new()
        };

        let env = scope.environment();
        let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match key {
                "id" => element.id.clone().unwrap_or_default(),
                "name" => element.name.clone(),
                "full_name" => element.full_name.clone(),
                "kind" => element.kind.clone(),
                "language" => element.language.clone(),
                "namespace" => element.namespace.clone().unwrap_or_default(),
                "brief" => element.brief.clone(),
                "description" => element.description.clone(),
                "members" => members.clone(),
                _ => {
                    if let Some(value) = key.strip_prefix("env.").and_then(|k| env.get(k)) {
                        value.clone()
                    } else {
                        tracing::warn!(placeholder = key, "Unknown template placeholder");
                        String::new()
                    }
                }
            }
        });
        Ok(rendered.into_owned())
    }
}

impl TemplateRenderer for TemplateSet {
    fn render(
        &self,
        request: &RenderRequest<'_>,
        scope: &mut dyn RenderScope,
    ) -> Result<String, EngineError> {
        let lang = request.element.language.as_str();
        if let Some(template) = self.user.get(&(lang.to_owned(), request.kind.to_owned())) {
            return Self::render_user(template, request, scope);
        }
        if !self.has_template(lang, request.kind) {
            return Err(EngineError::TemplateMissing {
                lang: lang.to_owned(),
                kind: request.kind.to_owned(),
            });
        }
        render_builtin(request, scope)
    }
}

fn render_builtin(
    request: &RenderRequest<'_>,
    scope: &mut dyn RenderScope,
) -> Result<String, EngineError> {
    let element = request.element;
    let mut out = String::new();

    push_anchor(&mut out, element);
    let _ = writeln!(out, "== {}", element.full_name);
    out.push('\n');
    render_body(&mut out, element, request.filter, scope)?;

    let members = render_members(request, scope)?;
    if !members.is_empty() {
        out.push_str(&members);
    }
    Ok(out)
}

fn render_members(
    request: &RenderRequest<'_>,
    scope: &mut dyn RenderScope,
) -> Result<String, EngineError> {
    let mut out = String::new();
    for member in request.filter.members(request.element) {
        scope.inserted(member)?;
        push_anchor(&mut out, member);
        let _ = writeln!(out, "=== {}", member.name);
        out.push('\n');
        render_body(&mut out, member, request.filter, scope)?;
    }
    Ok(out)
}

fn push_anchor(out: &mut String, element: &ReferableElement) {
    if let Some(id) = &element.id {
        let reftext = element.full_name.replace('\'', "\\'");
        let _ = writeln!(out, "[#{id},reftext='{reftext}']");
    }
}

fn render_body(
    out: &mut String,
    element: &ReferableElement,
    filter: &InsertionFilter,
    scope: &mut dyn RenderScope,
) -> Result<(), EngineError> {
    if is_callable(element) {
        let mut params = Vec::with_capacity(element.params.len());
        for param in &element.params {
            let ty = type_markup(&param.ty, scope)?;
            params.push(if param.name.is_empty() {
                ty
            } else {
                format!("{ty} {}", param.name)
            });
        }
        let returns = match &element.returns {
            Some(ty) => format!("{} ", type_markup(ty, scope)?),
            None => String::new(),
        };
        let _ = writeln!(out, "{returns}*{}*({})", element.name, params.join(", "));
        out.push('\n');
    } else if let Some(ty) = &element.returns {
        let _ = writeln!(out, "{} *{}*", type_markup(ty, scope)?, element.name);
        out.push('\n');
    }

    for text in [&element.brief, &element.description] {
        if !text.trim().is_empty() {
            out.push_str(text.trim());
            out.push_str("\n\n");
        }
    }

    let documented: Vec<_> = element
        .params
        .iter()
        .filter(|p| !p.description.trim().is_empty())
        .collect();
    if !documented.is_empty() {
        out.push_str("Parameters::\n");
        for param in documented {
            let _ = writeln!(out, "`{}`::: {}", param.name, param.description.trim());
        }
        out.push('\n');
    }

    let exceptions: Vec<_> = filter.exceptions(element).collect();
    if !exceptions.is_empty() {
        out.push_str("Throws::\n");
        for clause in exceptions {
            let ty = type_markup(&clause.ty, scope)?;
            let _ = writeln!(out, "{ty}::: {}", clause.description.trim());
        }
        out.push('\n');
    }
    Ok(())
}

fn is_callable(element: &ReferableElement) -> bool {
    matches!(element.kind.as_str(), "function" | "define" | "block")
}

fn type_markup(ty: &TypeRef, scope: &mut dyn RenderScope) -> Result<String, EngineError> {
    let name = match &ty.id {
        Some(id) => scope.link(id, &ty.name)?,
        None => ty.name.clone(),
    };
    Ok(format!("{}{name}{}", ty.prefix, ty.suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use xd_reference::{Parameter, ThrowsClause};

    #[derive(Default)]
    struct RecordingScope {
        inserted: Vec<String>,
        linked: Vec<String>,
        env: BTreeMap<String, String>,
    }

    impl RenderScope for RecordingScope {
        fn inserted(&mut self, element: &ReferableElement) -> Result<(), EngineError> {
            self.inserted.push(element.full_name.clone());
            Ok(())
        }

        fn link(&mut self, id: &str, text: &str) -> Result<String, EngineError> {
            self.linked.push(id.to_owned());
            Ok(format!("xref:{id}[++{text}++]"))
        }

        fn environment(&self) -> &BTreeMap<String, String> {
            &self.env
        }
    }

    fn type_ref(name: &str, id: Option<&str>) -> TypeRef {
        TypeRef {
            id: id.map(str::to_owned),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    fn logger() -> ReferableElement {
        ReferableElement {
            id: Some("cpp-logger".to_owned()),
            name: "Logger".to_owned(),
            full_name: "log::Logger".to_owned(),
            language: "cpp".to_owned(),
            kind: "class".to_owned(),
            brief: "Writes log lines.".to_owned(),
            members: vec![
                ReferableElement {
                    id: Some("cpp-logger-write".to_owned()),
                    name: "Write".to_owned(),
                    full_name: "log::Logger::Write".to_owned(),
                    language: "cpp".to_owned(),
                    kind: "function".to_owned(),
                    returns: Some(type_ref("bool", None)),
                    params: vec![Parameter {
                        name: "level".to_owned(),
                        ty: type_ref("Level", Some("cpp-level")),
                        description: "Severity.".to_owned(),
                    }],
                    exceptions: vec![ThrowsClause {
                        ty: type_ref("IoError", Some("cpp-ioerror")),
                        description: "On failure.".to_owned(),
                    }],
                    ..Default::default()
                },
                ReferableElement {
                    id: Some("cpp-logger-impl".to_owned()),
                    name: "_impl".to_owned(),
                    full_name: "log::Logger::_impl".to_owned(),
                    language: "cpp".to_owned(),
                    kind: "variable".to_owned(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn render(set: &TemplateSet, element: &ReferableElement, filter: &InsertionFilter) -> (String, RecordingScope) {
        let mut scope = RecordingScope::default();
        let request = RenderRequest {
            element,
            kind: &element.kind,
            filter,
        };
        let text = set.render(&request, &mut scope).unwrap();
        (text, scope)
    }

    #[test]
    fn test_builtin_class() {
        let filter = InsertionFilter::default();
        let (text, scope) = render(&TemplateSet::builtin(), &logger(), &filter);

        assert!(text.starts_with("[#cpp-logger,reftext='log::Logger']\n== log::Logger\n"));
        assert!(text.contains("Writes log lines."));
        assert!(text.contains("[#cpp-logger-write,reftext='log::Logger::Write']\n=== Write\n"));
        assert!(text.contains("bool *Write*(xref:cpp-level[++Level++] level)"));
        assert!(text.contains("`level`::: Severity."));
        assert!(text.contains("xref:cpp-ioerror[++IoError++]::: On failure."));
        assert_eq!(
            scope.inserted,
            vec!["log::Logger::Write", "log::Logger::_impl"]
        );
        assert_eq!(scope.linked, vec!["cpp-level", "cpp-ioerror"]);
    }

    #[test]
    fn test_builtin_applies_filter() {
        let filter = InsertionFilter::new(
            Some(crate::filter::FilterSpec::Single("-_".to_owned())),
            Some(crate::filter::FilterSpec::Single("NONE".to_owned())),
        )
        .unwrap();
        let (text, scope) = render(&TemplateSet::builtin(), &logger(), &filter);

        assert!(!text.contains("_impl"));
        assert!(!text.contains("Throws::"));
        assert_eq!(scope.inserted, vec!["log::Logger::Write"]);
    }

    #[test]
    fn test_missing_template() {
        let element = ReferableElement {
            language: "cobol".to_owned(),
            kind: "class".to_owned(),
            ..Default::default()
        };
        let filter = InsertionFilter::default();
        let request = RenderRequest {
            element: &element,
            kind: "class",
            filter: &filter,
        };
        let err = TemplateSet::builtin()
            .render(&request, &mut RecordingScope::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "There is no template to render a class for cobol");
    }

    #[test]
    fn test_user_template_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cpp")).unwrap();
        std::fs::write(
            dir.path().join("cpp/class.adoc"),
            "== {{ full_name }} ({{env.product}})\n{{brief}}\n{{members}}{{unknown}}",
        )
        .unwrap();
        std::fs::write(dir.path().join("cpp/notes.txt"), "ignored").unwrap();

        let set = TemplateSet::load(dir.path()).unwrap();
        assert!(set.has_template("cpp", "class"));
        assert!(!set.has_template("cpp", "notes"));

        let element = logger();
        let filter = InsertionFilter::default();
        let mut scope = RecordingScope::default();
        scope.env.insert("product".to_owned(), "Acme".to_owned());
        let request = RenderRequest {
            element: &element,
            kind: "class",
            filter: &filter,
        };
        let text = set.render(&request, &mut scope).unwrap();

        assert!(text.starts_with("== log::Logger (Acme)\nWrites log lines.\n"));
        assert!(text.contains("=== Write"));
        assert_eq!(scope.inserted.len(), 2);
    }

    #[test]
    fn test_user_template_for_new_language() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cobol")).unwrap();
        std::fs::write(dir.path().join("cobol/program.adoc"), "PROGRAM {{name}}").unwrap();

        let set = TemplateSet::load(dir.path()).unwrap();
        let element = ReferableElement {
            name: "PAYROLL".to_owned(),
            language: "cobol".to_owned(),
            kind: "program".to_owned(),
            ..Default::default()
        };
        let (text, _) = render(&set, &element, &InsertionFilter::default());
        assert_eq!(text, "PROGRAM PAYROLL");
    }
}
