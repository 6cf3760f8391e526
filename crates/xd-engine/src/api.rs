//! Commands available to documents.
//!
//! Every command runs in both passes and branches on [`Phase`]: discovery
//! builds the document tree and the registries, generation produces text.

use std::collections::BTreeMap;
use std::path::Path;

use xd_document::{DocId, relative_path, resolve_relative, top_anchor};
use xd_reference::{ReferableElement, safe_language_tag, transcoder};

use crate::command::{Command, CrossDocumentRefArgs, IncludeArgs, InsertArgs, LinkArgs};
use crate::context::{Context, Phase};
use crate::filter::{FilterSpec, InsertionFilter};
use crate::links::output_file;
use crate::navigation;
use crate::packages::PackageError;
use crate::render::RenderRequest;
use crate::version::{VERSION, check_version};
use crate::{ConsistencyError, EngineError};

impl Context<'_> {
    pub(crate) fn run_command(&mut self, command: Command) -> Result<String, EngineError> {
        match command {
            Command::Filter {
                members,
                exceptions,
            } => self.filter(members, exceptions),
            Command::Insert(args) => self.insert_fragment(args),
            Command::Link(args) => self.link(args),
            Command::Include(args) => self.include(args),
            Command::Language { lang, source } => self.language(lang, source),
            Command::Namespace(namespace) => {
                self.scope.namespace = namespace.filter(|ns| !ns.is_empty());
                Ok(String::new())
            }
            Command::CrossDocumentRef(args) => self.cross_document_ref(args),
            Command::Anchor { name, link_text } => self.anchor(name, link_text),
            Command::RequireVersion(specifier) => {
                check_version(&specifier, VERSION)?;
                Ok(String::new())
            }
            Command::MultipageToc { side } => self.multipage_toc(&side),
        }
    }

    /// Process this document as a page and store its text.
    pub(crate) fn generate_page(&mut self) -> Result<(), EngineError> {
        let mut text = self.process_document()?;
        if self.scope.multipage && !self.scope.embedded {
            let bar = navigation::navigation_bar(&self.run.tree, self.document);
            if !bar.is_empty() {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&bar);
                text.push('\n');
            }
        }
        self.run.pages.insert(self.document, text);
        Ok(())
    }

    fn filter(
        &mut self,
        members: Option<FilterSpec>,
        exceptions: Option<FilterSpec>,
    ) -> Result<String, EngineError> {
        self.scope.filter = InsertionFilter::new(members, exceptions)?;
        Ok(String::new())
    }

    fn insert_fragment(&mut self, args: InsertArgs) -> Result<String, EngineError> {
        let filter = if args.ignore_global_filter {
            InsertionFilter::new(args.members, args.exceptions)?
        } else if args.members.is_some() || args.exceptions.is_some() {
            let local = InsertionFilter::new(args.members, args.exceptions)?;
            self.scope.filter.extend(&local)?
        } else {
            self.scope.filter.clone()
        };

        let element = match self.find_element(
            &args.name,
            args.kind.as_deref(),
            args.lang.as_deref(),
            false,
        ) {
            Ok(element) => element,
            Err(error @ EngineError::ReferenceNotFound { .. }) => {
                self.warning_or_error(error)?;
                return Ok(String::new());
            }
            Err(error) => return Err(error),
        };
        let kind = args.template.unwrap_or_else(|| element.kind.clone());

        if self.phase() == Phase::Discovering {
            self.insert(&element)?;
            self.render(&element, &kind, &filter)?;
            return Ok(String::new());
        }

        let text = self.render(&element, &kind, &filter)?;
        let fragment = fragment_file(self.page_file(), &element);
        let path = relative_path(self.page_file(), &fragment);
        self.run.artifacts.insert(fragment, text);

        let mut attributes = args.extra;
        if !args.leveloffset.is_empty() {
            attributes.insert("leveloffset".to_owned(), args.leveloffset);
        }
        Ok(format!(
            "include::{path}[{}]",
            format_attributes(&attributes)
        ))
    }

    fn render(
        &mut self,
        element: &ReferableElement,
        kind: &str,
        filter: &InsertionFilter,
    ) -> Result<String, EngineError> {
        let services = self.services;
        let request = RenderRequest {
            element,
            kind,
            filter,
        };
        services.renderer.render(&request, self)
    }

    fn link(&mut self, args: LinkArgs) -> Result<String, EngineError> {
        if args.text.is_some() && args.full_name {
            return Err(EngineError::InvalidApiCall(
                "`text` and `full_name` cannot be used together.".to_owned(),
            ));
        }
        let fallback = || args.text.clone().unwrap_or_else(|| args.name.clone());

        let element = match self.find_element(
            &args.name,
            args.kind.as_deref(),
            args.lang.as_deref(),
            args.allow_overloads,
        ) {
            Ok(element) => element,
            Err(error @ EngineError::ReferenceNotFound { .. }) => {
                self.warning_or_error(error)?;
                return Ok(fallback());
            }
            Err(error) => return Err(error),
        };

        let Some(id) = element.id.as_deref() else {
            self.warning_or_error(EngineError::Unlinkable {
                name: args.name.clone(),
                kind: args.kind.clone(),
                lang: args.lang.clone(),
            })?;
            return Ok(fallback());
        };

        let text = match (&args.text, args.full_name) {
            (Some(text), _) => text.clone(),
            (None, true) => args.name.clone(),
            (None, false) => element.name.clone(),
        };
        Ok(self.element_link(id, &text))
    }

    fn include(&mut self, args: IncludeArgs) -> Result<String, EngineError> {
        let Some(child) = self.find_document(Some(&args.file), args.package.as_deref())? else {
            return Ok(String::new());
        };
        match self.phase() {
            Phase::Discovering => {
                self.attach(child, args.always_embed)?;
                Ok(String::new())
            }
            Phase::Generating => self.generate_include(child, args),
        }
    }

    /// Attach `child` to the tree and discover its contents.
    fn attach(&mut self, child: DocId, embed: bool) -> Result<(), EngineError> {
        // Embedded documents are processed once per embedder.
        if !self
            .run
            .attach_origins
            .insert((self.document, child, self.line))
        {
            return Ok(());
        }

        let attached = if embed {
            self.run.tree.embed(self.document, child)
        } else {
            self.run.tree.include(self.document, child)
        };
        if let Err(error) = attached {
            return self.warning_or_error(ConsistencyError::from(error).into());
        }
        if !embed {
            self.run
                .include_edges
                .insert(child, (self.document, self.line));
        }

        let mut sub = self.sub_context(child, embed);
        sub.register_output()?;
        sub.process_document()?;
        Ok(())
    }

    fn generate_include(&mut self, child: DocId, args: IncludeArgs) -> Result<String, EngineError> {
        if args.always_embed {
            if !self.run.tree.get(child).embedded_in().contains(&self.document) {
                return Ok(String::new());
            }
            return self.sub_context(child, true).process_document();
        }

        if self.run.include_edges.get(&child) != Some(&(self.document, self.line)) {
            return Ok(String::new());
        }
        if !self.run.pages.contains_key(&child) {
            self.sub_context(child, false).generate_page()?;
        }

        let doc = self.run.tree.get(child);
        let path = relative_path(self.page_file(), output_file(&self.run.tree, child));
        if self.scope.multipage {
            if !args.multipage_link {
                return Ok(String::new());
            }
            let text = args
                .link_text
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| doc.title().to_owned());
            return Ok(format!("{}<<{path}#,{text}>>", args.link_prefix));
        }

        let mut attributes = args.extra;
        if !args.leveloffset.is_empty() {
            attributes.insert("leveloffset".to_owned(), args.leveloffset);
        }
        Ok(format!(
            "[#{}]\ninclude::{path}[{}]",
            top_anchor(doc.package(), doc.relative_path()),
            format_attributes(&attributes)
        ))
    }

    fn language(
        &mut self,
        lang: Option<String>,
        source: Option<String>,
    ) -> Result<String, EngineError> {
        let normalize = |tag: Option<String>| {
            tag.map(|tag| safe_language_tag(&tag))
                .filter(|tag| !tag.is_empty())
        };
        let lang = normalize(lang);
        let source = normalize(source);

        if let Some(source) = &source {
            let Some(lang) = &lang else {
                return Err(EngineError::InvalidApiCall(
                    "When specifying `source`, `lang` cannot be empty.".to_owned(),
                ));
            };
            if source == lang {
                return Err(EngineError::InvalidApiCall(
                    "`source` and `lang` cannot be the same.".to_owned(),
                ));
            }
            if transcoder(source, lang).is_none() {
                return Err(EngineError::InvalidApiCall(format!(
                    "cannot transcode from {source} to {lang}"
                )));
            }
        }

        self.scope.language = lang;
        self.scope.source_language = source;
        Ok(String::new())
    }

    fn cross_document_ref(&mut self, args: CrossDocumentRefArgs) -> Result<String, EngineError> {
        if args.file.is_none() && args.package.is_none() {
            let Some(anchor) = args.anchor else {
                return Err(EngineError::InvalidApiCall(
                    "At least `file`, `package`, or `anchor` is required.".to_owned(),
                ));
            };
            if self.phase() == Phase::Discovering {
                return Ok(String::new());
            }
            return self.link_to_named_anchor(&anchor, args.link_text);
        }

        let Some(target) = self.find_document(args.file.as_deref(), args.package.as_deref())?
        else {
            return Ok(String::new());
        };
        if self.phase() == Phase::Discovering {
            return Ok(String::new());
        }

        let doc = self.run.tree.get(target);
        if !doc.is_used() {
            let error = ConsistencyError::UnusedDocument {
                from: self.run.tree.get(self.document).to_string(),
                target: doc.to_string(),
            };
            self.warning_or_error(error.into())?;
            return Ok(String::new());
        }

        let link_text = match (args.link_text, &args.anchor) {
            (Some(text), _) => text,
            (None, Some(anchor)) => anchor.clone(),
            (None, None) => doc.title().to_owned(),
        };
        let anchor = match args.anchor {
            Some(anchor) => anchor,
            None if self.scope.multipage => String::new(),
            None => top_anchor(doc.package(), doc.relative_path()),
        };

        let Some(path) = self.checked_link_path(target)? else {
            return Ok(String::new());
        };
        Ok(format!("<<{path}#{anchor},{link_text}>>"))
    }

    fn link_to_named_anchor(
        &mut self,
        anchor: &str,
        link_text: Option<String>,
    ) -> Result<String, EngineError> {
        let (path, default_text) = match self.link_to_anchor(anchor) {
            Ok((document, text)) => (self.checked_link_path(document)?, text),
            Err(error) => {
                self.warning_or_error(error)?;
                (self.checked_link_path(self.document)?, None)
            }
        };
        let Some(path) = path else {
            return Ok(String::new());
        };
        let text = link_text
            .or(default_text)
            .unwrap_or_else(|| anchor.to_owned());
        Ok(format!("<<{path}#{anchor},{text}>>"))
    }

    /// Link path to `target`, or `None` after reporting an inconsistency.
    fn checked_link_path(&mut self, target: DocId) -> Result<Option<String>, EngineError> {
        match self.link_path(target) {
            Ok(path) => Ok(Some(path)),
            Err(error) => {
                self.warning_or_error(error.into())?;
                Ok(None)
            }
        }
    }

    fn anchor(&mut self, name: String, link_text: Option<String>) -> Result<String, EngineError> {
        if name.is_empty() {
            return Err(EngineError::InvalidApiCall(
                "`name` cannot be empty.".to_owned(),
            ));
        }
        if self.phase() == Phase::Discovering {
            self.register_anchor(&name, link_text)?;
            return Ok(String::new());
        }
        Ok(match link_text {
            Some(text) => format!("[#{name},reftext='{text}']"),
            None => format!("[#{name}]"),
        })
    }

    fn multipage_toc(&mut self, side: &str) -> Result<String, EngineError> {
        if side != "left" && side != "right" {
            return Err(EngineError::InvalidApiCall(format!(
                "`side` must be `left` or `right`, not `{side}`"
            )));
        }
        if !self.scope.multipage || self.phase() == Phase::Discovering {
            return Ok(String::new());
        }

        let toc = navigation::multipage_toc(&self.run.tree, self.page, side);
        let page = self.run.tree.get(self.page);
        let dir = page
            .relative_path()
            .rsplit_once('/')
            .map(|(dir, _)| format!("{dir}/"))
            .unwrap_or_default();
        let footer = format!("{dir}{}-docinfo-footer.html", page.stem());
        self.run.artifacts.insert(footer, toc);
        Ok(":docinfo: private".to_owned())
    }

    /// Locate a document by file and/or package.
    ///
    /// Without a package, `file` is relative to the current document. Missing
    /// packages and files are reported and yield `None`.
    fn find_document(
        &mut self,
        file: Option<&str>,
        package: Option<&str>,
    ) -> Result<Option<DocId>, EngineError> {
        if let Some(file) = file
            && (file.starts_with(['/', '\\']) || Path::new(file).is_absolute())
        {
            return Err(EngineError::InvalidApiCall(format!(
                "`{file}` must be a relative path."
            )));
        }

        let current = self.run.tree.get(self.document);
        let (package_name, relative) = match (file, package) {
            (Some(file), Some(package)) => (package.to_owned(), Some(resolve_relative("", file))),
            (Some(file), None) => (
                current.package().to_owned(),
                Some(resolve_relative(current.relative_path(), file)),
            ),
            (None, Some(package)) => (package.to_owned(), None),
            (None, None) => {
                return Err(EngineError::InvalidApiCall(
                    "a file or a package is required.".to_owned(),
                ));
            }
        };

        let resolved = match relative {
            Some(Some(relative)) => self
                .services
                .packages
                .resolve(&package_name, Some(&relative)),
            // Escapes the package root.
            Some(None) => Err(PackageError::UnknownFile {
                package: package_name.clone(),
                file: file.unwrap_or_default().to_owned(),
            }),
            None => self.services.packages.resolve(&package_name, None),
        };

        let error = match resolved {
            Ok(found) => {
                let id = self
                    .run
                    .tree
                    .add(&found.package, &found.relative_path, found.source);
                return Ok(Some(id));
            }
            Err(PackageError::UnknownPackage { package }) => EngineError::MissingPackage { package },
            Err(PackageError::UnknownFile { .. }) => match package {
                Some(package) => EngineError::MissingPackageFile {
                    package: package.to_owned(),
                    file: file.unwrap_or_default().to_owned(),
                },
                None => EngineError::IncludeFileNotFound {
                    file: file.unwrap_or_default().to_owned(),
                },
            },
        };
        self.warning_or_error(error)?;
        Ok(None)
    }
}

/// Path of the fragment rendered for `element` on a page.
fn fragment_file(page_file: &str, element: &ReferableElement) -> String {
    let page = page_file
        .rsplit_once('.')
        .filter(|(head, _)| !head.is_empty() && !head.ends_with('/'))
        .map_or(page_file, |(head, _)| head);
    let name: String = element
        .id
        .as_deref()
        .unwrap_or(&element.full_name)
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("fragments/{page}/{name}.adoc")
}

fn format_attributes(attributes: &BTreeMap<String, String>) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_fragment_file() {
        let element = ReferableElement {
            id: Some("cpp-log_1_1_logger".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            fragment_file("a/index.adoc", &element),
            "fragments/a/index/cpp-log_1_1_logger.adoc"
        );

        let element = ReferableElement {
            full_name: "log::Logger".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            fragment_file("index.adoc", &element),
            "fragments/index/log__Logger.adoc"
        );
    }

    #[test]
    fn test_format_attributes() {
        let attributes = BTreeMap::from([
            ("leveloffset".to_owned(), "+2".to_owned()),
            ("tag".to_owned(), "api".to_owned()),
        ]);
        assert_eq!(format_attributes(&attributes), "leveloffset=+2,tag=api");
        assert_eq!(format_attributes(&BTreeMap::new()), "");
    }
}
