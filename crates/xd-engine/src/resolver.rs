//! Element lookup for commands.

use std::sync::Arc;

use xd_reference::{Query, ReferableElement, safe_language_tag, transcoder};

use crate::EngineError;
use crate::context::Context;

impl Context<'_> {
    /// Find the element a command refers to.
    ///
    /// Looks in the active namespace first and then by fully qualified name.
    /// When the element is missing in the active language and a source
    /// language is configured, the element is looked up in the source
    /// language and transcoded.
    pub(crate) fn find_element(
        &mut self,
        name: &str,
        kind: Option<&str>,
        lang: Option<&str>,
        allow_overloads: bool,
    ) -> Result<Arc<ReferableElement>, EngineError> {
        let lang = match lang {
            Some(lang) => Some(safe_language_tag(lang)),
            None => self.scope.language.clone(),
        };

        if let Some(element) = self.lookup(name, kind, lang.as_deref(), allow_overloads)? {
            return Ok(element);
        }

        if let (Some(target), Some(source)) = (&lang, &self.scope.source_language)
            && self.scope.language.as_ref() == Some(target)
            && let Some(transcoder) = transcoder(source, target)
            && let Some(element) = self.lookup(name, kind, Some(source), allow_overloads)?
        {
            tracing::debug!(name, source = %source, target = %target, "Transcoding element");
            let transcoded = Arc::new(transcoder.transcode(&element));
            self.register_transcoded(&transcoded);
            return Ok(transcoded);
        }

        Err(EngineError::ReferenceNotFound {
            name: name.to_owned(),
            kind: kind.map(str::to_owned),
            lang,
        })
    }

    fn lookup(
        &self,
        name: &str,
        kind: Option<&str>,
        lang: Option<&str>,
        allow_overloads: bool,
    ) -> Result<Option<Arc<ReferableElement>>, EngineError> {
        let mut query = Query {
            name,
            namespace: self.scope.namespace.as_deref(),
            kind,
            language: lang,
            allow_overloads,
        };
        let ambiguous = |candidates| EngineError::AmbiguousReference {
            name: name.to_owned(),
            candidates,
        };

        let reference = &self.services.reference;
        let found = reference
            .find(&query)
            .map_err(|e| ambiguous(e.candidates))?;
        if found.is_some() || query.namespace.is_none() {
            return Ok(found);
        }

        query.namespace = None;
        reference.find(&query).map_err(|e| ambiguous(e.candidates))
    }

    fn register_transcoded(&mut self, element: &Arc<ReferableElement>) {
        if let Some(id) = &element.id {
            self.run
                .transcoded
                .entry(id.clone())
                .or_insert_with(|| Arc::clone(element));
        }
        for member in &element.members {
            self.register_transcoded(&Arc::new(member.clone()));
        }
    }

    /// Element with `id`, including transcoded elements of this run.
    pub(crate) fn lookup_id(&self, id: &str) -> Option<Arc<ReferableElement>> {
        self.run
            .transcoded
            .get(id)
            .cloned()
            .or_else(|| self.services.reference.find_by_id(id))
    }
}
