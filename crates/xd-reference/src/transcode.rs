//! Presenting elements of one language under the conventions of another.
//!
//! Transcoding lets documentation written once against, say, a Java API show
//! the same symbols as Kotlin: ids move to the target language's prefix,
//! names and types follow the target's spelling.

use crate::{Parameter, ReferableElement, ThrowsClause, TypeRef};

/// Converts elements from a source language to a target language.
pub trait Transcoder: Sync {
    fn source(&self) -> &'static str;

    fn target(&self) -> &'static str;

    /// Name and full name in the target language.
    fn convert_name(&self, element: &ReferableElement) -> (String, String) {
        (element.name.clone(), element.full_name.clone())
    }

    /// Name of a type in the target language.
    fn convert_type_name(&self, name: &str) -> String {
        name.to_owned()
    }

    /// Move an id from the source language prefix to the target prefix.
    fn convert_id(&self, id: &str) -> String {
        let bare = id
            .strip_prefix(self.source())
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(id);
        format!("{}-{bare}", self.target())
    }

    /// Transcode an element and all of its members.
    fn transcode(&self, element: &ReferableElement) -> ReferableElement {
        let (name, full_name) = self.convert_name(element);
        ReferableElement {
            id: element.id.as_deref().map(|id| self.convert_id(id)),
            name,
            full_name,
            language: self.target().to_owned(),
            kind: element.kind.clone(),
            namespace: element.namespace.clone(),
            prot: element.prot.clone(),
            brief: element.brief.clone(),
            description: element.description.clone(),
            returns: element.returns.as_ref().map(|ty| self.type_ref(ty)),
            params: element
                .params
                .iter()
                .map(|param| Parameter {
                    name: param.name.clone(),
                    ty: self.type_ref(&param.ty),
                    description: param.description.clone(),
                })
                .collect(),
            exceptions: element
                .exceptions
                .iter()
                .map(|clause| ThrowsClause {
                    ty: TypeRef {
                        id: clause.ty.id.as_deref().map(|id| self.convert_id(id)),
                        ..clause.ty.clone()
                    },
                    description: clause.description.clone(),
                })
                .collect(),
            members: element.members.iter().map(|m| self.transcode(m)).collect(),
        }
    }

    fn type_ref(&self, ty: &TypeRef) -> TypeRef {
        TypeRef {
            id: ty.id.as_deref().map(|id| self.convert_id(id)),
            name: self.convert_type_name(&ty.name),
            prefix: ty.prefix.clone(),
            suffix: ty.suffix.clone(),
        }
    }
}

/// Java to Kotlin.
struct KotlinTranscoder;

impl Transcoder for KotlinTranscoder {
    fn source(&self) -> &'static str {
        "java"
    }

    fn target(&self) -> &'static str {
        "kotlin"
    }

    fn convert_type_name(&self, name: &str) -> String {
        match name {
            "byte" | "Byte" => "Byte",
            "short" | "Short" => "Short",
            "int" | "Integer" => "Int",
            "long" | "Long" => "Long",
            "float" | "Float" => "Float",
            "double" | "Double" => "Double",
            "boolean" | "Boolean" => "Boolean",
            "char" | "Character" => "Char",
            other => other,
        }
        .to_owned()
    }
}

/// Objective-C to Swift.
struct SwiftTranscoder;

impl Transcoder for SwiftTranscoder {
    fn source(&self) -> &'static str {
        "objc"
    }

    fn target(&self) -> &'static str {
        "swift"
    }

    fn convert_name(&self, element: &ReferableElement) -> (String, String) {
        let strip = |s: &str| s.split_once(':').map_or(s, |(head, _)| head).to_owned();
        (strip(&element.name), strip(&element.full_name))
    }
}

static TRANSCODERS: [&dyn Transcoder; 2] = [&KotlinTranscoder, &SwiftTranscoder];

/// Look up the transcoder for a language pair.
pub fn transcoder(source: &str, target: &str) -> Option<&'static dyn Transcoder> {
    TRANSCODERS
        .iter()
        .copied()
        .find(|t| t.source() == source && t.target() == target)
}
