//! Directive syntax parsing.
//!
//! Recognizes `:name[content]{attrs}` (inline) and `::name[content]{attrs}`
//! (leaf). A colon run directly after a word character is ordinary text, so
//! `xref:`, `include::` and `NOTE:` are never mistaken for commands.

use super::DirectiveArgs;

/// Parsed directive from a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    pub name: String,
    pub args: DirectiveArgs,
    /// Written with two colons.
    pub leaf: bool,
}

/// Find the first directive in a line.
///
/// Returns the directive with its start and end byte offsets, or `None` if
/// the line doesn't contain one.
pub(crate) fn parse_line(line: &str) -> Option<(ParsedDirective, usize, usize)> {
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find(':') {
        let start = search_from + offset;
        let colon_count = line[start..].chars().take_while(|&c| c == ':').count();
        search_from = start + colon_count;

        let after_word = line[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        if after_word || colon_count > 2 {
            continue;
        }

        if let Some((name, args, end)) = parse_body(&line[search_from..]) {
            let directive = ParsedDirective {
                name,
                args,
                leaf: colon_count == 2,
            };
            return Some((directive, start, search_from + end));
        }
    }

    None
}

/// Parse `name[content]{attrs}` following the colons.
fn parse_body(s: &str) -> Option<(String, DirectiveArgs, usize)> {
    let name_end = s
        .find(|c: char| c == '[' || c == '{' || c.is_whitespace())
        .unwrap_or(s.len());

    let name = &s[..name_end];
    if !is_valid_directive_name(name) {
        return None;
    }

    let mut pos = name_end;
    let (content, content_consumed) = parse_delimited(&s[pos..], '[', ']');
    pos += content_consumed;
    let (attrs_str, attrs_consumed) = parse_delimited(&s[pos..], '{', '}');
    pos += attrs_consumed;

    Some((
        name.to_owned(),
        DirectiveArgs::parse(content, attrs_str),
        pos,
    ))
}

/// Valid names start with a letter and contain only alphanumeric
/// characters, hyphens, and underscores.
fn is_valid_directive_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_alphabetic)
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Parse a bracketed section, handling nesting.
///
/// Returns (content without delimiters, `bytes_consumed`).
fn parse_delimited(s: &str, open: char, close: char) -> (&str, usize) {
    if !s.starts_with(open) {
        return ("", 0);
    }

    let mut depth = 0;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return (&s[1..i], i + 1);
            }
        }
    }
    ("", 0)
}
