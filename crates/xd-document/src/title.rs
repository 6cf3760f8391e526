//! Title extraction from document text.

use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE_LIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*\]").unwrap());
static ATTRIBUTE_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.*\}").unwrap());
static FORMATTING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_`^~#]").unwrap());

/// Extract the document title from the first level 0 heading (`= Title`).
///
/// Attribute lists, attribute references and inline formatting marks are
/// stripped. Returns `None` when the text has no such heading.
///
/// # Examples
///
/// ```
/// use xd_document::extract_title;
///
/// assert_eq!(extract_title("= My _Title_\n"), Some("My Title".to_owned()));
/// assert_eq!(extract_title("== Section\n"), None);
/// ```
pub fn extract_title(text: &str) -> Option<String> {
    let line = text.lines().find(|line| line.starts_with("= "))?;
    let title = &line[2..];
    let title = ATTRIBUTE_LIST_RE.replace_all(title, "");
    let title = ATTRIBUTE_REF_RE.replace_all(&title, "");
    let title = FORMATTING_RE.replace_all(&title, "");
    Some(title.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_title_plain() {
        assert_eq!(extract_title("= Hello\n"), Some("Hello".to_owned()));
    }

    #[test]
    fn test_extract_title_skips_preamble() {
        let text = "// comment\n:attr: value\n\n= Real Title\n";
        assert_eq!(extract_title(text), Some("Real Title".to_owned()));
    }

    #[test]
    fn test_extract_title_strips_markup() {
        assert_eq!(
            extract_title("= `Code` and ^sup^ ~sub~ #mark#\n"),
            Some("Code and sup sub mark".to_owned())
        );
    }

    #[test]
    fn test_extract_title_strips_attributes() {
        assert_eq!(
            extract_title("= {product} Manual [.big]\n"),
            Some("Manual".to_owned())
        );
    }

    #[test]
    fn test_extract_title_requires_space() {
        assert_eq!(extract_title("=NoSpace\n"), None);
    }
}
