//! Posix-style path helpers.
//!
//! Paths inside packages and output directories are always `/`-separated
//! strings, independent of the host platform.

/// Compute the relative path from one file to another.
///
/// Both `from` and `to` are posix paths relative to the same directory. The
/// last segment of `from` is the current file; the base directory is
/// everything before it.
///
/// # Examples
///
/// ```
/// use xd_document::relative_path;
///
/// assert_eq!(relative_path("a/b.adoc", "a/c.adoc"), "c.adoc");
/// assert_eq!(relative_path("index.adoc", "a/b/other.adoc"), "a/b/other.adoc");
/// assert_eq!(relative_path("a/b/c.adoc", "d.adoc"), "../../d.adoc");
/// ```
pub fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    // A trailing slash means `from` names a directory.
    let from_dir = if from.ends_with('/') || from_segs.is_empty() {
        &from_segs[..]
    } else {
        &from_segs[..from_segs.len() - 1]
    };

    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from_dir.len() - common;
    let remaining = &to_segs[common..];

    let result = format!("{}{}", "../".repeat(ups), remaining.join("/"));
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}

/// Resolve `to` relative to the directory of `from`, normalizing `.` and `..`.
///
/// Returns `None` when the result would escape the root both paths are
/// relative to.
///
/// # Examples
///
/// ```
/// use xd_document::resolve_relative;
///
/// assert_eq!(resolve_relative("a/index.adoc", "b/other.adoc"), Some("a/b/other.adoc".to_owned()));
/// assert_eq!(resolve_relative("a/index.adoc", "../top.adoc"), Some("top.adoc".to_owned()));
/// assert_eq!(resolve_relative("index.adoc", "../outside.adoc"), None);
/// ```
pub fn resolve_relative(from: &str, to: &str) -> Option<String> {
    let mut segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    segs.pop();

    for seg in to.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                segs.pop()?;
            }
            seg => segs.push(seg),
        }
    }

    if segs.is_empty() {
        None
    } else {
        Some(segs.join("/"))
    }
}

/// Anchor placed at the top of an included file.
///
/// Derived from the path components so that it is unique per file.
///
/// # Examples
///
/// ```
/// use xd_document::top_anchor;
///
/// assert_eq!(top_anchor("INPUT", "a/b/other.adoc"), "top-a-b-other-top");
/// assert_eq!(top_anchor("lib", "index.adoc"), "top-lib-index-top");
/// ```
pub fn top_anchor(package: &str, relative_path: &str) -> String {
    let without_ext = match relative_path.rsplit_once('.') {
        Some((head, _)) if !head.ends_with('/') && !head.is_empty() => head,
        _ => relative_path,
    };
    let mut parts = Vec::new();
    if package != crate::INPUT_PACKAGE {
        parts.push(package);
    }
    parts.extend(without_ext.split('/').filter(|s| !s.is_empty()));

    let slug: String = parts
        .join("-")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("top-{slug}-top")
}
