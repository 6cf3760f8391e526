/// Normalize a language name into the tag used in element ids and template paths.
///
/// # Examples
///
/// ```
/// use xd_reference::safe_language_tag;
///
/// assert_eq!(safe_language_tag("C++"), "cpp");
/// assert_eq!(safe_language_tag("Objective-C"), "objc");
/// assert_eq!(safe_language_tag("Java"), "java");
/// ```
pub fn safe_language_tag(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "c++" => "cpp".to_owned(),
        "objective-c" => "objc".to_owned(),
        _ => lower,
    }
}
