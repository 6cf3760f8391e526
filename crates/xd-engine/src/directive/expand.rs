//! Line-by-line directive expansion.

use super::fence::FenceTracker;
use super::parser::{ParsedDirective, parse_line};

/// Replace every directive in `input` with the output of `handler`.
///
/// The handler receives the directive and its 1-based line number. Returning
/// `Ok(None)` leaves the directive text untouched. A leaf directive that
/// fills its whole line and expands to nothing removes the line. Content of
/// listing blocks is copied verbatim.
///
/// # Example
///
/// ```
/// use xd_engine::directive::expand;
///
/// let output = expand("Hello :name[World]!\n", |directive, _line| {
///     Ok::<_, ()>(Some(directive.args.content.to_uppercase()))
/// });
/// assert_eq!(output, Ok("Hello WORLD!\n".to_owned()));
/// ```
pub fn expand<E, F>(input: &str, mut handler: F) -> Result<String, E>
where
    F: FnMut(&ParsedDirective, usize) -> Result<Option<String>, E>,
{
    let mut output = String::with_capacity(input.len());
    let mut fence = FenceTracker::new();
    let lines: Vec<&str> = input.lines().collect();
    let line_count = lines.len();

    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;

        let processed = if fence.update(line) || fence.in_fence() {
            Some((*line).to_owned())
        } else {
            expand_line(line, line_num, &mut handler)?
        };

        let Some(processed) = processed else {
            continue;
        };
        output.push_str(&processed);

        // Preserve line endings
        if idx < line_count - 1 || input.ends_with('\n') {
            output.push('\n');
        }
    }

    Ok(output)
}

/// Expand the directives of one line; `None` drops the line.
fn expand_line<E, F>(line: &str, line_num: usize, handler: &mut F) -> Result<Option<String>, E>
where
    F: FnMut(&ParsedDirective, usize) -> Result<Option<String>, E>,
{
    let mut result = String::with_capacity(line.len());
    let mut remaining = line;

    while let Some((directive, start, end)) = parse_line(remaining) {
        result.push_str(&remaining[..start]);

        match handler(&directive, line_num)? {
            Some(expanded) => {
                let whole_line = directive.leaf
                    && remaining[..start].trim().is_empty()
                    && remaining[end..].trim().is_empty()
                    && result.trim().is_empty();
                if whole_line && expanded.is_empty() {
                    return Ok(None);
                }
                result.push_str(&expanded);
            }
            None => result.push_str(&remaining[start..end]),
        }

        remaining = &remaining[end..];
    }

    result.push_str(remaining);
    Ok(Some(result))
}
