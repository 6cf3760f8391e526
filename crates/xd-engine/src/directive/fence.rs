//! Listing block tracking for directive parsing.
//!
//! Tracks whether we're inside a delimited block whose content is copied
//! verbatim, so directive syntax in code samples is left alone.

/// Tracks delimited block state during line-by-line processing.
///
/// Listing (`----`), literal (`....`) and comment (`////`) blocks need at
/// least four delimiter characters and are closed by a line of the same
/// length. Backtick fences need three and are closed by a fence at least as
/// long as the opening one.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    /// Character used for the current fence.
    fence_char: Option<char>,
    /// Length of the opening fence.
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Update fence state based on a line.
    ///
    /// Returns `true` if the line is a fence marker (opening or closing).
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_end();

        if let Some(fence_char) = self.fence_char {
            if is_closing_fence(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return true;
            }
            false
        } else if let Some((ch, len)) = detect_fence(trimmed) {
            self.fence_char = Some(ch);
            self.fence_len = len;
            true
        } else {
            false
        }
    }
}

fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    let count = trimmed.chars().take_while(|&c| c == first).count();
    match first {
        // A language hint may follow the backticks.
        '`' if count >= 3 => Some((first, count)),
        '-' | '.' | '/' if count >= 4 && count == trimmed.len() => Some((first, count)),
        _ => None,
    }
}

fn is_closing_fence(trimmed: &str, expected_char: char, open_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }
    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    if count != trimmed.len() {
        return false;
    }
    if expected_char == '`' {
        count >= open_len
    } else {
        count == open_len
    }
}
