//! Provenance of commands.

use std::fmt;

use serde::Serialize;

/// One executing command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    /// Short description of the command, e.g. `insert log::Logger`.
    pub command: String,
    /// Document the command appears in.
    pub document: String,
    /// 1-based line of the command.
    pub line: usize,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.document, self.line, self.command)
    }
}

/// Chain of commands leading to the current one, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Trace(pub Vec<StackFrame>);

impl Trace {
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "  {frame}")?;
        }
        Ok(())
    }
}

/// Render several traces separated by blank lines.
pub(crate) fn format_traces(traces: &[Trace]) -> String {
    traces
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}
