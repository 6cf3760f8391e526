//! Version requirements declared by documents.

use semver::Version;

use crate::EngineError;

/// Version of xd documents are checked against.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Compatible,
}

/// Check `current` against a comma-separated specifier like `>=0.2, <1`.
///
/// Supported operators are `==`, `!=`, `>=`, `<=`, `>`, `<` and `~=`
/// (compatible release: `~=1.4` allows `1.x` from `1.4`, `~=1.4.2` allows
/// `1.4.x` from `1.4.2`). Missing version components count as zero.
pub fn check_version(specifier: &str, current: &str) -> Result<(), EngineError> {
    let invalid = |reason: String| {
        EngineError::InvalidApiCall(format!("invalid version specifier `{specifier}`: {reason}"))
    };
    let current = parse_version(current).map_err(&invalid)?;

    let clauses: Vec<&str> = specifier
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if clauses.is_empty() {
        return Err(invalid("no version given".to_owned()));
    }

    for clause in clauses {
        let (op, version) = parse_clause(clause).map_err(&invalid)?;
        if !satisfies(&current, op, &version.0, version.1) {
            return Err(EngineError::IncompatibleVersion {
                required: specifier.trim().to_owned(),
                current: current.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_clause(clause: &str) -> Result<(Op, (Version, usize)), String> {
    const OPS: [(&str, Op); 7] = [
        ("==", Op::Eq),
        ("!=", Op::Ne),
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("~=", Op::Compatible),
        (">", Op::Gt),
        ("<", Op::Lt),
    ];
    let (op, rest) = OPS
        .iter()
        .find_map(|(prefix, op)| clause.strip_prefix(prefix).map(|rest| (*op, rest)))
        .ok_or_else(|| format!("`{clause}` has no comparison operator"))?;

    let rest = rest.trim();
    let components = rest.split('.').count();
    if op == Op::Compatible && components < 2 {
        return Err(format!("`{clause}` needs at least two version components"));
    }
    Ok((op, (parse_version(rest)?, components)))
}

/// Parse a version, padding it to three components.
fn parse_version(text: &str) -> Result<Version, String> {
    let text = text.trim();
    let components = text.split('.').count();
    let padded = match components {
        1 => format!("{text}.0.0"),
        2 => format!("{text}.0"),
        _ => text.to_owned(),
    };
    Version::parse(&padded).map_err(|e| format!("`{text}`: {e}"))
}

fn satisfies(current: &Version, op: Op, required: &Version, components: usize) -> bool {
    match op {
        Op::Eq => current == required,
        Op::Ne => current != required,
        Op::Ge => current >= required,
        Op::Le => current <= required,
        Op::Gt => current > required,
        Op::Lt => current < required,
        Op::Compatible => {
            let upper = if components == 2 {
                Version::new(required.major + 1, 0, 0)
            } else {
                Version::new(required.major, required.minor + 1, 0)
            };
            current >= required && *current < upper
        }
    }
}
