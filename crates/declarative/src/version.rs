//! Dotted versions and version-range matchers.
//!
//! Versions compare segment by segment from the left. Two numeric segments
//! compare numerically, two text segments lexically, and a text segment sorts
//! before a numeric one (`1.0.rc1 < 1.0.0`). Missing trailing segments count
//! as `0`, so `10.4 == 10.4.0`.
//!
//! Requirements are one or more comma separated constraints that must all
//! hold:
//!
//! | Syntax     | Meaning                                       |
//! |------------|-----------------------------------------------|
//! | `1.2`      | exactly `1.2`                                 |
//! | `= 1.2`    | exactly `1.2`                                 |
//! | `!= 1.2`   | anything but `1.2`                            |
//! | `>= 1.2`   | `1.2` or later (also `>`, `<=`, `<`)          |
//! | `~> 1.2`   | `>= 1.2, < 2`                                 |
//! | `~> 1.2.3` | `>= 1.2.3, < 1.3`                             |

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Segment {
    Number(u64),
    Text(String),
}

impl Segment {
    fn cmp_segment(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Number(n) => write!(f, "{n}"),
            Segment::Text(t) => f.write_str(t),
        }
    }
}

/// A dotted version such as `10.15.7` or `22.04`
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a dotted version
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::registration("empty version"));
        }

        let segments = input
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    Err(Error::registration(format!(
                        "invalid version '{input}': empty segment"
                    )))
                } else if part.chars().all(|c| c.is_ascii_digit()) {
                    part.parse::<u64>().map(Segment::Number).map_err(|e| {
                        Error::registration(format!("invalid version '{input}': {e}"))
                    })
                } else if part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                    Ok(Segment::Text(part.to_string()))
                } else {
                    Err(Error::registration(format!(
                        "invalid version '{input}': bad segment '{part}'"
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// Upper bound for a pessimistic constraint
    ///
    /// Drops the last segment (unless there is only one) and increments the
    /// new last segment: `1.2 -> 2`, `1.2.3 -> 1.3`, `4 -> 5`.
    fn bump(&self) -> Option<Self> {
        let keep = self.segments.len().saturating_sub(1).max(1);
        let mut segments: Vec<Segment> = self.segments[..keep].to_vec();
        match segments.last_mut() {
            Some(Segment::Number(n)) => *n += 1,
            _ => return None,
        }
        Some(Self { segments })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Segment::Number(0);
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp_segment(b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Pessimistic,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Pessimistic => "~>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Constraint {
    op: Op,
    version: Version,
    upper: Option<Version>,
}

impl Constraint {
    fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        // Longest operators first so ">=" is not read as ">".
        let ops = [
            (">=", Op::Ge),
            ("<=", Op::Le),
            ("!=", Op::Ne),
            ("~>", Op::Pessimistic),
            (">", Op::Gt),
            ("<", Op::Lt),
            ("=", Op::Eq),
        ];
        let (op, rest) = ops
            .iter()
            .find_map(|(prefix, op)| input.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Op::Eq, input));

        let version = Version::parse(rest).map_err(|_| {
            Error::registration(format!("malformed version constraint '{input}'"))
        })?;

        let upper = if op == Op::Pessimistic {
            Some(version.bump().ok_or_else(|| {
                Error::registration(format!(
                    "malformed version constraint '{input}': cannot bump a text segment"
                ))
            })?)
        } else {
            None
        };

        Ok(Self { op, version, upper })
    }

    fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Op::Eq => candidate == &self.version,
            Op::Ne => candidate != &self.version,
            Op::Gt => candidate > &self.version,
            Op::Ge => candidate >= &self.version,
            Op::Lt => candidate < &self.version,
            Op::Le => candidate <= &self.version,
            Op::Pessimistic => {
                candidate >= &self.version && self.upper.as_ref().is_some_and(|u| candidate < u)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.version)
    }
}

/// A conjunction of version constraints, e.g. `>= 10.4, < 11`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    constraints: Vec<Constraint>,
}

impl VersionRequirement {
    /// Parse a requirement, failing with a registration error when malformed
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::registration("empty version constraint"));
        }
        let constraints = input
            .split(',')
            .map(Constraint::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { constraints })
    }

    /// Check a version against every constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Parse `version` and check it; unparseable versions never match
    pub fn matches_str(&self, version: &str) -> bool {
        Version::parse(version).is_ok_and(|v| self.matches(&v))
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}
