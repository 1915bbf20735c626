//! Edge orientation used by neighbourhood queries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a neighbourhood traversal relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Incident neighbours (predecessors).
    In,
    /// Adjacent neighbours (successors).
    Out,
    /// Union of predecessors and successors.
    Und,
    /// Reciprocal ties: predecessors that are also successors.
    Mutual,
}

impl Orientation {
    /// Orientation seen from the other endpoint of the edge.
    pub fn inverse(self) -> Self {
        match self {
            Orientation::In => Orientation::Out,
            Orientation::Out => Orientation::In,
            Orientation::Und => Orientation::Und,
            Orientation::Mutual => Orientation::Mutual,
        }
    }

    /// Returns all orientations.
    pub fn all() -> &'static [Orientation] {
        &[
            Orientation::In,
            Orientation::Out,
            Orientation::Und,
            Orientation::Mutual,
        ]
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::In => write!(f, "in"),
            Orientation::Out => write!(f, "out"),
            Orientation::Und => write!(f, "und"),
            Orientation::Mutual => write!(f, "mutual"),
        }
    }
}

/// Error returned when an orientation name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrientationError(pub String);

impl fmt::Display for ParseOrientationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid orientation: '{}'", self.0)
    }
}

impl std::error::Error for ParseOrientationError {}

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(Orientation::In),
            "out" => Ok(Orientation::Out),
            "und" | "undirected" => Ok(Orientation::Und),
            "mutual" => Ok(Orientation::Mutual),
            _ => Err(ParseOrientationError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse() {
        assert_eq!(Orientation::In.inverse(), Orientation::Out);
        assert_eq!(Orientation::Out.inverse(), Orientation::In);
        assert_eq!(Orientation::Und.inverse(), Orientation::Und);
        assert_eq!(Orientation::Mutual.inverse(), Orientation::Mutual);
    }

    #[test]
    fn test_parse_round_trip() {
        for orientation in Orientation::all() {
            let parsed: Orientation = orientation.to_string().parse().unwrap();
            assert_eq!(parsed, *orientation);
        }
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
