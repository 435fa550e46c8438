/// Fatal conditions raised by map construction, inversion and composition.
///
/// A point falling outside the mapped domain is not an error; lookups report
/// that case as `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum MapError {
    ShapeMismatch {
        expected: usize,
        found: usize,
    },
    InvalidLevel {
        level: u32,
    },
    InvalidConfidence {
        x: usize,
        y: usize,
        value: f32,
    },
    NonFinite {
        x: usize,
        y: usize,
    },
    InvalidArguments(String),
    NoValidNodes,
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::ShapeMismatch { expected, found } => {
                write!(f, "node count mismatch (expected {expected}, found {found})")
            }
            MapError::InvalidLevel { level } => {
                write!(f, "map level {level} out of range (must be < 31)")
            }
            MapError::InvalidConfidence { x, y, value } => {
                write!(f, "invalid confidence {value} at ({x},{y})")
            }
            MapError::NonFinite { x, y } => write!(f, "nan in map coordinates at ({x},{y})"),
            MapError::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            MapError::NoValidNodes => write!(f, "no valid map blocks found"),
        }
    }
}

impl std::error::Error for MapError {}
