#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod compose;
pub mod diagnostics;
pub mod error;
pub mod invert;
pub mod map;
pub mod translation;
pub mod types;

// Tooling support: file formats and tool configs.
pub mod config;
pub mod io;

// Low-level interpolation helpers shared by the engines.
pub mod numeric;

// --- High-level re-exports -------------------------------------------------

pub use crate::compose::{compose, ComposeMode, ComposeParams, Compositor, Extrapolator};
pub use crate::error::MapError;
pub use crate::invert::{invert_map, InversionIndex, InvertOptions};
pub use crate::map::DeformationMap;
pub use crate::translation::{best_translation, TranslationFit};
pub use crate::types::MapNode;

pub use crate::diagnostics::{ComposeReport, InvertReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```
/// use deform_map::prelude::*;
///
/// # fn main() -> Result<(), MapError> {
/// let map1 = DeformationMap::identity(0, 8, 8, 0, 0)?;
/// let map2 = DeformationMap::identity(0, 8, 8, 0, 0)?;
///
/// let out = compose(&map1, &map2, ComposeMode::Forward, 0.0, 0.0)?;
/// assert_eq!(out.node(3, 4), MapNode::new(3.0, 4.0, 1.0));
///
/// let index = InversionIndex::new(&map2)?;
/// assert!(index.invert(2.5, 2.5).is_some());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        compose, ComposeMode, ComposeParams, Compositor, DeformationMap, InversionIndex, MapError,
        MapNode,
    };
}
