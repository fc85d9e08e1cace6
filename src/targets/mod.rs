//! Capture targets and their ordered collections.
//!
//! A target is one configured capturable thing: a [`Screen`] (the active
//! window or an enumerated display) or a [`Region`] (an explicit rectangle).
//! Targets live in insertion-ordered collections that the store persists and
//! the engine iterates every tick.

mod collection;
mod region;
mod screen;

pub use collection::TargetCollection;
pub use region::Region;
pub use screen::Screen;

use uuid::Uuid;

/// Identity surface shared by every target kind.
pub trait Target {
    /// Opaque identifier, unique within a collection and stable across edits.
    fn view_id(&self) -> Uuid;

    fn name(&self) -> &str;
}

pub type ScreenCollection = TargetCollection<Screen>;
pub type RegionCollection = TargetCollection<Region>;
