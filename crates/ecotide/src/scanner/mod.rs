//! Product detection and per-entity grade presentation for a page.

pub mod entity;
mod markup;
pub mod overlay;
mod page;
pub mod surface;
pub mod watcher;

pub use entity::{EntityId, EntityState, ProductEntity};
pub use overlay::{Overlay, OverlayError};
pub use page::{PageScanner, ScanReport};
pub use surface::{HtmlFileSurface, HtmlSurface, PageSurface, SurfaceError};
pub use watcher::{debounce, MutationRecord, RescanTrigger};
