//! Drag and drop.
//!
//! - [`geometry`]: points and rectangles
//! - [`collision`]: draggable and drop-zone identifiers, target resolution
//! - [`registry`]: the sortable task lists on screen
//! - [`session`]: the gesture controller that issues mutations

pub mod collision;
pub mod geometry;
pub mod registry;
pub mod session;

pub use collision::{DragGeometry, DragSubject, DropCandidate, DropTarget, resolve_collision};
pub use geometry::{Point, Rect};
pub use registry::{ListEntry, ListOwner, ListRegistry};
pub use session::{DragAction, DragController, DragOutcome, DragSession, SOMEDAY};
