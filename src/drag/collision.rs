//! Drop target resolution.
//!
//! Several drop zones can overlap under the pointer: a sidebar project row
//! sits inside its area row, and a sortable list item may lie behind the
//! sidebar. [`resolve_collision`] picks exactly one.
//!
//! # Precedence
//!
//! 1. Only targets that accept the dragged subject are considered. A project
//!    never lands on a task row and an area only lands on area slots, so a
//!    project held over an area row reassigns instead of reordering.
//! 2. Sidebar targets under the pointer win. The most specific one is
//!    chosen: a project row beats the area row around it.
//! 3. If the pointer misses the sidebar, the sidebar target overlapping the
//!    dragged item the most wins (the same project-first preference applies).
//! 4. Otherwise the sortable target whose center is closest to the dragged
//!    item's center wins.
//!
//! No candidate means no target, and the drag ends as a no-op.

use std::fmt;
use std::str::FromStr;

use crate::domain::{AreaId, ProjectId, TaskId};

use super::geometry::{Point, Rect};

const DRAG_PROJECT: &str = "drag-project-";
const DRAG_AREA: &str = "drag-area-";
const SIDEBAR: &str = "sidebar-";
const SIDEBAR_PROJECT: &str = "sidebar-project-";
const SIDEBAR_AREA: &str = "sidebar-area-";
const SLOT_PROJECT: &str = "slot-project-";
const SLOT_AREA: &str = "slot-area-";

// =============================================================================
// Identifiers
// =============================================================================

/// What is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragSubject {
    /// A task row. Identified by the bare task id.
    Task(TaskId),
    /// A sidebar project row (`drag-project-{id}`).
    Project(ProjectId),
    /// A sidebar area row (`drag-area-{id}`).
    Area(AreaId),
}

impl FromStr for DragSubject {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(id) = value.strip_prefix(DRAG_PROJECT) {
            return id.parse().map(Self::Project);
        }
        if let Some(id) = value.strip_prefix(DRAG_AREA) {
            return id.parse().map(Self::Area);
        }
        value.parse().map(Self::Task)
    }
}

impl fmt::Display for DragSubject {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(formatter, "{id}"),
            Self::Project(id) => write!(formatter, "{DRAG_PROJECT}{id}"),
            Self::Area(id) => write!(formatter, "{DRAG_AREA}{id}"),
        }
    }
}

/// Where something can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// `sidebar-inbox`
    Inbox,
    /// `sidebar-today`
    Today,
    /// `sidebar-anytime`
    Anytime,
    /// `sidebar-someday`
    Someday,
    /// `sidebar-logbook`
    Logbook,
    /// `sidebar-trash`
    Trash,
    /// `sidebar-project-{id}`
    SidebarProject(ProjectId),
    /// `sidebar-area-{id}`
    SidebarArea(AreaId),
    /// `slot-project-{id}`: a project's place in its group.
    ProjectSlot(ProjectId),
    /// `slot-area-{id}`: an area's place in the area list.
    AreaSlot(AreaId),
    /// A task row of a sortable list, identified by the bare task id.
    ListItem(TaskId),
}

impl DropTarget {
    /// Returns `true` for sidebar targets.
    #[must_use]
    pub const fn is_sidebar(&self) -> bool {
        !matches!(
            self,
            Self::ProjectSlot(_) | Self::AreaSlot(_) | Self::ListItem(_)
        )
    }

    /// Returns `true` if `subject` may be dropped here.
    #[must_use]
    pub const fn accepts(&self, subject: &DragSubject) -> bool {
        match subject {
            DragSubject::Task(_) => !matches!(self, Self::ProjectSlot(_) | Self::AreaSlot(_)),
            DragSubject::Project(_) => matches!(
                self,
                Self::SidebarProject(_) | Self::SidebarArea(_) | Self::ProjectSlot(_)
            ),
            DragSubject::Area(_) => matches!(self, Self::AreaSlot(_)),
        }
    }

    const fn specificity(&self) -> u8 {
        match self {
            Self::SidebarProject(_) => 1,
            _ => 0,
        }
    }
}

impl FromStr for DropTarget {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fixed = match value {
            "sidebar-inbox" => Some(Self::Inbox),
            "sidebar-today" => Some(Self::Today),
            "sidebar-anytime" => Some(Self::Anytime),
            "sidebar-someday" => Some(Self::Someday),
            "sidebar-logbook" => Some(Self::Logbook),
            "sidebar-trash" => Some(Self::Trash),
            _ => None,
        };
        if let Some(target) = fixed {
            return Ok(target);
        }
        if let Some(id) = value.strip_prefix(SIDEBAR_PROJECT) {
            return id.parse().map(Self::SidebarProject);
        }
        if let Some(id) = value.strip_prefix(SIDEBAR_AREA) {
            return id.parse().map(Self::SidebarArea);
        }
        if let Some(id) = value.strip_prefix(SLOT_PROJECT) {
            return id.parse().map(Self::ProjectSlot);
        }
        if let Some(id) = value.strip_prefix(SLOT_AREA) {
            return id.parse().map(Self::AreaSlot);
        }
        value.parse().map(Self::ListItem)
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbox => write!(formatter, "{SIDEBAR}inbox"),
            Self::Today => write!(formatter, "{SIDEBAR}today"),
            Self::Anytime => write!(formatter, "{SIDEBAR}anytime"),
            Self::Someday => write!(formatter, "{SIDEBAR}someday"),
            Self::Logbook => write!(formatter, "{SIDEBAR}logbook"),
            Self::Trash => write!(formatter, "{SIDEBAR}trash"),
            Self::SidebarProject(id) => write!(formatter, "{SIDEBAR_PROJECT}{id}"),
            Self::SidebarArea(id) => write!(formatter, "{SIDEBAR_AREA}{id}"),
            Self::ProjectSlot(id) => write!(formatter, "{SLOT_PROJECT}{id}"),
            Self::AreaSlot(id) => write!(formatter, "{SLOT_AREA}{id}"),
            Self::ListItem(id) => write!(formatter, "{id}"),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A drop zone and its current bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropCandidate {
    /// The zone.
    pub target: DropTarget,
    /// Its bounds.
    pub rect: Rect,
}

impl DropCandidate {
    /// Creates a candidate.
    #[must_use]
    pub const fn new(target: DropTarget, rect: Rect) -> Self {
        Self { target, rect }
    }
}

/// Pointer position and the dragged item's current bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGeometry {
    /// Pointer position.
    pub pointer: Point,
    /// Bounds of the dragged item.
    pub active_rect: Rect,
}

impl DragGeometry {
    /// Creates a geometry.
    #[must_use]
    pub const fn new(pointer: Point, active_rect: Rect) -> Self {
        Self {
            pointer,
            active_rect,
        }
    }
}

/// Picks the single drop target for `subject`, if any.
#[must_use]
pub fn resolve_collision(
    subject: &DragSubject,
    geometry: &DragGeometry,
    candidates: &[DropCandidate],
) -> Option<DropTarget> {
    let (sidebar, sortable): (Vec<&DropCandidate>, Vec<&DropCandidate>) = candidates
        .iter()
        .filter(|candidate| candidate.target.accepts(subject))
        .partition(|candidate| candidate.target.is_sidebar());

    let under_pointer: Vec<&DropCandidate> = sidebar
        .iter()
        .copied()
        .filter(|candidate| candidate.rect.contains(geometry.pointer))
        .collect();
    if let Some(target) = most_specific(&under_pointer) {
        return Some(target);
    }

    let mut overlapping: Vec<(&DropCandidate, f64)> = sidebar
        .iter()
        .map(|candidate| {
            (
                *candidate,
                candidate.rect.intersection_area(&geometry.active_rect),
            )
        })
        .filter(|(_, overlap)| *overlap > 0.0)
        .collect();
    overlapping.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    let overlapping: Vec<&DropCandidate> = overlapping
        .into_iter()
        .map(|(candidate, _)| candidate)
        .collect();
    if let Some(target) = most_specific(&overlapping) {
        return Some(target);
    }

    let center = geometry.active_rect.center();
    sortable
        .into_iter()
        .min_by(|a, b| {
            a.rect
                .center()
                .distance(center)
                .total_cmp(&b.rect.center().distance(center))
        })
        .map(|candidate| candidate.target)
}

/// The first most specific target of `hits`, keeping their order otherwise.
fn most_specific(hits: &[&DropCandidate]) -> Option<DropTarget> {
    let best = hits
        .iter()
        .map(|candidate| candidate.target.specificity())
        .max()?;
    hits.iter()
        .find(|candidate| candidate.target.specificity() == best)
        .map(|candidate| candidate.target)
}
