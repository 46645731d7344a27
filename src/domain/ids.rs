//! Identity newtypes.
//!
//! Every entity kind gets its own UUID wrapper so a `ProjectId` can never be
//! passed where a `TaskId` is expected. Identities are stable and never reused.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Generates a new time-ordered identifier (UUID v7).
            ///
            /// **Note**: impure (reads the clock and the random source).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a task.
    TaskId
);
entity_id!(
    /// Unique identifier for a project.
    ProjectId
);
entity_id!(
    /// Unique identifier for an area of responsibility.
    AreaId
);
entity_id!(
    /// Unique identifier for a tag.
    TagId
);
entity_id!(
    /// Unique identifier for a heading inside a project.
    HeadingId
);

/// A typed reference to any cached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    /// A task.
    Task(TaskId),
    /// A project.
    Project(ProjectId),
    /// An area.
    Area(AreaId),
    /// A tag.
    Tag(TagId),
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(id) => write!(formatter, "task:{id}"),
            Self::Project(id) => write!(formatter, "project:{id}"),
            Self::Area(id) => write!(formatter, "area:{id}"),
            Self::Tag(id) => write!(formatter, "tag:{id}"),
        }
    }
}
