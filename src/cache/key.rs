//! Structured cache keys.
//!
//! A [`CacheKey`] is a short sequence of string segments such as
//! `views/inbox` or `tasks/<id>/checklist`. Keys form a prefix hierarchy:
//! invalidating `views` reaches every view document.
//!
//! The [`keys`] module builds every key the application uses. Optional
//! parameters that are `None` are left out of the key entirely, so
//! `keys::views::logbook(None, None)` is `views/logbook`.

use std::fmt;

use smallvec::SmallVec;

use crate::domain::DocumentKind;

/// Inline capacity: nearly every key has at most four segments.
type Segments = SmallVec<[String; 4]>;

// =============================================================================
// CacheKey
// =============================================================================

/// A hierarchical cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(Segments);

impl CacheKey {
    /// Builds a key from its segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new key with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns a new key with `segment` appended when present.
    #[must_use]
    fn child_opt(self, segment: Option<impl ToString>) -> Self {
        match segment {
            Some(segment) => self.child(segment.to_string()),
            None => self,
        }
    }

    /// The key's segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if `prefix` is this key or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The shape of the document the server returns for this key.
    #[must_use]
    pub fn document_kind(&self) -> DocumentKind {
        let segments: SmallVec<[&str; 4]> = self.0.iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["views", "inbox"] => DocumentKind::Inbox,
            ["views", "today"] => DocumentKind::Today,
            ["views", "upcoming", ..] => DocumentKind::Upcoming,
            ["views", "anytime"] => DocumentKind::Anytime,
            ["views", "someday"] => DocumentKind::Someday,
            ["views", "logbook", ..] => DocumentKind::Logbook,
            ["views", "trash", ..] => DocumentKind::Trash,
            ["tasks", "list", ..] => DocumentKind::TaskList,
            ["tasks", _] => DocumentKind::TaskDetail,
            ["projects", "list", ..] => DocumentKind::ProjectList,
            ["projects", _] => DocumentKind::ProjectDetail,
            ["areas"] => DocumentKind::AreaList,
            ["areas", _] => DocumentKind::AreaDetail,
            ["tags"] => DocumentKind::TagList,
            ["tags", _, "tasks"] => DocumentKind::TagTasks,
            ["search", _] => DocumentKind::Search,
            _ => DocumentKind::Raw,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                formatter.write_str("/")?;
            }
            formatter.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// InvalidationScope
// =============================================================================

/// One unit of "refresh this part of the cache".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidationScope {
    /// Mark every entry under the prefix stale and refetch it.
    Invalidate(CacheKey),
    /// Evict every entry under the prefix; future reads must fetch.
    Remove(CacheKey),
}

impl InvalidationScope {
    /// The prefix this scope covers.
    #[must_use]
    pub const fn prefix(&self) -> &CacheKey {
        match self {
            Self::Invalidate(prefix) | Self::Remove(prefix) => prefix,
        }
    }

    /// Returns `true` if `self` already covers everything `other` would do.
    ///
    /// A removal covers anything under its prefix. An invalidation covers
    /// only invalidations under its prefix.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Remove(prefix), _) | (Self::Invalidate(prefix), Self::Invalidate(_)) => {
                other.prefix().starts_with(prefix)
            }
            (Self::Invalidate(_), Self::Remove(_)) => false,
        }
    }
}

impl fmt::Display for InvalidationScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalidate(prefix) => write!(formatter, "invalidate {prefix}"),
            Self::Remove(prefix) => write!(formatter, "remove {prefix}"),
        }
    }
}

// =============================================================================
// Key constructors
// =============================================================================

/// Constructors for every cache key the application uses.
pub mod keys {
    use super::CacheKey;

    /// View documents.
    pub mod views {
        use super::CacheKey;

        /// Prefix of every view.
        #[must_use]
        pub fn root() -> CacheKey {
            CacheKey::new(["views"])
        }

        /// Inbox view.
        #[must_use]
        pub fn inbox() -> CacheKey {
            root().child("inbox")
        }

        /// Today view.
        #[must_use]
        pub fn today() -> CacheKey {
            root().child("today")
        }

        /// Upcoming view starting at `from` spanning `days`.
        #[must_use]
        pub fn upcoming(from: Option<&str>, days: Option<u32>) -> CacheKey {
            root().child("upcoming").child_opt(from).child_opt(days)
        }

        /// Anytime view.
        #[must_use]
        pub fn anytime() -> CacheKey {
            root().child("anytime")
        }

        /// Someday view.
        #[must_use]
        pub fn someday() -> CacheKey {
            root().child("someday")
        }

        /// A logbook page.
        #[must_use]
        pub fn logbook(limit: Option<u32>, offset: Option<u32>) -> CacheKey {
            root().child("logbook").child_opt(limit).child_opt(offset)
        }

        /// A trash page.
        #[must_use]
        pub fn trash(limit: Option<u32>, offset: Option<u32>) -> CacheKey {
            root().child("trash").child_opt(limit).child_opt(offset)
        }

        /// Sidebar counts.
        #[must_use]
        pub fn counts() -> CacheKey {
            root().child("counts")
        }
    }

    /// Task lists and details.
    pub mod tasks {
        use super::CacheKey;
        use crate::domain::TaskId;

        /// Prefix of every task document.
        #[must_use]
        pub fn all() -> CacheKey {
            CacheKey::new(["tasks"])
        }

        /// A filtered task list; `query` is the encoded filter.
        #[must_use]
        pub fn list(query: Option<&str>) -> CacheKey {
            all().child("list").child_opt(query)
        }

        /// A task's detail record. Also the prefix of its sub-resources.
        #[must_use]
        pub fn detail(id: TaskId) -> CacheKey {
            all().child(id.to_string())
        }

        /// A task's checklist.
        #[must_use]
        pub fn checklist(id: TaskId) -> CacheKey {
            detail(id).child("checklist")
        }

        /// A task's attachments.
        #[must_use]
        pub fn attachments(id: TaskId) -> CacheKey {
            detail(id).child("attachments")
        }
    }

    /// Project lists and details.
    pub mod projects {
        use super::CacheKey;
        use crate::domain::ProjectId;

        /// Prefix of every project document.
        #[must_use]
        pub fn all() -> CacheKey {
            CacheKey::new(["projects"])
        }

        /// A project list; `query` is the encoded filter.
        #[must_use]
        pub fn list(query: Option<&str>) -> CacheKey {
            all().child("list").child_opt(query)
        }

        /// A project's detail document.
        #[must_use]
        pub fn detail(id: ProjectId) -> CacheKey {
            all().child(id.to_string())
        }
    }

    /// Area list and details.
    pub mod areas {
        use super::CacheKey;
        use crate::domain::AreaId;

        /// The area list, and the prefix of every area document.
        #[must_use]
        pub fn all() -> CacheKey {
            CacheKey::new(["areas"])
        }

        /// An area's detail document.
        #[must_use]
        pub fn detail(id: AreaId) -> CacheKey {
            all().child(id.to_string())
        }
    }

    /// Tag list and tag task lists.
    pub mod tags {
        use super::CacheKey;
        use crate::domain::TagId;

        /// The tag list, and the prefix of every tag document.
        #[must_use]
        pub fn all() -> CacheKey {
            CacheKey::new(["tags"])
        }

        /// Tasks carrying a tag.
        #[must_use]
        pub fn tasks(id: TagId) -> CacheKey {
            all().child(id.to_string()).child("tasks")
        }
    }

    /// Saved filters.
    pub mod saved_filters {
        use super::CacheKey;

        /// Prefix of every saved-filter list.
        #[must_use]
        pub fn all() -> CacheKey {
            CacheKey::new(["saved-filters"])
        }

        /// Saved filters of one view.
        #[must_use]
        pub fn view(view: &str) -> CacheKey {
            all().child(view)
        }
    }

    /// Search results for `query`.
    #[must_use]
    pub fn search(query: &str) -> CacheKey {
        CacheKey::new(["search", query])
    }

    /// Search prefix.
    #[must_use]
    pub fn search_root() -> CacheKey {
        CacheKey::new(["search"])
    }

    /// The top-level prefixes that hold entity documents.
    #[must_use]
    pub fn entity_roots() -> [CacheKey; 6] {
        [
            views::root(),
            tasks::all(),
            projects::all(),
            areas::all(),
            tags::all(),
            search_root(),
        ]
    }
}
