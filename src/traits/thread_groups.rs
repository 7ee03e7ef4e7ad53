// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Lane served by every worker of the default pool.
pub const ANY_GROUP: &str = "any";

/// Lane served by the thread that called `Scheduler::run`.
pub const MAIN_GROUP: &str = "main";

/// Set of lanes a task may run on.
///
/// The set is never empty. It starts out as `{any}`; adding a concrete lane
/// drops `any`, since a task is either unconstrained or constrained.
///
/// ```
/// use the_conduit::traits::{ThreadGroups, MAIN_GROUP};
///
/// let groups = ThreadGroups::any().with(MAIN_GROUP);
/// assert!(!groups.is_any());
/// assert!(groups.contains(MAIN_GROUP));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadGroups {
    groups: BTreeSet<String>,
}

impl ThreadGroups {
    pub fn any() -> Self {
        Self {
            groups: BTreeSet::from([ANY_GROUP.to_string()]),
        }
    }

    pub fn main() -> Self {
        Self::only(MAIN_GROUP)
    }

    pub fn only(group: impl Into<String>) -> Self {
        Self::any().with(group)
    }

    pub fn with(mut self, group: impl Into<String>) -> Self {
        self.insert(group);
        self
    }

    pub fn insert(&mut self, group: impl Into<String>) {
        let group = group.into();
        if group == ANY_GROUP {
            // Already constrained sets stay constrained.
            return;
        }
        self.groups.remove(ANY_GROUP);
        self.groups.insert(group);
    }

    pub fn is_any(&self) -> bool {
        self.groups.contains(ANY_GROUP)
    }

    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for ThreadGroups {
    fn default() -> Self {
        Self::any()
    }
}

impl<S: Into<String>> FromIterator<S> for ThreadGroups {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter().fold(Self::any(), ThreadGroups::with)
    }
}

impl Display for ThreadGroups {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_any() {
        let groups = ThreadGroups::default();
        assert!(groups.is_any());
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_concrete_lane_removes_any() {
        let groups = ThreadGroups::any().with("gpu");
        assert!(!groups.is_any());
        assert_eq!(groups.iter().collect::<Vec<_>>(), vec!["gpu"]);
    }

    #[test]
    fn test_any_cannot_be_added_back() {
        let groups = ThreadGroups::main().with(ANY_GROUP);
        assert!(!groups.is_any());
        assert!(groups.contains(MAIN_GROUP));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_collect_from_names() {
        let groups: ThreadGroups = ["io", "main"].into_iter().collect();
        assert_eq!(groups.to_string(), "{io, main}");

        let empty: ThreadGroups = Vec::<String>::new().into_iter().collect();
        assert!(empty.is_any());
    }
}
