//! Leaf property-test list, built once per filter and cached on the root.

use crate::filter::{Filter, FilterRef, PropertyTest};

///
/// PropertyFilterList
///
/// The property-test leaves of one filter in left-to-right tree order,
/// including leaves inside `exists` sub-filters. Each entry memoizes its
/// forward/backward remainder and the count of non-constant leaves before
/// it, so value plumbing walks without rescanning the tree.
///

pub struct PropertyFilterList {
    entries: Vec<ListEntry>,
    parameter_count: usize,
}

pub struct ListEntry {
    leaf: Filter,
    ordinal: usize,
    non_constant_before: usize,
}

impl PropertyFilterList {
    pub(crate) fn build(root: &Filter) -> Self {
        let mut entries = Vec::new();
        collect_leaves(root, &mut entries);

        let mut non_constant_before = 0;
        for (ordinal, entry) in entries.iter_mut().enumerate() {
            entry.ordinal = ordinal;
            entry.non_constant_before = non_constant_before;
            if !entry.test().binding.is_constant() {
                non_constant_before += 1;
            }
        }

        Self { entries, parameter_count: non_constant_before }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of non-constant leaves: the filter's parameter count.
    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&ListEntry> {
        self.entries.get(ordinal)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ListEntry> {
        self.entries.iter()
    }

    /// Entry holding the n-th parameter (non-constant leaf).
    #[must_use]
    pub fn parameter(&self, index: usize) -> Option<&ListEntry> {
        self.entries
            .iter()
            .find(|entry| !entry.test().binding.is_constant() && entry.non_constant_before == index)
    }
}

impl ListEntry {
    #[must_use]
    pub fn test(&self) -> &PropertyTest {
        match self.leaf.shape() {
            FilterRef::Property(test) => test,
            _ => unreachable!("list entries are property leaves"),
        }
    }

    #[must_use]
    pub fn leaf(&self) -> &Filter {
        &self.leaf
    }

    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Entries at or after this one.
    #[must_use]
    pub fn remaining_forward(&self, list: &PropertyFilterList) -> usize {
        list.len() - self.ordinal
    }

    /// Entries at or before this one.
    #[must_use]
    pub const fn remaining_backward(&self) -> usize {
        self.ordinal + 1
    }

    /// Non-constant entries strictly before this one; for a non-constant
    /// entry this is its parameter position.
    #[must_use]
    pub const fn non_constant_before(&self) -> usize {
        self.non_constant_before
    }
}

fn collect_leaves(filter: &Filter, out: &mut Vec<ListEntry>) {
    match filter.shape() {
        FilterRef::Open | FilterRef::Closed => {}
        FilterRef::Property(_) => {
            out.push(ListEntry { leaf: filter.clone(), ordinal: 0, non_constant_before: 0 });
        }
        FilterRef::And(left, right) | FilterRef::Or(left, right) => {
            collect_leaves(left, out);
            collect_leaves(right, out);
        }
        FilterRef::Exists { sub, .. } => collect_leaves(sub, out),
    }
}
