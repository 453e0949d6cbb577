//! Priority map - ordered registrations per DSL name
//!
//! Each name owns two sub-lists. Entries registered with `override` live in
//! their own list, searched first. Normal entries are ordered by:
//!
//! 1. filter specificity (more constraints first),
//! 2. for equal filters, alphabetical class name, except that entries added
//!    with `prepend` stay ahead of every later entry with the same filter,
//! 3. otherwise declaration order.
//!
//! Selection walks the combined list and returns the first eligible entry, so
//! among equal-filter entries the alphabetically first class wins.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::filter::Filter;
use crate::node::Node;
use crate::types::DslName;

/// Process-unique identity of a resource or provider class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u64);

impl ClassId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Something that can be registered under a DSL name
pub trait ClassHandle: Clone {
    fn class_id(&self) -> ClassId;

    /// Fully-qualified name; the tie-break key
    fn class_name(&self) -> &str;
}

/// Registration flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Search before every normal entry and never warn
    pub overrides: bool,
    /// Place ahead of existing entries with the same filter
    pub prepend: bool,
}

impl Flags {
    pub const NONE: Self = Self {
        overrides: false,
        prepend: false,
    };
    pub const OVERRIDE: Self = Self {
        overrides: true,
        prepend: false,
    };
    pub const PREPEND: Self = Self {
        overrides: false,
        prepend: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.overrides && !self.prepend
    }
}

/// One registration
#[derive(Debug, Clone)]
pub struct Entry<C> {
    pub class: C,
    pub filter: Filter,
    pub flags: Flags,
    /// Created implicitly from a primary name rather than declared
    pub auto: bool,
}

impl<C: ClassHandle> Entry<C> {
    fn same_registration(&self, other: &Entry<C>) -> bool {
        self.class.class_id() == other.class.class_id() && self.filter == other.filter
    }
}

/// A registration that would never be selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadow {
    pub winner: String,
    pub loser: String,
    pub filter: String,
}

#[derive(Debug, Clone)]
struct PriorityList<C> {
    overrides: Vec<Entry<C>>,
    normal: Vec<Entry<C>>,
}

impl<C: ClassHandle> PriorityList<C> {
    fn new() -> Self {
        Self {
            overrides: Vec::new(),
            normal: Vec::new(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Entry<C>> {
        self.overrides.iter().chain(self.normal.iter())
    }

    fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.normal.is_empty()
    }

    fn normal_position(&self, class_name: &str, filter: &Filter, prepend: bool) -> usize {
        for (i, existing) in self.normal.iter().enumerate() {
            if filter.specificity() > existing.filter.specificity() {
                return i;
            }
            if existing.filter == *filter
                && (prepend || (!existing.flags.prepend && class_name < existing.class.class_name()))
            {
                return i;
            }
        }
        self.normal.len()
    }

    fn override_position(&self, filter: &Filter) -> usize {
        self.overrides
            .iter()
            .position(|existing| filter.specificity() >= existing.filter.specificity())
            .unwrap_or(self.overrides.len())
    }
}

/// Ordered registrations keyed by DSL name
#[derive(Debug, Clone)]
pub struct PriorityMap<C> {
    lists: BTreeMap<DslName, PriorityList<C>>,
}

impl<C: ClassHandle> PriorityMap<C> {
    pub fn new() -> Self {
        Self {
            lists: BTreeMap::new(),
        }
    }

    /// Report whether inserting this registration would leave it shadowed
    ///
    /// Only normal entries can shadow; override and prepend registrations are
    /// never reported, nor is re-registering an existing (class, filter) pair.
    pub fn shadow_for(&self, name: &DslName, class: &C, filter: &Filter, flags: Flags) -> Option<Shadow> {
        if flags.overrides || flags.prepend {
            return None;
        }
        let list = self.lists.get(name)?;
        if list
            .normal
            .iter()
            .any(|e| e.class.class_id() == class.class_id() && e.filter == *filter)
        {
            return None;
        }
        let position = list.normal_position(class.class_name(), filter, false);
        list.normal[..position]
            .iter()
            .find(|e| e.filter == *filter)
            .map(|winner| Shadow {
                winner: winner.class.class_name().to_string(),
                loser: class.class_name().to_string(),
                filter: filter.to_string(),
            })
    }

    /// Add an explicit registration
    ///
    /// Returns `false` when the same class is already registered under the
    /// name with the same filter in the same tier.
    pub fn insert(&mut self, name: DslName, class: C, filter: Filter, flags: Flags) -> bool {
        self.insert_entry(
            name,
            Entry {
                class,
                filter,
                flags,
                auto: false,
            },
        )
    }

    /// Add the implicit empty-filter registration backing a primary name
    pub fn insert_auto(&mut self, name: DslName, class: C) -> bool {
        self.insert_entry(
            name,
            Entry {
                class,
                filter: Filter::new(),
                flags: Flags::NONE,
                auto: true,
            },
        )
    }

    fn insert_entry(&mut self, name: DslName, entry: Entry<C>) -> bool {
        let list = self.lists.entry(name).or_insert_with(PriorityList::new);
        let tier = if entry.flags.overrides {
            &mut list.overrides
        } else {
            &mut list.normal
        };
        if let Some(existing) = tier.iter_mut().find(|e| e.same_registration(&entry)) {
            // An explicit registration keeps an implicit one alive.
            existing.auto &= entry.auto;
            return false;
        }

        if entry.flags.overrides {
            let position = list.override_position(&entry.filter);
            list.overrides.insert(position, entry);
        } else {
            let position =
                list.normal_position(entry.class.class_name(), &entry.filter, entry.flags.prepend);
            list.normal.insert(position, entry);
        }
        true
    }

    /// Remove the implicit registration of `class` under `name`, if any
    pub fn remove_auto(&mut self, name: &str, class: ClassId) -> bool {
        let Some(list) = self.lists.get_mut(name) else {
            return false;
        };
        let before = list.normal.len();
        list.normal
            .retain(|e| !(e.auto && e.class.class_id() == class));
        let removed = list.normal.len() < before;
        if list.is_empty() {
            self.lists.remove(name);
        }
        removed
    }

    /// Override entries followed by normal entries
    pub fn candidates(&self, name: &str) -> Vec<&Entry<C>> {
        self.lists
            .get(name)
            .map(|list| list.iter().collect())
            .unwrap_or_default()
    }

    /// First candidate whose filter matches the node
    pub fn select(&self, name: &str, node: &Node) -> Option<&C> {
        self.lists
            .get(name)?
            .iter()
            .find(|e| e.filter.matches(node))
            .map(|e| &e.class)
    }

    /// Check if `class` has any registration under `name`
    pub fn is_registered(&self, name: &str, class: ClassId) -> bool {
        self.lists
            .get(name)
            .is_some_and(|list| list.iter().any(|e| e.class.class_id() == class))
    }

    /// Test hook: forget every registration under `name`
    pub fn remove_all(&mut self, name: &str) {
        self.lists.remove(name);
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &DslName> {
        self.lists.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl<C: ClassHandle> Default for PriorityMap<C> {
    fn default() -> Self {
        Self::new()
    }
}
