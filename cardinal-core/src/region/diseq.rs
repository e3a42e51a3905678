use crate::{
    context::{CdSet, CdValue, Level},
    ids::TermId,
};

/// Whether a disequality edge stays inside a region.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiseqKind {
    External,
    Internal,
}
impl DiseqKind {
    pub const ALL: [DiseqKind; 2] = [DiseqKind::External, DiseqKind::Internal];

    pub fn of(same_region: bool) -> Self {
        if same_region {
            Self::Internal
        } else {
            Self::External
        }
    }
}

/// The terms a node is disequal to, from the node's side.
#[derive(Clone, Debug, Default)]
pub struct DisequalityList {
    set: CdSet<TermId>,
}
impl DisequalityList {
    pub fn contains(&self, other: TermId) -> bool {
        self.set.contains(&other)
    }
    pub fn len(&self) -> usize {
        self.set.len()
    }
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = TermId> + '_ {
        self.set.iter().copied()
    }
    /// Returns true if membership changed.
    pub(super) fn set_disequal(&mut self, level: Level, other: TermId, valid: bool) -> bool {
        if valid {
            self.set.insert(level, other)
        } else {
            self.set.remove(level, &other)
        }
    }
    fn pop_to(&mut self, level: Level) {
        self.set.pop_to(level);
    }
}

/// A term's slot in one region.
#[derive(Clone, Debug)]
pub struct RegionNodeInfo {
    valid: CdValue<bool>,
    lists: [DisequalityList; 2],
}
impl RegionNodeInfo {
    pub(super) fn new() -> Self {
        Self {
            valid: CdValue::new(false),
            lists: Default::default(),
        }
    }
    pub fn valid(&self) -> bool {
        self.valid.get()
    }
    pub(super) fn set_valid(&mut self, level: Level, valid: bool) {
        self.valid.set(level, valid);
    }
    pub fn list(&self, kind: DiseqKind) -> &DisequalityList {
        &self.lists[kind as usize]
    }
    pub(super) fn list_mut(&mut self, kind: DiseqKind) -> &mut DisequalityList {
        &mut self.lists[kind as usize]
    }
    pub fn num_external(&self) -> usize {
        self.list(DiseqKind::External).len()
    }
    pub fn num_internal(&self) -> usize {
        self.list(DiseqKind::Internal).len()
    }
    pub fn num_disequalities(&self) -> usize {
        self.num_external() + self.num_internal()
    }
    pub(super) fn pop_to(&mut self, level: Level) {
        self.valid.pop_to(level);
        for list in &mut self.lists {
            list.pop_to(level);
        }
    }
}
