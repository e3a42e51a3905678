//! Backtrackable containers keyed to decision levels.
//!
//! Every write is tagged with the level it happened at. `pop_to(level)` discards all writes made
//! above `level`, restoring the state as it was when that level was current. Writes at level 0
//! are permanent.

use std::collections::{BTreeMap, btree_map};

/// A decision level, 0 is the root.
pub type Level = usize;

/// A single backtrackable value.
#[derive(Clone, Debug)]
pub struct CdValue<T> {
    value: T,
    /// `(level, value before the first write at that level)`, levels non-decreasing.
    history: Vec<(Level, T)>,
}
impl<T: Clone + PartialEq> CdValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            history: Vec::new(),
        }
    }
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        self.value
    }
    pub fn set(&mut self, level: Level, value: T) {
        if self.value == value {
            return;
        }
        if level > 0 && self.history.last().is_none_or(|&(l, _)| l < level) {
            self.history.push((level, self.value.clone()));
        }
        self.value = value;
    }
    pub fn pop_to(&mut self, level: Level) {
        while self.history.last().is_some_and(|(l, _)| *l > level) {
            if let Some((_, old)) = self.history.pop() {
                self.value = old;
            }
        }
    }
}

/// An ordered map with a write log.
#[derive(Clone, Debug)]
pub struct CdMap<K, V> {
    map: BTreeMap<K, V>,
    log: Vec<(Level, K, Option<V>)>,
}
impl<K: Ord + Clone, V: Clone> Default for CdMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
impl<K: Ord + Clone, V: Clone> CdMap<K, V> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            log: Vec::new(),
        }
    }
    pub fn get(&self, k: &K) -> Option<&V> {
        self.map.get(k)
    }
    pub fn contains_key(&self, k: &K) -> bool {
        self.map.contains_key(k)
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.map.iter()
    }
    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.map.keys()
    }
    pub fn insert(&mut self, level: Level, k: K, v: V) -> Option<V> {
        let old = self.map.insert(k.clone(), v);
        if level > 0 {
            self.log.push((level, k, old.clone()));
        }
        old
    }
    pub fn remove(&mut self, level: Level, k: &K) -> Option<V> {
        let old = self.map.remove(k);
        if level > 0 && old.is_some() {
            self.log.push((level, k.clone(), old.clone()));
        }
        old
    }
    pub fn pop_to(&mut self, level: Level) {
        while self.log.last().is_some_and(|(l, _, _)| *l > level) {
            let Some((_, k, old)) = self.log.pop() else {
                break;
            };
            match old {
                Some(v) => self.map.insert(k, v),
                None => self.map.remove(&k),
            };
        }
    }
}

/// An ordered set with a write log.
#[derive(Clone, Debug)]
pub struct CdSet<K> {
    inner: CdMap<K, ()>,
}
impl<K: Ord + Clone> Default for CdSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
impl<K: Ord + Clone> CdSet<K> {
    pub fn new() -> Self {
        Self {
            inner: CdMap::new(),
        }
    }
    pub fn contains(&self, k: &K) -> bool {
        self.inner.contains_key(k)
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn iter(&self) -> btree_map::Keys<'_, K, ()> {
        self.inner.keys()
    }
    /// Returns true if `k` was not present.
    pub fn insert(&mut self, level: Level, k: K) -> bool {
        if self.contains(&k) {
            return false;
        }
        self.inner.insert(level, k, ());
        true
    }
    /// Returns true if `k` was present.
    pub fn remove(&mut self, level: Level, k: &K) -> bool {
        self.inner.remove(level, k).is_some()
    }
    pub fn pop_to(&mut self, level: Level) {
        self.inner.pop_to(level);
    }
}

/// An append-only list truncated on backtrack.
#[derive(Clone, Debug)]
pub struct CdVec<T> {
    items: Vec<T>,
    /// `(level, length before the first push at that level)`
    marks: Vec<(Level, usize)>,
}
impl<T> Default for CdVec<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> CdVec<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            marks: Vec::new(),
        }
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
    pub fn push(&mut self, level: Level, value: T) {
        if level > 0 && self.marks.last().is_none_or(|&(l, _)| l < level) {
            self.marks.push((level, self.items.len()));
        }
        self.items.push(value);
    }
    pub fn pop_to(&mut self, level: Level) {
        while let Some(&(l, len)) = self.marks.last() {
            if l <= level {
                break;
            }
            self.items.truncate(len);
            self.marks.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_restores_first_write_of_each_level() {
        let mut v = CdValue::new(0);
        v.set(0, 1);
        v.set(2, 5);
        v.set(2, 6);
        v.set(3, 7);
        assert_eq!(v.get(), 7);
        v.pop_to(2);
        assert_eq!(v.get(), 6);
        v.pop_to(1);
        assert_eq!(v.get(), 1);
        v.pop_to(0);
        assert_eq!(v.get(), 1);
    }

    #[test]
    fn map_replays_log_backwards() {
        let mut m = CdMap::new();
        m.insert(0, 1, "root");
        m.insert(1, 2, "a");
        m.insert(2, 1, "b");
        m.remove(2, &2);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(&1, &"b")]);
        m.pop_to(1);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(&1, &"root"), (&2, &"a")]);
        m.pop_to(0);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(&1, &"root")]);
    }

    #[test]
    fn set_insert_is_idempotent() {
        let mut s = CdSet::new();
        assert!(s.insert(1, 3));
        assert!(!s.insert(2, 3));
        s.pop_to(1);
        assert!(s.contains(&3));
        s.pop_to(0);
        assert!(s.is_empty());
    }

    #[test]
    fn vec_truncates_to_level() {
        let mut v = CdVec::new();
        v.push(0, 'a');
        v.push(1, 'b');
        v.push(3, 'c');
        v.push(3, 'd');
        v.pop_to(2);
        assert_eq!(v.iter().copied().collect::<String>(), "ab");
        v.pop_to(0);
        assert_eq!(v.len(), 1);
    }
}
