//! TVec: Vec with typed indexes

use crate::ids::Id;
use std::{fmt::Debug, marker::PhantomData};

/// Vec with typed indexes.
#[derive(Clone, Eq, PartialEq)]
pub(crate) struct TVec<K, V> {
    x: Vec<V>,
    _marker: PhantomData<K>,
}

impl<K: Id, V> Default for TVec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Id, V> TVec<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            x: Vec::new(),
            _marker: PhantomData,
        }
    }
    pub(crate) fn len(&self) -> usize {
        self.x.len()
    }
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.x.iter_mut()
    }
    /// Ids of the first `n` elements.
    pub(crate) fn ids_below(&self, n: usize) -> impl Iterator<Item = K> + use<K, V> {
        (0..n.min(self.len())).map(K::from)
    }
    /// `.iter().enumerate()` with typed indexes
    pub(crate) fn iter_enumerate(&self) -> impl Iterator<Item = (K, &V)> {
        (0..).map(K::from).zip(self.x.iter())
    }
    pub(crate) fn push(&mut self, v: V) -> K {
        let id = self.x.len().into();
        self.x.push(v);
        id
    }
    /// Borrow two distinct elements mutably.
    pub(crate) fn pair_mut(&mut self, a: K, b: K) -> (&mut V, &mut V) {
        let (a, b): (usize, usize) = (a.into(), b.into());
        assert_ne!(a, b, "pair_mut on a single element");
        if a < b {
            let (lo, hi) = self.x.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.x.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }
}

impl<K: Id, V> std::ops::Index<K> for TVec<K, V> {
    type Output = V;

    fn index(&self, idx: K) -> &Self::Output {
        &self.x[idx.into()]
    }
}
impl<K: Id, V> std::ops::IndexMut<K> for TVec<K, V> {
    fn index_mut(&mut self, idx: K) -> &mut Self::Output {
        &mut self.x[idx.into()]
    }
}
impl<K: Id + Debug, V: Debug> Debug for TVec<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter_enumerate()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::TVec;
    use crate::ids::RegionId;

    #[test]
    fn pair_mut_both_orders() {
        let mut v: TVec<RegionId, u32> = TVec::new();
        let a = v.push(1);
        let b = v.push(2);
        {
            let (x, y) = v.pair_mut(b, a);
            *x += 10;
            *y += 20;
        }
        assert_eq!((v[a], v[b]), (21, 12));
    }
}
