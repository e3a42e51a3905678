use crate::ids::Id;
use std::mem;

/// Union find that can undo unions.
///
/// No path compression, union by size keeps `find` logarithmic. Every root owns the list of
/// members of its set.
#[derive(Clone, Debug, Default)]
pub(crate) struct UndoUnionFind<K: Id> {
    inner: Vec<UFElement<K>>,
    /// `(target, src, target set length before the union)`
    log: Vec<(K, K, usize)>,
}
#[derive(Clone, Debug)]
enum UFElement<K: Id> {
    Root { set: Vec<K> },
    Child { parent: K },
}

impl<K: Id> UndoUnionFind<K> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Vec::new(),
            log: Vec::new(),
        }
    }
    pub(crate) fn find(&self, mut i: K) -> K {
        while let UFElement::Child { parent } = &self.inner[i.into()] {
            i = *parent;
        }
        i
    }
    /// The set that this element belongs to
    pub(crate) fn set(&self, i: K) -> &[K] {
        match &self.inner[self.find(i).into()] {
            UFElement::Root { set } => set,
            UFElement::Child { .. } => unreachable!(),
        }
    }
    /// Add a new entry
    pub(crate) fn push(&mut self) -> K {
        let id: K = self.inner.len().into();
        self.inner.push(UFElement::Root { set: vec![id] });
        id
    }
    /// Union `i` and `j`, returning `(new root, absorbed root)` if they were distinct.
    pub(crate) fn union(&mut self, i: K, j: K) -> Option<(K, K)> {
        let (mut target, mut src) = (self.find(i), self.find(j));
        if target == src {
            return None;
        }
        if self.set(target).len() < self.set(src).len() {
            (target, src) = (src, target);
        }
        let src_item = mem::replace(
            &mut self.inner[src.into()],
            UFElement::Child { parent: target },
        );
        let UFElement::Root { set: src_set } = src_item else {
            unreachable!()
        };
        let UFElement::Root { set: target_set } = &mut self.inner[target.into()] else {
            unreachable!()
        };
        self.log.push((target, src, target_set.len()));
        target_set.extend(src_set);
        Some((target, src))
    }
    /// Number of unions performed and not undone.
    pub(crate) fn mark(&self) -> usize {
        self.log.len()
    }
    pub(crate) fn undo_to(&mut self, mark: usize) {
        while self.log.len() > mark {
            let Some((target, src, len)) = self.log.pop() else {
                break;
            };
            let UFElement::Root { set: target_set } = &mut self.inner[target.into()] else {
                unreachable!()
            };
            let moved = target_set.split_off(len);
            self.inner[src.into()] = UFElement::Root { set: moved };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UndoUnionFind;
    use crate::ids::TermId;

    #[test]
    fn union_then_undo() {
        let mut uf: UndoUnionFind<TermId> = UndoUnionFind::new();
        let t: Vec<TermId> = (0..4).map(|_| uf.push()).collect();
        assert_eq!(uf.union(t[0], t[1]), Some((t[0], t[1])));
        let mark = uf.mark();
        assert_eq!(uf.union(t[2], t[1]), Some((t[0], t[2])));
        assert_eq!(uf.union(t[3], t[2]), Some((t[0], t[3])));
        assert_eq!(uf.set(t[3]), &[t[0], t[1], t[2], t[3]]);
        assert_eq!(uf.union(t[1], t[3]), None);

        uf.undo_to(mark);
        assert_eq!(uf.find(t[1]), t[0]);
        assert_eq!(uf.find(t[2]), t[2]);
        assert_eq!(uf.set(t[0]), &[t[0], t[1]]);
        assert_eq!(uf.set(t[3]), &[t[3]]);
    }
}
