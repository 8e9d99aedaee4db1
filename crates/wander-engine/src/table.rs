/// Append-only id table with a single release path.
///
/// Ids are never reused, so a stale id can only ever miss; it cannot alias a
/// newer object.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> ResourceTable<T> {
    pub fn insert(&mut self, value: T) -> u32 {
        let id = self.slots.len() as u32;
        self.slots.push(Some(value));
        id
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Takes the value out of its slot. Removing twice returns `None`.
    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.slots.get_mut(id as usize).and_then(Option::take)
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entries.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Ids of every live entry, in creation order.
    pub fn ids(&self) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i as u32))
            .collect()
    }

    /// Removes every live entry, yielding them in creation order.
    pub fn drain(&mut self) -> impl Iterator<Item = (u32, T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.take().map(|v| (i as u32, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused() {
        let mut t = ResourceTable::default();
        let a = t.insert("a");
        assert_eq!(t.remove(a), Some("a"));
        let b = t.insert("b");
        assert_ne!(a, b);
        assert!(t.get(a).is_none());
        assert_eq!(t.get(b), Some(&"b"));
    }

    #[test]
    fn double_remove_is_noop() {
        let mut t = ResourceTable::default();
        let a = t.insert(1);
        assert_eq!(t.remove(a), Some(1));
        assert_eq!(t.remove(a), None);
        assert_eq!(t.remove(99), None);
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn drain_empties_in_order() {
        let mut t = ResourceTable::default();
        t.insert('x');
        let y = t.insert('y');
        t.insert('z');
        t.remove(y);
        let drained: Vec<_> = t.drain().collect();
        assert_eq!(drained, vec![(0, 'x'), (2, 'z')]);
        assert_eq!(t.live(), 0);
        assert!(t.ids().is_empty());
    }
}
