use super::{Investigation, InvestigationSnapshot};

/// Position of a live investigation inside the arena.
///
/// Indices are only meaningful for the arena that produced them and are
/// recycled after removal; the investigation `id` is the stable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterIndex(usize);

impl ClusterIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Arena of live investigations addressed by index.
///
/// Every pipeline stage receives the arena plus the indices it should look
/// at, so mutation order is explicit. Iteration follows slot order; because
/// freed slots are reused, that order is not creation order.
#[derive(Debug, Default)]
pub struct InvestigationArena {
    slots: Vec<Option<Investigation>>,
    free: Vec<usize>,
    next_seq: u64,
}

impl InvestigationArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next never-before-used investigation id.
    pub fn allocate_id(&mut self) -> String {
        self.next_seq += 1;
        format!("inv-{:06}", self.next_seq)
    }

    pub fn insert(&mut self, investigation: Investigation) -> ClusterIndex {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(investigation);
                ClusterIndex(slot)
            }
            None => {
                self.slots.push(Some(investigation));
                ClusterIndex(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, index: ClusterIndex) -> Option<Investigation> {
        let removed = self.slots.get_mut(index.0)?.take();
        if removed.is_some() {
            self.free.push(index.0);
        }
        removed
    }

    pub fn get(&self, index: ClusterIndex) -> Option<&Investigation> {
        self.slots.get(index.0)?.as_ref()
    }

    pub fn get_mut(&mut self, index: ClusterIndex) -> Option<&mut Investigation> {
        self.slots.get_mut(index.0)?.as_mut()
    }

    pub fn contains(&self, index: ClusterIndex) -> bool {
        self.get(index).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indices of all live investigations, in iteration order.
    pub fn indices(&self) -> Vec<ClusterIndex> {
        self.iter().map(|(index, _)| index).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClusterIndex, &Investigation)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|inv| (ClusterIndex(slot), inv)))
    }

    pub fn find(&self, id: &str) -> Option<ClusterIndex> {
        self.iter().find(|(_, inv)| inv.id == id).map(|(index, _)| index)
    }

    pub fn snapshot(&self) -> Vec<InvestigationSnapshot> {
        self.iter().map(|(_, inv)| inv.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::test_support::investigation;

    #[test]
    fn ids_are_never_reused_even_when_slots_are() {
        let mut arena = InvestigationArena::new();
        let first_id = arena.allocate_id();
        let first = arena.insert(investigation(&first_id, vec![1.0], 1));
        arena.remove(first);

        let second_id = arena.allocate_id();
        let second = arena.insert(investigation(&second_id, vec![1.0], 1));

        assert_eq!(first, second);
        assert_ne!(first_id, second_id);
        assert_eq!(arena.get(second).map(|inv| inv.id.as_str()), Some(second_id.as_str()));
    }

    #[test]
    fn removal_updates_length_and_membership() {
        let mut arena = InvestigationArena::new();
        let a = arena.insert(investigation("a", vec![1.0], 1));
        let b = arena.insert(investigation("b", vec![1.0], 1));

        assert_eq!(arena.len(), 2);
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.indices(), vec![b]);
        assert_eq!(arena.find("b"), Some(b));
        assert_eq!(arena.find("a"), None);
    }
}
