//! Generational registry of live requesters.
//!
//! Background requests never hold their requester directly. They carry a
//! [`Handle`], and the presentation context resolves it against the
//! [`Registry`] when the result arrives. A handle whose slot was emptied, or
//! reused by a newer requester, resolves to nothing.
use std::fmt;

/// Non-owning reference to a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u64,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

#[derive(Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value built from its own handle, so the value can tag the
    /// requests it submits.
    pub fn insert_with<F>(&mut self, build: F) -> Handle
    where
        F: FnOnce(Handle) -> T,
    {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.generation += 1;
        let handle = Handle {
            index,
            generation: slot.generation,
        };
        slot.value = Some(build(handle));
        handle
    }

    pub fn insert(&mut self, value: T) -> Handle {
        self.insert_with(|_| value)
    }

    /// Tears down the entry. Outstanding handles to it go dead.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }

        let value = slot.value.take()?;
        self.free.push(handle.index);
        Some(value)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_resolve() {
        let mut registry = Registry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");

        assert_eq!(registry.get(a), Some(&"a"));
        assert_eq!(registry.get(b), Some(&"b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn removed_handle_is_dead() {
        let mut registry = Registry::new();
        let handle = registry.insert(1);

        assert_eq!(registry.remove(handle), Some(1));
        assert!(!registry.is_live(handle));
        assert_eq!(registry.get_mut(handle), None);
        assert_eq!(registry.remove(handle), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn reused_slot_does_not_revive_old_handle() {
        let mut registry = Registry::new();
        let old = registry.insert("old");
        registry.remove(old);
        let new = registry.insert("new");

        assert_ne!(old, new);
        assert_eq!(registry.get(old), None);
        assert_eq!(registry.get(new), Some(&"new"));
    }

    #[test]
    fn insert_with_sees_own_handle() {
        let mut registry = Registry::new();
        let handle = registry.insert_with(|handle| handle);

        assert_eq!(registry.get(handle), Some(&handle));
    }
}
