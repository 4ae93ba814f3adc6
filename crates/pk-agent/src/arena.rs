//! Fixed-capacity generational arena.
//!
//! Records live in a contiguous `Vec` of slots; released slots go on a free
//! list and are reused LIFO.  Every release bumps the slot's generation, so
//! an id `(slot, generation)` handed out before the release no longer
//! resolves:
//!
//! ```ignore
//! let a = arena.insert(x).unwrap();   // (0, 0)
//! arena.remove(a);
//! let b = arena.insert(y).unwrap();   // (0, 1)
//! assert!(arena.get(a).is_none());
//! ```

use std::marker::PhantomData;

use pk_core::PoolId;

struct Slot<T> {
    generation: u32,
    value:      Option<T>,
}

pub struct Arena<K: PoolId, T> {
    slots:    Vec<Slot<T>>,
    free:     Vec<u32>,
    len:      usize,
    capacity: usize,
    _key:     PhantomData<K>,
}

impl<K: PoolId, T> Arena<K, T> {
    /// An empty arena that refuses inserts beyond `capacity` live records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            capacity,
            _key: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `value`; `None` when the pool is full.
    pub fn insert(&mut self, value: T) -> Option<K> {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.value = Some(value);
            self.len += 1;
            return Some(K::from_parts(slot, entry.generation));
        }
        if self.slots.len() >= self.capacity {
            return None;
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, value: Some(value) });
        self.len += 1;
        Some(K::from_parts(slot, 0))
    }

    pub fn remove(&mut self, id: K) -> Option<T> {
        let entry = self.slots.get_mut(id.slot() as usize)?;
        if entry.generation != id.generation() {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot());
        self.len -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, id: K) -> Option<&T> {
        self.slots
            .get(id.slot() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.value.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.slots
            .get_mut(id.slot() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.value.as_mut())
    }

    #[inline]
    pub fn contains(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    /// Current id of the record in `slot`, if occupied.  Spatial grids store
    /// bare slots; this turns them back into checked ids.
    pub fn id_at_slot(&self, slot: u32) -> Option<K> {
        let s = self.slots.get(slot as usize)?;
        s.value.as_ref().map(|_| K::from_parts(slot, s.generation))
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| (K::from_parts(i as u32, s.generation), v))
        })
    }

    pub fn ids(&self) -> Vec<K> {
        self.iter().map(|(id, _)| id).collect()
    }
}
