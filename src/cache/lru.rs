//! Byte-budgeted LRU store.
//!
//! ```text
//!   head (MRU) ──► [A] ◄──► [B] ◄──► [C] ◄── tail (LRU)
//! ```
//!
//! Entries live in a slab (`Vec<Option<Slot>>`) and are linked by index, so the
//! recency list needs no raw pointers. `index` maps each key to its slot.
//!
//! `LruStore` is **not** thread-safe; [`super::concurrent::ConcurrentCache`]
//! wraps it in a mutex.

use super::byteview::ByteView;
use std::collections::HashMap;

/// Fixed bookkeeping charge added to every entry's size.
pub const ENTRY_OVERHEAD: u64 = 16;

/// Callback fired for every entry the store evicts to honour its budget.
pub type OnEvicted = Box<dyn FnMut(&str, &ByteView) + Send>;

/// Bytes an entry with this key and value is charged against the budget.
pub fn entry_size(key: &str, value: &ByteView) -> u64 {
    key.len() as u64 + value.len() as u64 + ENTRY_OVERHEAD
}

struct Slot {
    key: String,
    value: ByteView,
    size: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct LruStore {
    capacity_bytes: u64,
    used_bytes: u64,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    evictions: u64,
    on_evicted: Option<OnEvicted>,
}

impl LruStore {
    /// Creates a store. `capacity_bytes == 0` means no eviction.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            evictions: 0,
            on_evicted: None,
        }
    }

    pub fn with_on_evicted(mut self, callback: OnEvicted) -> Self {
        self.on_evicted = Some(callback);
        self
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let id = *self.index.get(key)?;
        self.move_to_front(id);
        self.slot(id).map(|slot| slot.value.clone())
    }

    /// Looks up `key` without touching recency.
    pub fn peek(&self, key: &str) -> Option<&ByteView> {
        let id = *self.index.get(key)?;
        self.slot(id).map(|slot| &slot.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or updates `key`, then evicts from the LRU end until the
    /// budget holds again.
    pub fn add(&mut self, key: &str, value: ByteView) {
        let size = entry_size(key, &value);

        if let Some(&id) = self.index.get(key) {
            if let Some(slot) = self.slots[id].as_mut() {
                self.used_bytes = self.used_bytes - slot.size + size;
                slot.value = value;
                slot.size = size;
            }
            self.move_to_front(id);
        } else {
            let slot = Slot {
                key: key.to_string(),
                value,
                size,
                prev: None,
                next: None,
            };
            let id = match self.free.pop() {
                Some(id) => {
                    self.slots[id] = Some(slot);
                    id
                }
                None => {
                    self.slots.push(Some(slot));
                    self.slots.len() - 1
                }
            };
            self.index.insert(key.to_string(), id);
            self.push_front(id);
            self.used_bytes += size;
        }

        while self.capacity_bytes != 0 && self.used_bytes > self.capacity_bytes && self.tail.is_some()
        {
            if let Some((evicted_key, evicted_value)) = self.remove_oldest() {
                self.evictions += 1;
                if let Some(callback) = self.on_evicted.as_mut() {
                    callback(&evicted_key, &evicted_value);
                }
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ByteView> {
        let id = self.index.remove(key)?;
        self.take_slot(id).map(|slot| slot.value)
    }

    /// Drops the least recently used entry and returns it.
    pub fn remove_oldest(&mut self) -> Option<(String, ByteView)> {
        let id = self.tail?;
        let slot = self.take_slot(id)?;
        self.index.remove(&slot.key);
        Some((slot.key, slot.value))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.used_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Entries removed to honour the byte budget (explicit removals excluded).
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(slot) = self.slot(id) else { break };
            keys.push(slot.key.clone());
            cursor = slot.next;
        }
        keys
    }

    fn slot(&self, id: usize) -> Option<&Slot> {
        self.slots.get(id).and_then(|slot| slot.as_ref())
    }

    fn take_slot(&mut self, id: usize) -> Option<Slot> {
        self.unlink(id);
        let slot = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        self.used_bytes -= slot.size;
        Some(slot)
    }

    fn move_to_front(&mut self, id: usize) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(id);
        self.push_front(id);
    }

    fn push_front(&mut self, id: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[id].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(head) = old_head
            && let Some(slot) = self.slots[head].as_mut()
        {
            slot.prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    fn unlink(&mut self, id: usize) {
        let Some((prev, next)) = self.slot(id).map(|slot| (slot.prev, slot.next)) else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(slot) = self.slots[p].as_mut() {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = self.slots[n].as_mut() {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(slot) = self.slots[id].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }
}
