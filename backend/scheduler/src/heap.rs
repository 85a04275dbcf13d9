//! Binary min-heap ordered by a key extracted from each item.
//!
//! Unlike `std::collections::BinaryHeap` the ordering is not tied to an `Ord`
//! impl on the item itself, and items may be mutated in place through
//! [`KeyedHeap::iter_mut`] as long as [`KeyedHeap::reheapify_all`] is called
//! before the next `peek_min`/`pop_min`/`insert`.

pub struct KeyedHeap<T, K, F>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    items: Vec<T>,
    key: F,
}

impl<T, K, F> KeyedHeap<T, K, F>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    pub fn new(key: F) -> Self {
        Self {
            items: Vec::new(),
            key,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// O(log n).
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    /// Item with the smallest key, without removing it. O(1).
    pub fn peek_min(&self) -> Option<&T> {
        self.items.first()
    }

    /// Remove and return the item with the smallest key. O(log n).
    pub fn pop_min(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let min = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        min
    }

    /// Restore the heap invariant after keys were rewritten in place. O(n).
    pub fn reheapify_all(&mut self) {
        for i in (0..self.items.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Items in storage order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Mutable access in storage order. Changing keys breaks the heap
    /// invariant until `reheapify_all` is called.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.key)(&self.items[a]) < (self.key)(&self.items[b])
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.items.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.items.swap(i, smallest);
            i = smallest;
        }
    }
}
