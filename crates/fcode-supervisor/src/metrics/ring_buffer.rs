use parking_lot::Mutex;

struct Slots<T> {
    items: Vec<Option<T>>,
    next: usize,
    len: usize,
}

/// Fixed-capacity circular buffer; once full, each `add` overwrites the oldest item.
pub struct BoundedRingBuffer<T> {
    capacity: usize,
    slots: Mutex<Slots<T>>,
}

impl<T: Clone> BoundedRingBuffer<T> {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be greater than zero");
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || None);
        Self {
            capacity,
            slots: Mutex::new(Slots { items, next: 0, len: 0 }),
        }
    }

    pub fn add(&self, item: T) {
        let mut slots = self.slots.lock();
        let idx = slots.next;
        slots.items[idx] = Some(item);
        slots.next = (idx + 1) % self.capacity;
        if slots.len < self.capacity {
            slots.len += 1;
        }
    }

    /// The `min(n, len)` most recently added items, newest first.
    pub fn get_last(&self, n: usize) -> Vec<T> {
        let slots = self.slots.lock();
        let take = n.min(slots.len);
        let mut out = Vec::with_capacity(take);
        for offset in 1..=take {
            let idx = (slots.next + self.capacity - offset) % self.capacity;
            if let Some(ref item) = slots.items[idx] {
                out.push(item.clone());
            }
        }
        out
    }

    /// Every held item, newest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.get_last(self.capacity)
    }

    /// Mean of `selector` over the held items; `0.0` when empty.
    pub fn get_average<F>(&self, selector: F) -> f64
    where
        F: Fn(&T) -> f64,
    {
        let slots = self.slots.lock();
        if slots.len == 0 {
            return 0.0;
        }
        let sum: f64 = slots.items.iter().flatten().map(&selector).sum();
        sum / slots.len as f64
    }

    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.slots.lock().items.iter().flatten().filter(|item| predicate(item)).count()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        slots.items.iter_mut().for_each(|slot| *slot = None);
        slots.next = 0;
        slots.len = 0;
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for BoundedRingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedRingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
