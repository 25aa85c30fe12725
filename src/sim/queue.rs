//! Tick-ordered event scheduler.
//!
//! A binary min-heap of delayed payloads keyed by remaining ticks. The
//! driver instantiates it with its action enum; the heap itself is generic
//! and carries no simulation knowledge.

const TOP: usize = 0;

const fn parent(i: usize) -> usize {
    ((i + 1) >> 1) - 1
}

const fn left(i: usize) -> usize {
    (i << 1) + 1
}

const fn right(i: usize) -> usize {
    (i + 1) << 1
}

/// Opaque handle to a scheduled event, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

/// One pending event.
#[derive(Debug, Clone)]
struct Entry<T> {
    /// Ticks until this entry fires; fires at <= 0.
    remaining: i32,
    handle: EventHandle,
    payload: T,
}

/// Min-priority queue of delayed events ordered by remaining ticks.
///
/// Ties are broken arbitrarily — extraction order among equal keys is not
/// stable. Insertion and extraction are O(log n), peek is O(1),
/// cancellation is an O(n) scan plus an O(log n) fix-up.
#[derive(Debug, Clone)]
pub struct TickQueue<T> {
    entries: Vec<Entry<T>>,
    next_handle: u64,
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TickQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
        }
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remaining ticks of the soonest pending event.
    #[must_use]
    pub fn peek_next(&self) -> Option<i32> {
        self.entries.first().map(|e| e.remaining)
    }

    /// Release backing capacity beyond the current number of entries.
    pub fn trim(&mut self) {
        self.entries.shrink_to_fit();
    }

    /// Schedule `payload` to fire after `ticks` ticks.
    ///
    /// Durations are positive at creation; `ticks` is clamped to at least 1,
    /// so the earliest an event can fire is the next tick.
    pub fn schedule(&mut self, ticks: u32, payload: T) -> EventHandle {
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        let remaining = i32::try_from(ticks.max(1)).unwrap_or(i32::MAX);
        self.entries.push(Entry {
            remaining,
            handle,
            payload,
        });
        self.sift_up(self.entries.len() - 1);
        handle
    }

    /// Cancel a pending event.
    ///
    /// Returns `true` if the event was still pending and has been removed.
    /// An already-fired, already-cancelled, or unknown handle is a no-op
    /// returning `false`, never an error.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        match self.entries.iter().position(|e| e.handle == handle) {
            Some(idx) => {
                self.remove_at(idx);
                true
            }
            None => false,
        }
    }

    /// Replace the soonest pending event with a new one.
    ///
    /// Cheaper than an extract-then-insert pair: the root entry is swapped
    /// in place and a single sift-down restores the heap. Returns the fresh
    /// handle and the displaced payload (`None` on an empty queue, which
    /// degenerates to a plain insertion).
    pub fn replace_next(&mut self, ticks: u32, payload: T) -> (EventHandle, Option<T>) {
        if self.entries.is_empty() {
            return (self.schedule(ticks, payload), None);
        }
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        let remaining = i32::try_from(ticks.max(1)).unwrap_or(i32::MAX);
        let displaced = std::mem::replace(
            &mut self.entries[TOP],
            Entry {
                remaining,
                handle,
                payload,
            },
        );
        self.sift_down(TOP);
        (handle, Some(displaced.payload))
    }

    /// Advance simulated time by one tick.
    ///
    /// Decrements every pending event, then extracts and returns all events
    /// that have reached zero, in ascending order of remaining ticks.
    pub fn tick(&mut self) -> Vec<T> {
        // A uniform decrement shifts every key equally, so the heap
        // property is untouched.
        for entry in &mut self.entries {
            entry.remaining -= 1;
        }

        let mut fired = Vec::new();
        while self.peek_next().is_some_and(|r| r <= 0) {
            if let Some(payload) = self.pop_next() {
                fired.push(payload);
            }
        }
        fired
    }

    fn pop_next(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let bottom = self.entries.len() - 1;
        if bottom > TOP {
            self.entries.swap(TOP, bottom);
        }
        let popped = self.entries.pop().map(|e| e.payload);
        self.sift_down(TOP);
        popped
    }

    fn remove_at(&mut self, idx: usize) {
        let bottom = self.entries.len() - 1;
        if idx < bottom {
            self.entries.swap(idx, bottom);
        }
        self.entries.pop();
        if idx < self.entries.len() {
            // The swapped-in entry may be out of place in either direction.
            self.sift_down(idx);
            self.sift_up(idx);
        }
    }

    fn higher_priority(&self, i: usize, j: usize) -> bool {
        self.entries[i].remaining < self.entries[j].remaining
    }

    fn sift_up(&mut self, start: usize) {
        let mut node = start;
        while node > TOP && self.higher_priority(node, parent(node)) {
            self.entries.swap(node, parent(node));
            node = parent(node);
        }
    }

    fn sift_down(&mut self, start: usize) {
        let size = self.entries.len();
        let mut node = start;
        loop {
            let l = left(node);
            let r = right(node);
            let mut next = node;
            if l < size && self.higher_priority(l, next) {
                next = l;
            }
            if r < size && self.higher_priority(r, next) {
                next = r;
            }
            if next == node {
                break;
            }
            self.entries.swap(node, next);
            node = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_heap<T>(queue: &TickQueue<T>) {
        for i in 1..queue.entries.len() {
            assert!(
                queue.entries[parent(i)].remaining <= queue.entries[i].remaining,
                "heap property violated at index {i}"
            );
        }
    }

    #[test]
    fn test_fires_in_ascending_order() {
        let mut queue = TickQueue::new();
        queue.schedule(3, "three");
        queue.schedule(1, "one");
        queue.schedule(2, "two");

        assert_eq!(queue.tick(), vec!["one"]);
        assert_eq!(queue.tick(), vec!["two"]);
        assert_eq!(queue.tick(), vec!["three"]);
        assert!(queue.is_empty());
        assert!(queue.tick().is_empty());
    }

    #[test]
    fn test_same_tick_events_all_fire() {
        let mut queue = TickQueue::new();
        queue.schedule(1, 'a');
        queue.schedule(1, 'b');
        queue.schedule(2, 'c');

        let mut fired = queue.tick();
        fired.sort_unstable();
        assert_eq!(fired, vec!['a', 'b']);
        assert_eq!(queue.tick(), vec!['c']);
    }

    #[test]
    fn test_peek_tracks_minimum() {
        let mut queue = TickQueue::new();
        assert_eq!(queue.peek_next(), None);

        queue.schedule(5, ());
        queue.schedule(2, ());
        queue.schedule(9, ());
        assert_eq!(queue.peek_next(), Some(2));
        assert_heap(&queue);

        queue.tick();
        assert_eq!(queue.peek_next(), Some(1));
    }

    #[test]
    fn test_cancel_pending_event() {
        let mut queue = TickQueue::new();
        let keep = queue.schedule(2, "keep");
        let drop = queue.schedule(1, "drop");

        assert!(queue.cancel(drop));
        assert!(!queue.cancel(drop), "double cancel is a no-op");
        assert_heap(&queue);

        assert!(queue.tick().is_empty());
        assert_eq!(queue.tick(), vec!["keep"]);
        assert!(!queue.cancel(keep), "fired handle is a no-op");
    }

    #[test]
    fn test_cancel_inner_node_keeps_heap() {
        let mut queue = TickQueue::new();
        let handles: Vec<_> = [7u32, 3, 9, 1, 5, 8, 2]
            .iter()
            .map(|&t| queue.schedule(t, t))
            .collect();

        assert!(queue.cancel(handles[1]));
        assert!(queue.cancel(handles[4]));
        assert_heap(&queue);

        let mut fired = Vec::new();
        for _ in 0..10 {
            fired.extend(queue.tick());
        }
        assert_eq!(fired, vec![1, 2, 7, 8, 9]);
    }

    #[test]
    fn test_replace_next_swaps_root() {
        let mut queue = TickQueue::new();
        queue.schedule(1, "soon");
        queue.schedule(6, "late");

        let (_, displaced) = queue.replace_next(4, "middle");
        assert_eq!(displaced, Some("soon"));
        assert_heap(&queue);

        let mut fired = Vec::new();
        for _ in 0..6 {
            fired.extend(queue.tick());
        }
        assert_eq!(fired, vec!["middle", "late"]);
    }

    #[test]
    fn test_replace_next_on_empty_inserts() {
        let mut queue = TickQueue::new();
        let (handle, displaced) = queue.replace_next(2, 42);
        assert_eq!(displaced, None);
        assert_eq!(queue.len(), 1);
        assert!(queue.cancel(handle));
    }

    #[test]
    fn test_zero_duration_clamps_to_next_tick() {
        let mut queue = TickQueue::new();
        queue.schedule(0, ());
        assert!(queue.tick().len() == 1);
    }

    #[test]
    fn test_trim_preserves_entries() {
        let mut queue = TickQueue::new();
        for t in 1..=64u32 {
            queue.schedule(t, t);
        }
        for _ in 0..60 {
            queue.tick();
        }
        queue.trim();
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.peek_next(), Some(1));
    }

    #[test]
    fn test_heap_property_under_churn() {
        let mut queue = TickQueue::new();
        let mut handles = Vec::new();
        for t in [13u32, 4, 21, 1, 9, 17, 2, 30, 6] {
            handles.push(queue.schedule(t, t));
        }
        assert_heap(&queue);
        queue.cancel(handles[2]);
        assert_heap(&queue);
        queue.tick();
        assert_heap(&queue);
        queue.schedule(3, 99);
        assert_heap(&queue);
    }
}
