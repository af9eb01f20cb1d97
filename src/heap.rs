//! Bounded binary heap.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Heap operation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Insert attempted on a full heap.
    Capacity { capacity: usize },
    /// Extract attempted on an empty heap.
    Underflow,
}

impl Error for HeapError {}

impl Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            HeapError::Capacity { capacity } => write!(f, "heap is full (capacity: {})", capacity),
            HeapError::Underflow => write!(f, "heap is empty"),
        }
    }
}

/// Fixed-capacity array-backed binary heap.
///
/// The backing array is treated as an implicit binary tree rooted at node 1:
/// the children of node `n` are `2n` and `2n + 1`, its parent is `n / 2`.
/// The priority order is injected as a comparison function: the element
/// comparing [`Ordering::Greater`] outranks its descendants. A natural-order
/// comparator therefore yields a max-heap, a reversed one a min-heap, and the
/// same sift logic serves both.
///
/// The heap is created with a fixed capacity and never grows.
pub struct BoundedHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    slots: Vec<T>,
    size: usize,
    capacity: usize,
    compare: F,
}

impl<T, F> BoundedHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty heap holding at most `capacity` elements.
    pub fn new(capacity: usize, compare: F) -> Self {
        BoundedHeap {
            slots: Vec::with_capacity(capacity),
            size: 0,
            capacity,
            compare,
        }
    }

    /// Current number of live elements.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The raw backing contents in array order, not sorted order.
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Places `item` at the first free leaf and sifts it up until its parent
    /// outranks it.
    pub fn insert(&mut self, item: T) -> Result<(), HeapError> {
        if self.size == self.capacity {
            return Err(HeapError::Capacity {
                capacity: self.capacity,
            });
        }

        self.slots.push(item);
        self.size += 1;
        self.sift_up(self.size);

        return Ok(());
    }

    /// Removes and returns the root element.
    ///
    /// The last leaf is swapped into the root slot and sifted down, at each
    /// step descending into the higher-priority child, until both children
    /// rank below it or it reaches the bottom.
    pub fn extract_root(&mut self) -> Result<T, HeapError> {
        if self.size == 0 {
            return Err(HeapError::Underflow);
        }

        let root = self.slots.swap_remove(0);
        self.size -= 1;
        self.sift_down(1);

        return Ok(root);
    }

    /// Drains the heap and returns the backing array, ordered ascending under
    /// the comparator.
    ///
    /// Each extraction parks the outgoing root just behind the shrinking heap
    /// tail, so once the heap has collapsed the array reads back fully sorted.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        while self.size > 1 {
            self.slots.swap(0, self.size - 1);
            self.size -= 1;
            self.sift_down(1);
        }

        self.slots
    }

    fn sift_up(&mut self, mut n: usize) {
        while n > 1 {
            let parent = n / 2;
            if !self.outranks(n, parent) {
                break;
            }
            self.slots.swap(n - 1, parent - 1);
            n = parent;
        }
    }

    fn sift_down(&mut self, mut n: usize) {
        loop {
            let left = n * 2;
            let right = n * 2 + 1;
            if left > self.size {
                break;
            }

            // With no right child in range the left child is the sole candidate.
            let candidate = if right <= self.size && self.outranks(right, left) {
                right
            } else {
                left
            };

            if !self.outranks(candidate, n) {
                break;
            }
            self.slots.swap(candidate - 1, n - 1);
            n = candidate;
        }
    }

    /// Whether node `a` must sit closer to the root than node `b`.
    fn outranks(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.slots[a - 1], &self.slots[b - 1]) == Ordering::Greater
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{BoundedHeap, HeapError};

    fn max_heap(capacity: usize) -> BoundedHeap<i32, impl Fn(&i32, &i32) -> Ordering> {
        BoundedHeap::new(capacity, i32::cmp)
    }

    fn min_heap(capacity: usize) -> BoundedHeap<i32, impl Fn(&i32, &i32) -> Ordering> {
        BoundedHeap::new(capacity, |a: &i32, b: &i32| a.cmp(b).reverse())
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![42], vec![42])]
    #[case(vec![5, 3, 8, 1, 9, 2], vec![1, 2, 3, 5, 8, 9])]
    #[case(vec![4, 4, 1, 4], vec![1, 4, 4, 4])]
    #[case(vec![-7, 0, -2, 3], vec![-7, -2, 0, 3])]
    fn test_into_sorted_vec(#[case] input: Vec<i32>, #[case] expected: Vec<i32>) {
        let mut heap = max_heap(input.len());
        for value in input {
            heap.insert(value).unwrap();
        }

        assert_eq!(heap.into_sorted_vec(), expected);
    }

    #[rstest]
    fn test_min_extraction_order() {
        let mut values = Vec::from_iter(0..50);
        values.shuffle(&mut rand::thread_rng());

        let mut heap = min_heap(values.len());
        for &value in &values {
            heap.insert(value).unwrap();
        }

        let mut extracted = Vec::new();
        while !heap.is_empty() {
            extracted.push(heap.extract_root().unwrap());
        }

        assert_eq!(extracted, Vec::from_iter(0..50));
    }

    #[rstest]
    fn test_heap_invariant_maintained() {
        let mut values = Vec::from_iter(0..100);
        values.shuffle(&mut rand::thread_rng());

        let mut heap = max_heap(values.len());
        for &value in &values {
            heap.insert(value).unwrap();
            assert_invariant(&heap);
        }

        for _ in 0..40 {
            heap.extract_root().unwrap();
            assert_invariant(&heap);
        }
    }

    fn assert_invariant(heap: &BoundedHeap<i32, impl Fn(&i32, &i32) -> Ordering>) {
        let slots = heap.as_slice();
        for n in 1..=heap.len() {
            for child in [n * 2, n * 2 + 1] {
                if child <= heap.len() {
                    assert!(
                        slots[n - 1] >= slots[child - 1],
                        "node {} ({}) ranks below its child {} ({})",
                        n,
                        slots[n - 1],
                        child,
                        slots[child - 1]
                    );
                }
            }
        }
    }

    #[rstest]
    fn test_sole_left_child() {
        let mut heap = max_heap(2);
        heap.insert(1).unwrap();
        heap.insert(9).unwrap();

        assert_eq!(heap.extract_root().unwrap(), 9);
        assert_eq!(heap.extract_root().unwrap(), 1);
    }

    #[rstest]
    fn test_capacity_error() {
        let mut heap = max_heap(2);
        heap.insert(1).unwrap();
        heap.insert(2).unwrap();

        assert_eq!(heap.insert(3), Err(HeapError::Capacity { capacity: 2 }));
        assert_eq!(heap.len(), 2);
    }

    #[rstest]
    fn test_underflow_error() {
        let mut heap = max_heap(1);

        assert_eq!(heap.extract_root(), Err(HeapError::Underflow));

        heap.insert(7).unwrap();
        assert_eq!(heap.extract_root(), Ok(7));
        assert_eq!(heap.extract_root(), Err(HeapError::Underflow));
    }

    #[rstest]
    fn test_snapshot_is_discovery_order() {
        let mut heap = max_heap(3);
        for value in [1, 2, 3] {
            heap.insert(value).unwrap();
        }

        // The root holds the max; the rest stays in discovery order.
        assert_eq!(heap.as_slice()[0], 3);
        assert_eq!(heap.as_slice().len(), 3);
    }
}
