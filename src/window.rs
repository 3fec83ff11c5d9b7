use std::collections::VecDeque;
use std::collections::vec_deque::Iter;

use serde::{Deserialize, Serialize};

/// A fixed-capacity buffer that evicts its oldest element on overflow.
///
/// Unlike a ring buffer that overwrites in place, iteration always runs from
/// oldest to newest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct BoundedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

#[derive(Deserialize)]
struct RawWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> TryFrom<RawWindow<T>> for BoundedWindow<T> {
    type Error = String;

    fn try_from(raw: RawWindow<T>) -> Result<Self, Self::Error> {
        if raw.capacity == 0 {
            return Err(String::from("window capacity must be positive"));
        }
        if raw.items.len() > raw.capacity {
            return Err(format!(
                "window holds {} items but its capacity is {}",
                raw.items.len(),
                raw.capacity
            ));
        }
        Ok(BoundedWindow {
            items: raw.items,
            capacity: raw.capacity,
        })
    }
}

impl<T> BoundedWindow<T> {
    /// **Panics** if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        BoundedWindow {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append `item`, returning the evicted element if the window was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let mut evicted = None;
        while self.items.len() >= self.capacity && !self.items.is_empty() {
            evicted = self.items.pop_front();
        }
        self.items.push_back(item);
        evicted
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> BoundedWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
