//! A mutex-guarded list shared between connection tasks.

use parking_lot::Mutex;

/// An ordered list whose every operation takes the lock exactly once.
///
/// Compound operations that must be atomic go through
/// [`update`](SyncList::update). Iteration is always over a
/// [`snapshot`](SyncList::snapshot), so callers never hold the lock
/// while doing I/O.
#[derive(Debug)]
pub struct SyncList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> SyncList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Removes and returns the first item matching `pred`.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let mut items = self.items.lock();
        let index = items.iter().position(pred)?;
        Some(items.remove(index))
    }

    /// Runs `f` with exclusive access to the underlying vector.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        f(&mut self.items.lock())
    }
}

impl<T: Clone> SyncList<T> {
    /// Copies the current contents out of the lock.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    /// Returns a copy of the first item matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.items.lock().iter().find(|item| pred(item)).cloned()
    }
}

impl<T> Default for SyncList<T> {
    fn default() -> Self {
        Self::new()
    }
}
