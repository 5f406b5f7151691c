use std::{
    fmt,
    rc::{Rc, Weak},
};

use crate::core::functional::same_object;

/// Ordered set of non-owning listener handles.
///
/// Insertion order is dispatch order, and a listener is present at most
/// once, compared by reference identity. The registry never extends the
/// lifetime of a listener: handles whose owner dropped them are skipped by
/// [`ListenerRegistry::snapshot`] and removed by [`ListenerRegistry::prune`].
pub struct ListenerRegistry<L: ?Sized> {
    listeners: Vec<Weak<L>>,
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends `listener` unless it is already registered.
    ///
    /// Returns `true` if the registry changed.
    pub fn add(&mut self, listener: &Rc<L>) -> bool {
        if self.contains(listener) {
            return false;
        }
        self.listeners.push(Rc::downgrade(listener));
        true
    }

    /// Same as [`ListenerRegistry::add`], but a released handle is ignored.
    pub fn add_weak(&mut self, listener: &Weak<L>) -> bool {
        match listener.upgrade() {
            Some(listener) => self.add(&listener),
            None => false,
        }
    }

    /// Removes `listener` if registered. Returns `true` if the registry changed.
    pub fn remove(&mut self, listener: &Rc<L>) -> bool {
        self.remove_ptr(Rc::as_ptr(listener))
    }

    /// Same as [`ListenerRegistry::remove`], but a released handle is ignored.
    pub fn remove_weak(&mut self, listener: &Weak<L>) -> bool {
        if listener.strong_count() == 0 {
            return false;
        }
        self.remove_ptr(Weak::as_ptr(listener))
    }

    pub fn contains(&self, listener: &Rc<L>) -> bool {
        let ptr = Rc::as_ptr(listener);
        self.listeners
            .iter()
            .any(|weak| weak.strong_count() > 0 && same_object(Weak::as_ptr(weak), ptr))
    }

    /// Live listeners in registration order.
    ///
    /// Callers iterate the returned copy, so listeners may add or remove
    /// others while being called without disturbing the iteration.
    pub fn snapshot(&self) -> Vec<Rc<L>> {
        self.listeners.iter().filter_map(Weak::upgrade).collect()
    }

    /// Drops handles of released listeners. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|weak| weak.strong_count() > 0);
        before - self.listeners.len()
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored handles, released ones included.
    pub fn capacity_used(&self) -> usize {
        self.listeners.len()
    }

    fn remove_ptr(&mut self, ptr: *const L) -> bool {
        let before = self.listeners.len();
        self.listeners
            .retain(|weak| weak.strong_count() == 0 || !same_object(Weak::as_ptr(weak), ptr));
        before != self.listeners.len()
    }
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for ListenerRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("live", &self.len())
            .field("stored", &self.listeners.len())
            .finish()
    }
}
