use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use crate::{
    core::functional::{same_object, SlotProvider},
    multicast::error::MulticastError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// The slot held the proxy and now holds the original occupant again.
    Restored,
    /// Something else took the slot since; it was left untouched.
    SlotConflict,
    NotInstalled,
}

/// Puts a proxy into a host's single delegate slot and takes it out again.
///
/// The adapter is bound to one slot provider for its whole life and holds it
/// weakly, since hosts usually own their proxy. None of its methods keep a
/// borrow alive while calling into the host, so the host may query the
/// proxy from within `set_current`.
pub struct SlotAdapter<L: ?Sized + 'static> {
    slot: Weak<dyn SlotProvider<L>>,
    original: RefCell<Option<Weak<L>>>,
    installed: Cell<bool>,
}

impl<L: ?Sized + 'static> SlotAdapter<L> {
    pub fn new(slot: Weak<dyn SlotProvider<L>>) -> Self {
        Self {
            slot,
            original: RefCell::new(None),
            installed: Cell::new(false),
        }
    }

    pub fn bind<S>(slot: &Rc<S>) -> Self
    where
        S: SlotProvider<L> + 'static,
    {
        let slot: Rc<dyn SlotProvider<L>> = slot.clone();
        Self::new(Rc::downgrade(&slot))
    }

    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Occupant captured at installation time, if it is still alive.
    pub fn original(&self) -> Option<Rc<L>> {
        self.original.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Drops the captured occupant if it is `listener`.
    ///
    /// Uninstalling afterwards leaves the slot empty.
    pub fn forget_original(&self, listener: &Rc<L>) -> bool {
        let mut original = self.original.borrow_mut();
        let matches = original
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|current| same_object(Rc::as_ptr(&current), Rc::as_ptr(listener)));
        if matches {
            *original = None;
        }
        matches
    }

    /// Whether the slot currently holds `proxy`.
    pub fn holds(&self, proxy: &Rc<L>) -> Result<bool, MulticastError> {
        let slot = self.slot()?;
        let current = slot.current();
        Ok(Self::is_same(current.as_ref(), proxy))
    }

    /// Captures the current occupant and writes `proxy` into the slot.
    ///
    /// Returns `false` without touching anything when the slot already holds
    /// `proxy`. Installing again after the slot was overwritten captures the
    /// new occupant in place of the previous one.
    pub fn install(&self, proxy: Rc<L>, capture_original: bool) -> Result<bool, MulticastError> {
        let slot = self.slot()?;
        let current = slot.current();

        if Self::is_same(current.as_ref(), &proxy) {
            self.installed.set(true);
            tracing::debug!("Proxy already occupies the slot");
            return Ok(false);
        }

        let original = current.as_ref().filter(|_| capture_original).map(Rc::downgrade);
        tracing::debug!(
            has_original = original.is_some(),
            "Installing proxy into delegate slot"
        );

        *self.original.borrow_mut() = original;
        self.installed.set(true);

        slot.set_current(Some(proxy));
        Ok(true)
    }

    /// Puts the original occupant back, unless the slot was taken by
    /// something else since installation.
    ///
    /// State is cleared in every case.
    pub fn uninstall(&self, proxy: &Rc<L>) -> Result<UninstallOutcome, MulticastError> {
        if !self.installed.replace(false) {
            return Ok(UninstallOutcome::NotInstalled);
        }

        let original = self.original.borrow_mut().take();
        let slot = self.slot()?;
        let current = slot.current();

        if !Self::is_same(current.as_ref(), proxy) {
            tracing::warn!(
                occupied = current.is_some(),
                "Delegate slot no longer holds the proxy, leaving it untouched"
            );
            return Ok(UninstallOutcome::SlotConflict);
        }

        tracing::debug!(
            has_original = original.is_some(),
            "Restoring original delegate"
        );

        slot.set_current(original.as_ref().and_then(Weak::upgrade));
        Ok(UninstallOutcome::Restored)
    }

    /// Writes `proxy` into the slot again if it still holds it, so that
    /// hosts caching capability answers on assignment refresh them.
    pub fn reassign(&self, proxy: Rc<L>) -> Result<bool, MulticastError> {
        if !self.installed.get() || !self.holds(&proxy)? {
            return Ok(false);
        }
        self.slot()?.set_current(Some(proxy));
        Ok(true)
    }

    fn slot(&self) -> Result<Rc<dyn SlotProvider<L>>, MulticastError> {
        self.slot.upgrade().ok_or(MulticastError::SlotReleased)
    }

    fn is_same(current: Option<&Rc<L>>, proxy: &Rc<L>) -> bool {
        current.is_some_and(|current| same_object(Rc::as_ptr(current), Rc::as_ptr(proxy)))
    }
}
