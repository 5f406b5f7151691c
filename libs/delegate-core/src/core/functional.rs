use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use eyre::Result;

use crate::{core::method::MethodIdentity, multicast::multicast_delegate::MulticastDelegate};

/// Every delegate protocol method is optional, and so an object must tell
/// which ones it actually implements.
///
/// Protocol traits declare this as their supertrait and provide default
/// bodies for all of their callbacks. An implementer overrides the
/// callbacks it cares about and lists them here.
pub trait Delegate {
    fn responds_to(&self, method: &MethodIdentity) -> bool;
}

/// Host side of the single delegate property: one reference at most.
pub trait SlotProvider<L: ?Sized> {
    fn current(&self) -> Option<Rc<L>>;

    fn set_current(&self, delegate: Option<Rc<L>>);
}

/// Lets the proxy be stored in a slot typed for the protocol's listeners.
///
/// Unsizing `Rc<MulticastDelegate<dyn P>>` into `Rc<dyn P>` needs the
/// concrete protocol trait, so each protocol implements this next to its
/// forwarding implementation:
///
/// ```ignore
/// impl AsListener<dyn ScrollViewDelegate> for MulticastDelegate<dyn ScrollViewDelegate> {
///     fn as_listener(self: Rc<Self>) -> Rc<dyn ScrollViewDelegate> {
///         self
///     }
/// }
/// ```
pub trait AsListener<L: ?Sized> {
    fn as_listener(self: Rc<Self>) -> Rc<L>;
}

/// Host controls exposing a shared multicast proxy for their delegate slot.
pub trait IntoMulticastDelegate<L: ?Sized + 'static> {
    /// Returns the proxy installed into this host's slot, creating and
    /// installing it on first use.
    fn multicasting_delegate(&self) -> Result<Rc<MulticastDelegate<L>>>;
}

/// Single delegate slot holding a non-owning reference.
///
/// Setting a delegate replaces the previous one, there is no list.
pub struct DelegateSlot<L: ?Sized> {
    delegate: RefCell<Option<Weak<L>>>,
}

impl<L: ?Sized> DelegateSlot<L> {
    pub fn new() -> Self {
        Self {
            delegate: RefCell::new(None),
        }
    }

    pub fn new_with_delegate(delegate: &Rc<L>) -> Self {
        Self {
            delegate: RefCell::new(Some(Rc::downgrade(delegate))),
        }
    }

    pub fn has_delegate(&self) -> bool {
        self.get().is_some()
    }

    pub fn get(&self) -> Option<Rc<L>> {
        self.delegate.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set(&self, delegate: Option<&Rc<L>>) {
        *self.delegate.borrow_mut() = delegate.map(Rc::downgrade);
    }
}

impl<L: ?Sized> Default for DelegateSlot<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for DelegateSlot<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateSlot")
            .field("has_delegate", &self.has_delegate())
            .finish()
    }
}

impl<L: ?Sized> SlotProvider<L> for DelegateSlot<L> {
    fn current(&self) -> Option<Rc<L>> {
        self.get()
    }

    fn set_current(&self, delegate: Option<Rc<L>>) {
        self.set(delegate.as_ref());
    }
}

/// Compares two handles by the object they point at, ignoring vtables.
pub fn same_object<A: ?Sized, B: ?Sized>(a: *const A, b: *const B) -> bool {
    std::ptr::addr_eq(a, b)
}
