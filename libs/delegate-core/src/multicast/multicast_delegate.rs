use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use eyre::Result;

use crate::{
    core::{
        functional::{same_object, AsListener, Delegate, SlotProvider},
        method::MethodIdentity,
    },
    multicast::{
        dispatch_engine::{DispatchEngine, DispatchReport, DispatchResult},
        error::MulticastError,
        listener_registry::ListenerRegistry,
        slot_adapter::{SlotAdapter, UninstallOutcome},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MulticastOptions {
    /// Dispatch to the slot's occupant from before installation, first.
    pub include_original: bool,
    /// Drop handles of released listeners as soon as a dispatch sees them.
    pub prune_released: bool,
    /// Write the proxy into the slot again after add and remove.
    pub reassign_on_change: bool,
}

impl Default for MulticastOptions {
    fn default() -> Self {
        Self {
            include_original: true,
            prune_released: true,
            reassign_on_change: true,
        }
    }
}

/// Occupies a host's single delegate slot and forwards each callback to
/// every registered listener implementing it.
///
/// Dispatch order is the original occupant of the slot first, then
/// listeners in the order they were added. Value returning callbacks
/// answer with the value of the first listener implementing them.
///
/// Everything runs on the calling thread. Listeners may add or remove
/// listeners from within a callback; the change applies from the next
/// dispatch on.
pub struct MulticastDelegate<L: ?Sized + 'static> {
    this: Weak<Self>,
    registry: RefCell<ListenerRegistry<L>>,
    engine: DispatchEngine<L>,
    adapter: SlotAdapter<L>,
    options: MulticastOptions,
}

impl<L: ?Sized + 'static> MulticastDelegate<L> {
    /// Creates a proxy bound to `slot`. Nothing is installed yet.
    pub fn new<S>(slot: &Rc<S>) -> Rc<Self>
    where
        L: Delegate,
        S: SlotProvider<L> + 'static,
    {
        Self::new_with_options(slot, MulticastOptions::default(), DispatchEngine::default())
    }

    pub fn new_with_options<S>(
        slot: &Rc<S>,
        options: MulticastOptions,
        engine: DispatchEngine<L>,
    ) -> Rc<Self>
    where
        S: SlotProvider<L> + 'static,
    {
        let adapter = SlotAdapter::bind(slot);
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: RefCell::new(ListenerRegistry::new()),
            engine,
            adapter,
            options,
        })
    }

    pub fn options(&self) -> &MulticastOptions {
        &self.options
    }

    pub fn is_installed(&self) -> bool {
        self.adapter.is_installed()
    }

    /// Occupant of the slot captured at installation, if still alive.
    pub fn original(&self) -> Option<Rc<L>> {
        if self.options.include_original {
            self.adapter.original()
        } else {
            None
        }
    }

    /// Live listeners in dispatch order, original occupant first.
    pub fn listeners(&self) -> Vec<Rc<L>> {
        let (mut listeners, stored) = {
            let registry = self.registry.borrow();
            (registry.snapshot(), registry.capacity_used())
        };

        if self.options.prune_released && listeners.len() < stored {
            let pruned = self.registry.borrow_mut().prune();
            tracing::debug!(pruned, "Pruned released listeners");
        }

        if let Some(original) = self.original() {
            listeners.retain(|l| !same_object(Rc::as_ptr(l), Rc::as_ptr(&original)));
            listeners.insert(0, original);
        }

        listeners
    }

    pub fn len(&self) -> usize {
        self.listeners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners().is_empty()
    }

    /// Drops handles of released listeners. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.registry.borrow_mut().prune()
    }

    /// Whether any live listener implements `method`.
    pub fn supports(&self, method: &MethodIdentity) -> bool {
        self.engine.any_supports(&self.listeners(), method)
    }

    /// Fans `invoke` out and reports every outcome, failures included.
    pub fn dispatch_report<T, F>(&self, method: &MethodIdentity, invoke: F) -> DispatchReport<T>
    where
        F: FnMut(&L) -> Result<T>,
    {
        let listeners = self.listeners();
        self.engine.dispatch(method, &listeners, invoke)
    }

    /// Fans `invoke` out, failing after all listeners ran if any of them
    /// failed.
    pub fn dispatch<T, F>(
        &self,
        method: &MethodIdentity,
        invoke: F,
    ) -> Result<DispatchResult<T>, MulticastError>
    where
        F: FnMut(&L) -> Result<T>,
    {
        self.dispatch_report(method, invoke).into_result()
    }

    fn is_self(&self, listener: *const L) -> bool {
        same_object(listener, self as *const Self)
    }
}

impl<L> MulticastDelegate<L>
where
    L: ?Sized + 'static,
    Self: AsListener<L>,
{
    /// Registers `listener` after the ones already registered.
    ///
    /// Adding a listener twice, or adding the proxy to itself, does nothing.
    pub fn add(&self, listener: &Rc<L>) -> bool {
        if self.is_self(Rc::as_ptr(listener)) {
            tracing::warn!("Refusing to register proxy as its own listener");
            return false;
        }

        let added = self.registry.borrow_mut().add(listener);
        if added {
            tracing::debug!("Listener added");
            self.refresh();
        }
        added
    }

    pub fn add_weak(&self, listener: &Weak<L>) -> bool {
        match listener.upgrade() {
            Some(listener) => self.add(&listener),
            None => {
                tracing::debug!("Ignoring released listener");
                false
            }
        }
    }

    /// Stops forwarding to `listener`, including when it is the original
    /// slot occupant.
    pub fn remove(&self, listener: &Rc<L>) -> bool {
        let removed = self.registry.borrow_mut().remove(listener);
        let forgotten = self.adapter.forget_original(listener);
        if removed || forgotten {
            tracing::debug!(forgotten, "Listener removed");
            self.refresh();
        }
        removed || forgotten
    }

    pub fn remove_weak(&self, listener: &Weak<L>) -> bool {
        match listener.upgrade() {
            Some(listener) => self.remove(&listener),
            None => false,
        }
    }

    /// Takes over the slot. See [`SlotAdapter::install`].
    pub fn install(&self) -> Result<bool, MulticastError> {
        match self.proxy() {
            Some(proxy) => self.adapter.install(proxy, self.options.include_original),
            None => Ok(false),
        }
    }

    /// Hands the slot back. See [`SlotAdapter::uninstall`].
    pub fn uninstall(&self) -> Result<UninstallOutcome, MulticastError> {
        match self.proxy() {
            Some(proxy) => self.adapter.uninstall(&proxy),
            None => Ok(UninstallOutcome::NotInstalled),
        }
    }

    fn proxy(&self) -> Option<Rc<L>> {
        self.this.upgrade().map(|proxy| proxy.as_listener())
    }

    fn refresh(&self) {
        if !self.options.reassign_on_change {
            return;
        }
        let Some(proxy) = self.proxy() else {
            return;
        };
        if let Err(err) = self.adapter.reassign(proxy) {
            tracing::debug!("Skipped delegate reassignment: {}", err);
        }
    }
}

impl<L: ?Sized + 'static> Delegate for MulticastDelegate<L> {
    fn responds_to(&self, method: &MethodIdentity) -> bool {
        self.supports(method)
    }
}

impl<L: ?Sized + 'static> fmt::Debug for MulticastDelegate<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("registry", &self.registry.borrow())
            .field("installed", &self.is_installed())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use eyre::Result;

    use crate::{
        core::{
            functional::{same_object, Delegate, SlotProvider},
            test_util::{
                as_mock_delegate, get_mock_call_log, get_mock_listener, get_mock_logged_listener,
                get_mock_slot, take_mock_calls, MockDelegate, MockListener, MOCK_NOTIFY,
                MOCK_QUERY,
            },
        },
        multicast::{
            dispatch_engine::DispatchEngine, error::MulticastError,
            slot_adapter::UninstallOutcome,
        },
    };

    use super::{MulticastDelegate, MulticastOptions};

    type MockMulticast = MulticastDelegate<dyn MockDelegate>;

    #[test]
    fn test_add_twice_same_as_once() {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();
        let a = as_mock_delegate(&get_mock_logged_listener("a", &[MOCK_NOTIFY], &log));

        assert!(proxy.add(&a));
        assert!(!proxy.add(&a));
        assert_eq!(proxy.len(), 1);

        proxy.did_notify("x").unwrap();
        assert_eq!(take_mock_calls(&log), vec!["a:mockDidNotify:"]);
    }

    #[test]
    fn test_original_first_then_registration_order() -> Result<()> {
        let slot = get_mock_slot();
        let log = get_mock_call_log();
        let original = as_mock_delegate(&get_mock_logged_listener("d", &[MOCK_NOTIFY], &log));
        slot.set_current(Some(original.clone()));

        let proxy = MockMulticast::new(&slot);
        let l1 = as_mock_delegate(&get_mock_logged_listener("l1", &[MOCK_NOTIFY], &log));
        let l2 = as_mock_delegate(&get_mock_logged_listener("l2", &[MOCK_NOTIFY], &log));
        let l3 = as_mock_delegate(&get_mock_logged_listener("l3", &[MOCK_NOTIFY], &log));

        proxy.add(&l1);
        proxy.install()?;
        proxy.add(&l2);
        proxy.add(&l3);

        let host_delegate = slot.current().expect("proxy installed");
        host_delegate.did_notify("x")?;
        assert_eq!(
            take_mock_calls(&log),
            vec![
                "d:mockDidNotify:",
                "l1:mockDidNotify:",
                "l2:mockDidNotify:",
                "l3:mockDidNotify:"
            ]
        );

        // Stable across repeated dispatches
        host_delegate.did_notify("y")?;
        assert_eq!(take_mock_calls(&log).len(), 4);
        Ok(())
    }

    #[test]
    fn test_partial_capability() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();
        let only_notify = as_mock_delegate(&get_mock_logged_listener("a", &[MOCK_NOTIFY], &log));
        proxy.add(&only_notify);

        proxy.did_notify("x")?;
        assert_eq!(take_mock_calls(&log), vec!["a:mockDidNotify:"]);

        proxy.should_allow("x")?;
        assert!(take_mock_calls(&log).is_empty());
        Ok(())
    }

    #[test]
    fn test_removal_during_dispatch_applies_next_time() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();

        let l1 = get_mock_logged_listener("l1", &[MOCK_NOTIFY], &log);
        let l2 = as_mock_delegate(&get_mock_logged_listener("l2", &[MOCK_NOTIFY], &log));

        let weak_proxy = Rc::downgrade(&proxy);
        let victim = l2.clone();
        l1.set_on_call(move || {
            if let Some(proxy) = weak_proxy.upgrade() {
                proxy.remove(&victim);
            }
        });

        proxy.add(&as_mock_delegate(&l1));
        proxy.add(&l2);

        proxy.did_notify("x")?;
        assert_eq!(
            take_mock_calls(&log),
            vec!["l1:mockDidNotify:", "l2:mockDidNotify:"]
        );

        proxy.did_notify("y")?;
        assert_eq!(take_mock_calls(&log), vec!["l1:mockDidNotify:"]);
        Ok(())
    }

    #[test]
    fn test_addition_during_dispatch_applies_next_time() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();

        let l1 = get_mock_logged_listener("l1", &[MOCK_NOTIFY], &log);
        let late = as_mock_delegate(&get_mock_logged_listener("late", &[MOCK_NOTIFY], &log));

        let weak_proxy = Rc::downgrade(&proxy);
        let newcomer = late.clone();
        l1.set_on_call(move || {
            if let Some(proxy) = weak_proxy.upgrade() {
                proxy.add(&newcomer);
            }
        });
        proxy.add(&as_mock_delegate(&l1));

        proxy.did_notify("x")?;
        assert_eq!(take_mock_calls(&log), vec!["l1:mockDidNotify:"]);

        proxy.did_notify("y")?;
        assert_eq!(
            take_mock_calls(&log),
            vec!["l1:mockDidNotify:", "late:mockDidNotify:"]
        );
        Ok(())
    }

    #[test]
    fn test_first_responder_value_wins() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();

        let l1: Rc<dyn MockDelegate> =
            Rc::new(MockListener::new("l1", &[MOCK_QUERY], &log).with_answer(true));
        let l2: Rc<dyn MockDelegate> =
            Rc::new(MockListener::new("l2", &[MOCK_QUERY], &log).with_answer(false));
        proxy.add(&l1);
        proxy.add(&l2);

        assert!(proxy.should_allow("x")?);
        assert_eq!(
            take_mock_calls(&log),
            vec!["l1:mockShouldAllow:", "l2:mockShouldAllow:"]
        );
        Ok(())
    }

    #[test]
    fn test_unhandled_query_uses_default() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        assert!(!proxy.should_allow("x")?);
        Ok(())
    }

    #[test]
    fn test_install_uninstall_restores_original() -> Result<()> {
        let slot = get_mock_slot();
        let original = as_mock_delegate(&get_mock_logged_listener(
            "d",
            &[MOCK_NOTIFY],
            &get_mock_call_log(),
        ));
        slot.set_current(Some(original.clone()));

        let proxy = MockMulticast::new(&slot);
        assert!(proxy.install()?);
        assert!(!proxy.install()?);
        assert!(proxy.is_installed());

        assert_eq!(proxy.uninstall()?, UninstallOutcome::Restored);
        let restored = slot.current().expect("original restored");
        assert!(same_object(Rc::as_ptr(&restored), Rc::as_ptr(&original)));
        assert!(proxy.original().is_none());
        Ok(())
    }

    #[test]
    fn test_released_listener_skipped_and_pruned() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();

        let l1 = as_mock_delegate(&get_mock_logged_listener("l1", &[MOCK_NOTIFY], &log));
        let l2 = as_mock_delegate(&get_mock_logged_listener("l2", &[MOCK_NOTIFY], &log));
        proxy.add(&l1);
        proxy.add(&l2);

        drop(l1);
        proxy.did_notify("x")?;
        assert_eq!(take_mock_calls(&log), vec!["l2:mockDidNotify:"]);
        assert_eq!(proxy.len(), 1);

        // Already dropped by the dispatch
        assert_eq!(proxy.prune(), 0);
        Ok(())
    }

    #[test]
    fn test_released_listener_kept_until_pruned() -> Result<()> {
        let slot = get_mock_slot();
        let options = MulticastOptions {
            prune_released: false,
            ..Default::default()
        };
        let proxy = MockMulticast::new_with_options(&slot, options, DispatchEngine::default());

        let l1: Rc<dyn MockDelegate> = get_mock_listener("l1", &[MOCK_NOTIFY]);
        proxy.add(&l1);
        drop(l1);

        proxy.did_notify("x")?;
        assert!(proxy.is_empty());
        assert_eq!(proxy.prune(), 1);
        Ok(())
    }

    #[test]
    fn test_failures_reported_after_fan_out() {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let log = get_mock_call_log();

        let failing: Rc<dyn MockDelegate> = Rc::new(
            MockListener::new("bad", &[MOCK_QUERY], &log)
                .with_answer(true)
                .failing_on(MOCK_QUERY),
        );
        let good: Rc<dyn MockDelegate> =
            Rc::new(MockListener::new("good", &[MOCK_QUERY], &log).with_answer(true));
        proxy.add(&failing);
        proxy.add(&good);

        let result = proxy.dispatch(&MOCK_QUERY, |l| l.should_allow("x"));
        assert_eq!(take_mock_calls(&log).len(), 2);

        match result {
            Err(MulticastError::ListenerFailures(failures)) => {
                assert!(failures.first_responder_failed());
                assert_eq!(failures.failures.len(), 1);
            }
            other => panic!("Unexpected result: {:?}", other),
        }

        // The typed protocol call surfaces it as an error too
        assert!(proxy.should_allow("x").is_err());
    }

    #[test]
    fn test_original_added_explicitly_is_called_once() -> Result<()> {
        let slot = get_mock_slot();
        let log = get_mock_call_log();
        let original = as_mock_delegate(&get_mock_logged_listener("d", &[MOCK_NOTIFY], &log));
        let other = as_mock_delegate(&get_mock_logged_listener("o", &[MOCK_NOTIFY], &log));
        slot.set_current(Some(original.clone()));

        let proxy = MockMulticast::new(&slot);
        proxy.add(&other);
        proxy.add(&original);
        proxy.install()?;

        proxy.did_notify("x")?;
        assert_eq!(
            take_mock_calls(&log),
            vec!["d:mockDidNotify:", "o:mockDidNotify:"]
        );
        Ok(())
    }

    #[test]
    fn test_removing_original_stops_forwarding() -> Result<()> {
        let slot = get_mock_slot();
        let log = get_mock_call_log();
        let original = as_mock_delegate(&get_mock_logged_listener("d", &[MOCK_NOTIFY], &log));
        slot.set_current(Some(original.clone()));

        let proxy = MockMulticast::new(&slot);
        proxy.install()?;
        assert!(slot.caches(&MOCK_NOTIFY));

        assert!(proxy.remove(&original));
        assert!(proxy.original().is_none());
        assert!(proxy.is_empty());
        assert!(!slot.caches(&MOCK_NOTIFY));

        proxy.did_notify("x")?;
        assert!(take_mock_calls(&log).is_empty());
        assert!(!proxy.remove(&original));

        assert_eq!(proxy.uninstall()?, UninstallOutcome::Restored);
        assert!(slot.current().is_none());
        Ok(())
    }

    #[test]
    fn test_install_again_forwards_to_new_occupant() -> Result<()> {
        let slot = get_mock_slot();
        let log = get_mock_call_log();
        let first = as_mock_delegate(&get_mock_logged_listener("d", &[MOCK_NOTIFY], &log));
        let newer = as_mock_delegate(&get_mock_logged_listener("n", &[MOCK_NOTIFY], &log));
        slot.set_current(Some(first.clone()));

        let proxy = MockMulticast::new(&slot);
        proxy.install()?;
        slot.set_current(Some(newer.clone()));

        assert!(proxy.install()?);
        let captured = proxy.original().expect("newer captured");
        assert!(same_object(Rc::as_ptr(&captured), Rc::as_ptr(&newer)));

        proxy.did_notify("x")?;
        assert_eq!(take_mock_calls(&log), vec!["n:mockDidNotify:"]);
        Ok(())
    }

    #[test]
    fn test_responds_to_union_and_host_refresh() -> Result<()> {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        proxy.install()?;
        assert!(!proxy.responds_to(&MOCK_NOTIFY));
        assert!(!slot.caches(&MOCK_NOTIFY));

        let notify: Rc<dyn MockDelegate> = get_mock_listener("n", &[MOCK_NOTIFY]);
        proxy.add(&notify);
        assert!(proxy.responds_to(&MOCK_NOTIFY));
        assert!(!proxy.responds_to(&MOCK_QUERY));
        assert!(slot.caches(&MOCK_NOTIFY));

        proxy.remove(&notify);
        assert!(!slot.caches(&MOCK_NOTIFY));
        Ok(())
    }

    #[test]
    fn test_no_reassign_when_disabled() -> Result<()> {
        let slot = get_mock_slot();
        let options = MulticastOptions {
            reassign_on_change: false,
            ..Default::default()
        };
        let proxy = MockMulticast::new_with_options(&slot, options, DispatchEngine::default());
        proxy.install()?;
        let assignments = slot.assignments();

        let notify: Rc<dyn MockDelegate> = get_mock_listener("n", &[MOCK_NOTIFY]);
        proxy.add(&notify);
        assert_eq!(slot.assignments(), assignments);
        assert!(!slot.caches(&MOCK_NOTIFY));
        Ok(())
    }

    #[test]
    fn test_proxy_cannot_listen_to_itself() {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let as_listener: Rc<dyn MockDelegate> = proxy.clone();

        assert!(!proxy.add(&as_listener));
        assert!(proxy.is_empty());
    }

    #[test]
    fn test_released_weak_listener_is_ignored() {
        let slot = get_mock_slot();
        let proxy = MockMulticast::new(&slot);
        let listener = as_mock_delegate(&get_mock_logged_listener("l", &[], &get_mock_call_log()));
        let weak = Rc::downgrade(&listener);
        drop(listener);

        assert!(!proxy.add_weak(&weak));
        assert!(!proxy.remove_weak(&weak));
        assert!(proxy.is_empty());
    }
}
