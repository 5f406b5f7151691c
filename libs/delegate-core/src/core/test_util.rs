use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use eyre::{eyre, Result};

use crate::{
    core::{
        functional::{AsListener, Delegate, DelegateSlot, SlotProvider},
        method::MethodIdentity,
    },
    multicast::multicast_delegate::MulticastDelegate,
};

pub const MOCK_NOTIFY: MethodIdentity = MethodIdentity::new("mockDidNotify:", 1);
pub const MOCK_QUERY: MethodIdentity = MethodIdentity::new("mockShouldAllow:", 1);

/// Answer of `should_allow` when nobody implements it.
pub const MOCK_QUERY_DEFAULT: bool = false;

pub const MOCK_METHODS: [MethodIdentity; 2] = [MOCK_NOTIFY, MOCK_QUERY];

/// Two-method protocol used by tests: one notification, one query.
pub trait MockDelegate: Delegate {
    fn did_notify(&self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn should_allow(&self, _tag: &str) -> Result<bool> {
        Ok(MOCK_QUERY_DEFAULT)
    }
}

impl MockDelegate for MulticastDelegate<dyn MockDelegate> {
    fn did_notify(&self, tag: &str) -> Result<()> {
        self.dispatch(&MOCK_NOTIFY, |listener| listener.did_notify(tag))?;
        Ok(())
    }

    fn should_allow(&self, tag: &str) -> Result<bool> {
        let result = self.dispatch(&MOCK_QUERY, |listener| listener.should_allow(tag))?;
        Ok(result.unwrap_or(MOCK_QUERY_DEFAULT))
    }
}

impl AsListener<dyn MockDelegate> for MulticastDelegate<dyn MockDelegate> {
    fn as_listener(self: Rc<Self>) -> Rc<dyn MockDelegate> {
        self
    }
}

/// Shared record of `name:selector` entries, in call order.
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub struct MockListener {
    name: String,
    methods: Vec<MethodIdentity>,
    answer: bool,
    fail_on: Vec<MethodIdentity>,
    log: CallLog,
    on_call: RefCell<Option<Box<dyn Fn()>>>,
}

impl MockListener {
    pub fn new(name: &str, methods: &[MethodIdentity], log: &CallLog) -> Self {
        Self {
            name: name.to_owned(),
            methods: methods.to_vec(),
            answer: MOCK_QUERY_DEFAULT,
            fail_on: Vec::new(),
            log: log.clone(),
            on_call: RefCell::new(None),
        }
    }

    pub fn with_answer(mut self, answer: bool) -> Self {
        self.answer = answer;
        self
    }

    pub fn failing_on(mut self, method: MethodIdentity) -> Self {
        self.fail_on.push(method);
        self
    }

    /// Runs `hook` on every callback, before the callback returns.
    pub fn set_on_call(&self, hook: impl Fn() + 'static) {
        *self.on_call.borrow_mut() = Some(Box::new(hook));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn record(&self, method: &MethodIdentity) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, method.selector()));

        if let Some(hook) = self.on_call.borrow().as_ref() {
            hook();
        }

        if self.fail_on.contains(method) {
            return Err(eyre!("{} failed on {}", self.name, method));
        }
        Ok(())
    }
}

impl Delegate for MockListener {
    fn responds_to(&self, method: &MethodIdentity) -> bool {
        self.methods.contains(method)
    }
}

impl MockDelegate for MockListener {
    fn did_notify(&self, _tag: &str) -> Result<()> {
        self.record(&MOCK_NOTIFY)
    }

    fn should_allow(&self, _tag: &str) -> Result<bool> {
        self.record(&MOCK_QUERY)?;
        Ok(self.answer)
    }
}

/// Slot provider that caches capability answers on assignment, the way
/// UI hosts do.
pub struct MockSlot {
    slot: DelegateSlot<dyn MockDelegate>,
    assignments: Cell<usize>,
    cached_methods: RefCell<Vec<MethodIdentity>>,
}

impl MockSlot {
    pub fn new() -> Self {
        Self {
            slot: DelegateSlot::new(),
            assignments: Cell::new(0),
            cached_methods: RefCell::new(Vec::new()),
        }
    }

    pub fn assignments(&self) -> usize {
        self.assignments.get()
    }

    pub fn caches(&self, method: &MethodIdentity) -> bool {
        self.cached_methods.borrow().contains(method)
    }
}

impl Default for MockSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotProvider<dyn MockDelegate> for MockSlot {
    fn current(&self) -> Option<Rc<dyn MockDelegate>> {
        self.slot.get()
    }

    fn set_current(&self, delegate: Option<Rc<dyn MockDelegate>>) {
        let cached = delegate
            .as_ref()
            .map(|d| {
                MOCK_METHODS
                    .iter()
                    .filter(|m| d.responds_to(m))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        self.assignments.set(self.assignments.get() + 1);
        *self.cached_methods.borrow_mut() = cached;
        self.slot.set(delegate.as_ref());
    }
}

pub fn get_mock_call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn get_mock_listener(name: &str, methods: &[MethodIdentity]) -> Rc<MockListener> {
    Rc::new(MockListener::new(name, methods, &get_mock_call_log()))
}

pub fn get_mock_logged_listener(
    name: &str,
    methods: &[MethodIdentity],
    log: &CallLog,
) -> Rc<MockListener> {
    Rc::new(MockListener::new(name, methods, log))
}

pub fn get_mock_slot() -> Rc<MockSlot> {
    Rc::new(MockSlot::new())
}

pub fn as_mock_delegate(listener: &Rc<MockListener>) -> Rc<dyn MockDelegate> {
    listener.clone()
}

pub fn take_mock_calls(log: &CallLog) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}
