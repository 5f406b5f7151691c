use std::rc::Rc;

use eyre::Result;

use crate::{
    core::{functional::Delegate, method::MethodIdentity},
    multicast::{
        capability::{CapabilityResolver, DeclaredCapabilities},
        error::{DispatchFailures, ListenerFailure, MulticastError},
    },
};

/// Reconciled answer of one dispatch.
///
/// Only the first listener implementing the method, in dispatch order,
/// provides the value. `NoValue` means nobody implemented it, or the first
/// responder failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResult<T> {
    NoValue,
    Value(T),
}

impl<T> DispatchResult<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Self::NoValue => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Returns the reconciled value, or the protocol's documented default.
    pub fn unwrap_or(self, default: T) -> T {
        self.value().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DispatchResult<U> {
        match self {
            Self::NoValue => DispatchResult::NoValue,
            Self::Value(value) => DispatchResult::Value(f(value)),
        }
    }
}

impl<T> From<DispatchResult<T>> for Option<T> {
    fn from(value: DispatchResult<T>) -> Self {
        value.value()
    }
}

/// Everything that happened during one fan-out.
#[derive(Debug)]
pub struct DispatchReport<T> {
    pub method: MethodIdentity,
    pub result: DispatchResult<T>,
    /// Number of listeners that implemented the method and were called.
    pub invoked: usize,
    pub failures: Vec<ListenerFailure>,
}

impl<T> DispatchReport<T> {
    fn new(method: MethodIdentity) -> Self {
        Self {
            method,
            result: DispatchResult::NoValue,
            invoked: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_handled(&self) -> bool {
        self.invoked > 0
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Fails if any listener failed, even when a value was reconciled.
    pub fn into_result(self) -> Result<DispatchResult<T>, MulticastError> {
        if self.failures.is_empty() {
            Ok(self.result)
        } else {
            Err(DispatchFailures {
                method: self.method,
                invoked: self.invoked,
                failures: self.failures,
            }
            .into())
        }
    }
}

/// Fans a call out to every listener implementing it.
pub struct DispatchEngine<L: ?Sized + 'static> {
    resolver: Box<dyn CapabilityResolver<L>>,
}

impl<L: ?Sized + 'static> DispatchEngine<L> {
    pub fn new(resolver: Box<dyn CapabilityResolver<L>>) -> Self {
        Self { resolver }
    }

    pub fn new_with_resolver(resolver: impl CapabilityResolver<L> + 'static) -> Self {
        Self::new(Box::new(resolver))
    }

    pub fn supports(&self, listener: &L, method: &MethodIdentity) -> bool {
        self.resolver.supports(listener, method)
    }

    /// Whether any of `listeners` implements `method`.
    pub fn any_supports(&self, listeners: &[Rc<L>], method: &MethodIdentity) -> bool {
        listeners
            .iter()
            .any(|listener| self.supports(listener.as_ref(), method))
    }

    /// Calls `invoke` on each listener implementing `method`, in order.
    ///
    /// A failing listener does not stop the fan-out; its error is kept in
    /// the report. The value of the first implementing listener is the
    /// result, the values of the others are dropped.
    pub fn dispatch<T, F>(
        &self,
        method: &MethodIdentity,
        listeners: &[Rc<L>],
        mut invoke: F,
    ) -> DispatchReport<T>
    where
        F: FnMut(&L) -> Result<T>,
    {
        let mut report = DispatchReport::new(*method);

        for (position, listener) in listeners.iter().enumerate() {
            if !self.supports(listener.as_ref(), method) {
                continue;
            }

            let first_responder = report.invoked == 0;
            report.invoked += 1;

            match invoke(listener.as_ref()) {
                Ok(value) => {
                    if first_responder {
                        report.result = DispatchResult::Value(value);
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        method = %method,
                        position,
                        first_responder,
                        "Listener failed: {:?}",
                        error
                    );
                    report.failures.push(ListenerFailure {
                        position,
                        first_responder,
                        error,
                    });
                }
            }
        }

        tracing::trace!(
            method = %method,
            listeners = listeners.len(),
            invoked = report.invoked,
            failed = report.failures.len(),
            "Dispatched"
        );

        report
    }
}

impl<L> Default for DispatchEngine<L>
where
    L: Delegate + ?Sized + 'static,
{
    fn default() -> Self {
        Self::new_with_resolver(DeclaredCapabilities)
    }
}
