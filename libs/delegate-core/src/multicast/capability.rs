use crate::core::{functional::Delegate, method::MethodIdentity};

/// Decides whether a listener implements a given protocol method.
///
/// Must be a pure query, and must answer `false` rather than fail for
/// listeners implementing nothing.
pub trait CapabilityResolver<L: ?Sized> {
    fn supports(&self, listener: &L, method: &MethodIdentity) -> bool;
}

/// Asks the listener itself through [`Delegate::responds_to`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DeclaredCapabilities;

impl<L> CapabilityResolver<L> for DeclaredCapabilities
where
    L: Delegate + ?Sized,
{
    fn supports(&self, listener: &L, method: &MethodIdentity) -> bool {
        listener.responds_to(method)
    }
}

impl<L, F> CapabilityResolver<L> for F
where
    L: ?Sized,
    F: Fn(&L, &MethodIdentity) -> bool,
{
    fn supports(&self, listener: &L, method: &MethodIdentity) -> bool {
        (self)(listener, method)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{
        functional::Delegate,
        method::MethodIdentity,
        test_util::{get_mock_listener, MockDelegate, MockListener, MOCK_NOTIFY, MOCK_QUERY},
    };

    use super::{CapabilityResolver, DeclaredCapabilities};

    struct Nothing;

    impl Delegate for Nothing {
        fn responds_to(&self, _method: &MethodIdentity) -> bool {
            false
        }
    }

    impl MockDelegate for Nothing {}

    #[test]
    fn test_partial_protocol_listener() {
        let listener = get_mock_listener("partial", &[MOCK_NOTIFY]);
        let resolver = DeclaredCapabilities;

        assert!(resolver.supports(listener.as_ref(), &MOCK_NOTIFY));
        assert!(!resolver.supports(listener.as_ref(), &MOCK_QUERY));
    }

    #[test]
    fn test_listener_implementing_nothing() {
        let resolver = DeclaredCapabilities;
        let listener: &dyn MockDelegate = &Nothing;

        assert!(!resolver.supports(listener, &MOCK_NOTIFY));
        assert!(!resolver.supports(listener, &MOCK_QUERY));
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |listener: &MockListener, method: &MethodIdentity| {
            listener.name() == "chosen" && *method == MOCK_QUERY
        };
        let chosen = get_mock_listener("chosen", &[]);
        let other = get_mock_listener("other", &[MOCK_QUERY]);

        assert!(resolver.supports(chosen.as_ref(), &MOCK_QUERY));
        assert!(!resolver.supports(chosen.as_ref(), &MOCK_NOTIFY));
        assert!(!resolver.supports(other.as_ref(), &MOCK_QUERY));
    }
}
