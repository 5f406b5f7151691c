use std::fmt;

/// Identifies one callback of a delegate protocol.
///
/// A method is keyed by its selector name plus the number of arguments it
/// takes, so overloads such as `scrollViewDidEndDragging:willDecelerate:`
/// and `scrollViewDidEndDragging:` stay distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentity {
    selector: &'static str,
    arity: u8,
}

impl MethodIdentity {
    pub const fn new(selector: &'static str, arity: u8) -> Self {
        Self { selector, arity }
    }

    pub fn selector(&self) -> &'static str {
        self.selector
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.selector, self.arity)
    }
}
