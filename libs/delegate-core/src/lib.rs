pub mod core {
    pub mod functional;
    pub mod logging;
    pub mod method;
    pub mod test_util;
}

pub mod multicast {
    pub mod capability;
    pub mod dispatch_engine;
    pub mod error;
    pub mod listener_registry;
    pub mod multicast_delegate;
    pub mod slot_adapter;
}
