use std::rc::Rc;

use delegate_core::{
    core::functional::{AsListener, Delegate, SlotProvider},
    multicast::{
        dispatch_engine::DispatchEngine,
        multicast_delegate::{MulticastDelegate, MulticastOptions},
    },
};
use derive_builder::Builder;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::app::config::ConfigBuildError;

fn default_true() -> bool {
    true
}

/// Options for proxies created by hosts.
///
/// Also the `multicast` section of the application configuration.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(
    pattern = "owned",
    build_fn(name = "try_build", error = "ConfigBuildError")
)]
pub struct MulticastConfig {
    /// Treat the delegate found in the slot as the first listener
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_original: bool,

    /// Drop released listener handles as soon as a dispatch sees them
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub prune_released: bool,

    /// Write the proxy into the slot again after listeners change
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub reassign_on_change: bool,
}

impl MulticastConfig {
    #[must_use]
    pub fn builder() -> MulticastConfigBuilder {
        MulticastConfigBuilder::default()
    }

    pub fn options(&self) -> MulticastOptions {
        MulticastOptions {
            include_original: self.include_original,
            prune_released: self.prune_released,
            reassign_on_change: self.reassign_on_change,
        }
    }

    /// Creates a proxy for `slot` and installs it.
    pub fn make<L, S>(&self, slot: &Rc<S>) -> Result<Rc<MulticastDelegate<L>>>
    where
        L: Delegate + ?Sized + 'static,
        S: SlotProvider<L> + 'static,
        MulticastDelegate<L>: AsListener<L>,
    {
        let proxy =
            MulticastDelegate::new_with_options(slot, self.options(), DispatchEngine::default());
        proxy
            .install()
            .wrap_err("Failed to install multicast delegate")?;
        Ok(proxy)
    }
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            include_original: true,
            prune_released: true,
            reassign_on_change: true,
        }
    }
}
