use std::{
    cell::{Cell, OnceCell, RefCell},
    rc::{Rc, Weak},
};

use delegate_core::core::{
    functional::{Delegate, DelegateSlot, IntoMulticastDelegate, SlotProvider},
    method::MethodIdentity,
};
use eyre::{OptionExt, Result, WrapErr};
use itertools::Itertools;

use crate::{
    app::multicast::MulticastConfig,
    protocol::scroll_view_delegate::{
        ScrollViewDelegate, ScrollViewMulticast, ALL_METHODS, DID_END_DRAGGING, DID_SCROLL,
        DID_SELECT_ROW, ESTIMATED_ROW_HEIGHT, ESTIMATED_ROW_HEIGHT_DEFAULT, SHOULD_SCROLL_TO_TOP,
        SHOULD_SCROLL_TO_TOP_DEFAULT, WILL_BEGIN_DRAGGING,
    },
};

/// Drags longer than this keep moving after release.
const DECELERATION_THRESHOLD: f64 = 10.0;

/// Simulated scrollable view with a single delegate slot.
///
/// Like its platform counterparts, the view asks its delegate which
/// callbacks it implements once, when the delegate is assigned, and only
/// calls those afterwards. The multicast proxy is created lazily on first
/// request and owned by the view.
pub struct ScrollView {
    this: Weak<Self>,
    name: String,
    delegate: DelegateSlot<dyn ScrollViewDelegate>,
    responds: RefCell<Vec<MethodIdentity>>,
    assignments: Cell<usize>,
    content_offset: Cell<f64>,
    scroll_enabled: Cell<bool>,
    multicast: OnceCell<Rc<ScrollViewMulticast>>,
    multicast_config: MulticastConfig,
}

impl ScrollView {
    pub fn new(name: &str, multicast_config: MulticastConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            name: name.to_owned(),
            delegate: DelegateSlot::new(),
            responds: RefCell::new(Vec::new()),
            assignments: Cell::new(0),
            content_offset: Cell::new(0.0),
            scroll_enabled: Cell::new(true),
            multicast: OnceCell::new(),
            multicast_config,
        })
    }

    pub fn new_default(name: &str) -> Rc<Self> {
        Self::new(name, MulticastConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_offset(&self) -> f64 {
        self.content_offset.get()
    }

    pub fn is_scroll_enabled(&self) -> bool {
        self.scroll_enabled.get()
    }

    pub fn set_scroll_enabled(&self, enabled: bool) {
        self.scroll_enabled.set(enabled);
    }

    pub fn delegate(&self) -> Option<Rc<dyn ScrollViewDelegate>> {
        self.delegate.get()
    }

    /// Assigns the delegate and caches which callbacks it implements.
    pub fn set_delegate(&self, delegate: Option<&Rc<dyn ScrollViewDelegate>>) {
        self.delegate.set(delegate);

        // Query outside of the borrow, the delegate may call back into us
        let responds = delegate
            .map(|delegate| {
                ALL_METHODS
                    .into_iter()
                    .filter(|method| delegate.responds_to(method))
                    .collect_vec()
            })
            .unwrap_or_default();

        tracing::debug!(
            view = %self.name,
            responds = %responds.iter().join(", "),
            "Delegate assigned"
        );

        *self.responds.borrow_mut() = responds;
        self.assignments.set(self.assignments.get() + 1);
    }

    /// Whether the delegate implemented `method` when it was last assigned.
    pub fn delegate_responds(&self, method: &MethodIdentity) -> bool {
        self.responds.borrow().contains(method)
    }

    /// Number of delegate assignments so far.
    pub fn delegate_assignments(&self) -> usize {
        self.assignments.get()
    }

    fn delegate_for(&self, method: &MethodIdentity) -> Option<Rc<dyn ScrollViewDelegate>> {
        if self.delegate_responds(method) {
            self.delegate()
        } else {
            None
        }
    }

    pub fn scroll_to(&self, offset: f64) -> Result<()> {
        if !self.is_scroll_enabled() {
            tracing::trace!(view = %self.name, "Scrolling disabled");
            return Ok(());
        }

        self.content_offset.set(offset);

        if let Some(delegate) = self.delegate_for(&DID_SCROLL) {
            delegate.did_scroll(self)?;
        }
        Ok(())
    }

    /// Simulates a user drag moving the content by `distance`.
    pub fn drag(&self, distance: f64) -> Result<()> {
        if let Some(delegate) = self.delegate_for(&WILL_BEGIN_DRAGGING) {
            delegate.will_begin_dragging(self)?;
        }

        self.scroll_to(self.content_offset() + distance)?;

        if let Some(delegate) = self.delegate_for(&DID_END_DRAGGING) {
            delegate.did_end_dragging(self, distance.abs() > DECELERATION_THRESHOLD)?;
        }
        Ok(())
    }

    /// Simulates a status bar tap. Returns whether the view scrolled to top.
    pub fn tap_status_bar(&self) -> Result<bool> {
        let allowed = match self.delegate_for(&SHOULD_SCROLL_TO_TOP) {
            Some(delegate) => delegate.should_scroll_to_top(self)?,
            None => SHOULD_SCROLL_TO_TOP_DEFAULT,
        };

        if allowed && self.is_scroll_enabled() {
            self.scroll_to(0.0)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn select_row(&self, row: usize) -> Result<()> {
        if let Some(delegate) = self.delegate_for(&DID_SELECT_ROW) {
            delegate.did_select_row(self, row)?;
        }
        Ok(())
    }

    pub fn estimated_row_height(&self, row: usize) -> Result<f64> {
        match self.delegate_for(&ESTIMATED_ROW_HEIGHT) {
            Some(delegate) => delegate.estimated_row_height(self, row),
            None => Ok(ESTIMATED_ROW_HEIGHT_DEFAULT),
        }
    }
}

impl SlotProvider<dyn ScrollViewDelegate> for ScrollView {
    fn current(&self) -> Option<Rc<dyn ScrollViewDelegate>> {
        self.delegate()
    }

    fn set_current(&self, delegate: Option<Rc<dyn ScrollViewDelegate>>) {
        self.set_delegate(delegate.as_ref());
    }
}

impl IntoMulticastDelegate<dyn ScrollViewDelegate> for ScrollView {
    fn multicasting_delegate(&self) -> Result<Rc<ScrollViewMulticast>> {
        if let Some(proxy) = self.multicast.get() {
            // Handed back after an uninstall, take the slot over again
            if !proxy.is_installed() {
                proxy
                    .install()
                    .wrap_err("Failed to reinstall multicast delegate")?;
                tracing::info!(view = %self.name, "Multicast delegate reinstalled");
            }
            return Ok(proxy.clone());
        }

        let this = self.this.upgrade().ok_or_eyre("Scroll view released")?;
        let proxy = self
            .multicast_config
            .make::<dyn ScrollViewDelegate, _>(&this)?;

        tracing::info!(view = %self.name, "Multicast delegate installed");

        Ok(self.multicast.get_or_init(|| proxy).clone())
    }
}
