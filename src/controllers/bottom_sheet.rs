use std::{
    cell::Cell,
    fmt,
    rc::{Rc, Weak},
};

use delegate_core::core::{
    functional::{Delegate, IntoMulticastDelegate},
    method::MethodIdentity,
};
use eyre::Result;
use itertools::Itertools;

use crate::{
    host::scroll_view::ScrollView,
    protocol::scroll_view_delegate::{
        ScrollViewDelegate, DID_END_DRAGGING, DID_SCROLL, SHOULD_SCROLL_TO_TOP,
    },
};

/// Visible fractions of the screen the sheet snaps to.
pub const SHEET_FRACTIONS: [f64; 3] = [0.2, 0.5, 0.9];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetMode {
    Opened,
    Collapsed,
}

impl fmt::Display for SheetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Collapsed => write!(f, "collapsed"),
        }
    }
}

/// Sheet hosting a scrollable list it does not own the delegate of.
///
/// The sheet listens to the list's scroll view next to the list controller.
/// Pulling the content down past its top collapses the sheet, and the list
/// only scrolls while the sheet is opened.
pub struct BottomSheetController {
    this: Weak<Self>,
    mode: Cell<SheetMode>,
    fraction: Cell<f64>,
    drags: Cell<usize>,
}

impl BottomSheetController {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            mode: Cell::new(SheetMode::Opened),
            fraction: Cell::new(Self::max_fraction()),
            drags: Cell::new(0),
        })
    }

    pub fn mode(&self) -> SheetMode {
        self.mode.get()
    }

    pub fn fraction(&self) -> f64 {
        self.fraction.get()
    }

    /// Completed drags observed.
    pub fn drags(&self) -> usize {
        self.drags.get()
    }

    /// Starts listening to `view` through its multicast delegate.
    pub fn attach(&self, view: &ScrollView) -> Result<bool> {
        let Some(this) = self.this.upgrade() else {
            return Ok(false);
        };
        let listener: Rc<dyn ScrollViewDelegate> = this;
        let added = view.multicasting_delegate()?.add(&listener);
        self.enable_scroll_if_needed(view);
        Ok(added)
    }

    pub fn detach(&self, view: &ScrollView) -> Result<bool> {
        let Some(this) = self.this.upgrade() else {
            return Ok(false);
        };
        let listener: Rc<dyn ScrollViewDelegate> = this;
        Ok(view.multicasting_delegate()?.remove(&listener))
    }

    /// Moves the sheet to the snap point closest to `fraction`.
    pub fn snap(&self, view: &ScrollView, fraction: f64) -> f64 {
        let closest = find_closest(fraction, &SHEET_FRACTIONS);
        let mode = if closest >= Self::max_fraction() {
            SheetMode::Opened
        } else {
            SheetMode::Collapsed
        };

        if mode != self.mode.get() {
            tracing::debug!(%mode, fraction = closest, "Sheet mode changed");
        }

        self.fraction.set(closest);
        self.mode.set(mode);
        self.enable_scroll_if_needed(view);
        closest
    }

    pub fn expand(&self, view: &ScrollView) {
        self.snap(view, Self::max_fraction());
    }

    fn enable_scroll_if_needed(&self, view: &ScrollView) {
        view.set_scroll_enabled(self.mode.get() == SheetMode::Opened);
    }

    fn max_fraction() -> f64 {
        SHEET_FRACTIONS
            .iter()
            .copied()
            .fold(f64::MIN, f64::max)
    }
}

fn find_closest(value: f64, values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
        .unwrap_or(value)
}

impl Delegate for BottomSheetController {
    fn responds_to(&self, method: &MethodIdentity) -> bool {
        [DID_SCROLL, DID_END_DRAGGING, SHOULD_SCROLL_TO_TOP].contains(method)
    }
}

impl ScrollViewDelegate for BottomSheetController {
    fn did_scroll(&self, view: &ScrollView) -> Result<()> {
        if view.content_offset() < 0.0 && self.mode.get() == SheetMode::Opened {
            // Pulled past the top, the sheet follows instead of the content
            view.set_scroll_enabled(false);
            let smallest = SHEET_FRACTIONS.iter().copied().fold(f64::MAX, f64::min);
            self.snap(view, smallest);
        }
        Ok(())
    }

    fn did_end_dragging(&self, _view: &ScrollView, will_decelerate: bool) -> Result<()> {
        self.drags.set(self.drags.get() + 1);
        tracing::trace!(will_decelerate, drags = self.drags.get(), "Drag ended");
        Ok(())
    }

    fn should_scroll_to_top(&self, _view: &ScrollView) -> Result<bool> {
        Ok(self.mode.get() == SheetMode::Opened)
    }
}

impl fmt::Debug for BottomSheetController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BottomSheetController")
            .field("mode", &self.mode.get())
            .field("fraction", &self.fraction.get())
            .field(
                "fractions",
                &SHEET_FRACTIONS.iter().map(|x| x.to_string()).join("/"),
            )
            .finish()
    }
}
