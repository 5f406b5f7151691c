//! # Scroll view delegate protocol
//!
//! Optional callbacks a [`ScrollView`] makes into its single delegate. Every
//! callback has a default body, and implementers list the ones they override
//! in [`Delegate::responds_to`]. The host only calls the callbacks its
//! delegate responds to, and uses the documented defaults otherwise:
//!
//! | Method                     | Default when unhandled              |
//! |----------------------------|-------------------------------------|
//! | `should_scroll_to_top`     | [`SHOULD_SCROLL_TO_TOP_DEFAULT`]    |
//! | `estimated_row_height`     | [`ESTIMATED_ROW_HEIGHT_DEFAULT`]    |
//! | notifications              | nothing happens                     |

use std::rc::Rc;

use delegate_core::{
    core::{
        functional::{AsListener, Delegate},
        method::MethodIdentity,
    },
    multicast::multicast_delegate::MulticastDelegate,
};
use eyre::Result;

use crate::host::scroll_view::ScrollView;

pub const DID_SCROLL: MethodIdentity = MethodIdentity::new("scrollViewDidScroll:", 1);
pub const WILL_BEGIN_DRAGGING: MethodIdentity =
    MethodIdentity::new("scrollViewWillBeginDragging:", 1);
pub const DID_END_DRAGGING: MethodIdentity =
    MethodIdentity::new("scrollViewDidEndDragging:willDecelerate:", 2);
pub const SHOULD_SCROLL_TO_TOP: MethodIdentity =
    MethodIdentity::new("scrollViewShouldScrollToTop:", 1);
pub const DID_SELECT_ROW: MethodIdentity = MethodIdentity::new("tableView:didSelectRowAt:", 2);
pub const ESTIMATED_ROW_HEIGHT: MethodIdentity =
    MethodIdentity::new("tableView:estimatedHeightForRowAt:", 2);

pub const ALL_METHODS: [MethodIdentity; 6] = [
    DID_SCROLL,
    WILL_BEGIN_DRAGGING,
    DID_END_DRAGGING,
    SHOULD_SCROLL_TO_TOP,
    DID_SELECT_ROW,
    ESTIMATED_ROW_HEIGHT,
];

/// Scrolling to top is allowed unless a delegate says otherwise.
pub const SHOULD_SCROLL_TO_TOP_DEFAULT: bool = true;

/// Row height used when no delegate estimates one.
pub const ESTIMATED_ROW_HEIGHT_DEFAULT: f64 = 44.0;

pub trait ScrollViewDelegate: Delegate {
    fn did_scroll(&self, _view: &ScrollView) -> Result<()> {
        Ok(())
    }

    fn will_begin_dragging(&self, _view: &ScrollView) -> Result<()> {
        Ok(())
    }

    fn did_end_dragging(&self, _view: &ScrollView, _will_decelerate: bool) -> Result<()> {
        Ok(())
    }

    fn should_scroll_to_top(&self, _view: &ScrollView) -> Result<bool> {
        Ok(SHOULD_SCROLL_TO_TOP_DEFAULT)
    }

    fn did_select_row(&self, _view: &ScrollView, _row: usize) -> Result<()> {
        Ok(())
    }

    fn estimated_row_height(&self, _view: &ScrollView, _row: usize) -> Result<f64> {
        Ok(ESTIMATED_ROW_HEIGHT_DEFAULT)
    }
}

pub type ScrollViewMulticast = MulticastDelegate<dyn ScrollViewDelegate>;

impl ScrollViewDelegate for ScrollViewMulticast {
    fn did_scroll(&self, view: &ScrollView) -> Result<()> {
        self.dispatch(&DID_SCROLL, |d| d.did_scroll(view))?;
        Ok(())
    }

    fn will_begin_dragging(&self, view: &ScrollView) -> Result<()> {
        self.dispatch(&WILL_BEGIN_DRAGGING, |d| d.will_begin_dragging(view))?;
        Ok(())
    }

    fn did_end_dragging(&self, view: &ScrollView, will_decelerate: bool) -> Result<()> {
        self.dispatch(&DID_END_DRAGGING, |d| {
            d.did_end_dragging(view, will_decelerate)
        })?;
        Ok(())
    }

    fn should_scroll_to_top(&self, view: &ScrollView) -> Result<bool> {
        let result = self.dispatch(&SHOULD_SCROLL_TO_TOP, |d| d.should_scroll_to_top(view))?;
        Ok(result.unwrap_or(SHOULD_SCROLL_TO_TOP_DEFAULT))
    }

    fn did_select_row(&self, view: &ScrollView, row: usize) -> Result<()> {
        self.dispatch(&DID_SELECT_ROW, |d| d.did_select_row(view, row))?;
        Ok(())
    }

    fn estimated_row_height(&self, view: &ScrollView, row: usize) -> Result<f64> {
        let result = self.dispatch(&ESTIMATED_ROW_HEIGHT, |d| {
            d.estimated_row_height(view, row)
        })?;
        Ok(result.unwrap_or(ESTIMATED_ROW_HEIGHT_DEFAULT))
    }
}

impl AsListener<dyn ScrollViewDelegate> for ScrollViewMulticast {
    fn as_listener(self: Rc<Self>) -> Rc<dyn ScrollViewDelegate> {
        self
    }
}
