use std::cell::{Cell, RefCell};

use delegate_core::core::{functional::Delegate, method::MethodIdentity};
use eyre::{eyre, Result};

use crate::{
    host::scroll_view::ScrollView,
    protocol::scroll_view_delegate::{
        ScrollViewDelegate, DID_SCROLL, DID_SELECT_ROW, ESTIMATED_ROW_HEIGHT,
    },
};

pub const PHOTO_ROW_HEIGHT: f64 = 80.0;

/// List of photos, the scroll view's own delegate.
pub struct PhotoListController {
    rows: usize,
    row_height: f64,
    top_row: Cell<usize>,
    selected: RefCell<Vec<usize>>,
}

impl PhotoListController {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            row_height: PHOTO_ROW_HEIGHT,
            top_row: Cell::new(0),
            selected: RefCell::new(Vec::new()),
        }
    }

    /// First visible row.
    pub fn top_row(&self) -> usize {
        self.top_row.get()
    }

    pub fn selected(&self) -> Vec<usize> {
        self.selected.borrow().clone()
    }
}

impl Delegate for PhotoListController {
    fn responds_to(&self, method: &MethodIdentity) -> bool {
        [DID_SCROLL, DID_SELECT_ROW, ESTIMATED_ROW_HEIGHT].contains(method)
    }
}

impl ScrollViewDelegate for PhotoListController {
    fn did_scroll(&self, view: &ScrollView) -> Result<()> {
        let offset = view.content_offset().max(0.0);
        let row = ((offset / self.row_height) as usize).min(self.rows.saturating_sub(1));
        self.top_row.set(row);
        Ok(())
    }

    fn did_select_row(&self, view: &ScrollView, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(eyre!(
                "Row {} out of range in {} ({} rows)",
                row,
                view.name(),
                self.rows
            ));
        }
        tracing::info!(row, "Photo selected");
        self.selected.borrow_mut().push(row);
        Ok(())
    }

    fn estimated_row_height(&self, _view: &ScrollView, _row: usize) -> Result<f64> {
        Ok(self.row_height)
    }
}
