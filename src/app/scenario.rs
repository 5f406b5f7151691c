use std::rc::Rc;

use delegate_core::{
    core::functional::{same_object, IntoMulticastDelegate},
    multicast::slot_adapter::UninstallOutcome,
};
use eyre::{Result, WrapErr};
use serde::Serialize;

use crate::{
    app::config::ApplicationConfig,
    controllers::{bottom_sheet::BottomSheetController, photo_list::PhotoListController},
    host::scroll_view::ScrollView,
    protocol::scroll_view_delegate::ScrollViewDelegate,
};

/// What the scripted run observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub listeners: usize,
    pub top_row: usize,
    pub selected: Vec<usize>,
    pub row_height: f64,
    pub sheet_drags: usize,
    pub collapsed_scroll_to_top: bool,
    pub opened_scroll_to_top: bool,
    pub final_offset: f64,
    pub original_restored: bool,
}

/// Runs a photo list inside a bottom sheet.
///
/// The list controller is the scroll view's own delegate and the sheet
/// listens next to it through the multicast proxy. After a scripted series
/// of drags, selections and status bar taps the proxy is uninstalled.
pub fn run_scenario(config: &ApplicationConfig) -> Result<ScenarioReport> {
    let settings = &config.scenario;

    let view = ScrollView::new("photos", config.multicast.clone());
    let list = Rc::new(PhotoListController::new(settings.rows));
    let list_delegate: Rc<dyn ScrollViewDelegate> = list.clone();
    view.set_delegate(Some(&list_delegate));

    let sheet = BottomSheetController::new();
    sheet
        .attach(&view)
        .wrap_err("Failed to attach bottom sheet")?;

    let proxy = view.multicasting_delegate()?;
    let listeners = proxy.len();
    tracing::info!(listeners, "Scenario started");

    view.drag(settings.drag_distance)?;
    view.select_row(settings.selected_row)?;
    let row_height = view.estimated_row_height(settings.selected_row)?;
    let top_row = list.top_row();

    // Back to the top and past it, which collapses the sheet
    view.drag(-(view.content_offset() + settings.drag_distance))?;
    let collapsed_scroll_to_top = view.tap_status_bar()?;
    tracing::info!(mode = %sheet.mode(), "Status bar tapped");

    sheet.expand(&view);
    let opened_scroll_to_top = view.tap_status_bar()?;

    let outcome = proxy.uninstall()?;
    let original_restored = outcome == UninstallOutcome::Restored
        && view
            .delegate()
            .is_some_and(|d| same_object(Rc::as_ptr(&d), Rc::as_ptr(&list_delegate)));

    let report = ScenarioReport {
        listeners,
        top_row,
        selected: list.selected(),
        row_height,
        sheet_drags: sheet.drags(),
        collapsed_scroll_to_top,
        opened_scroll_to_top,
        final_offset: view.content_offset(),
        original_restored,
    };

    tracing::info!(
        ?outcome,
        sheet = %sheet.mode(),
        "Scenario finished"
    );

    Ok(report)
}
