//! Patch browser panel - saved patches from the repository

use egui::{Color32, RichText, Ui};
use synthgrid_core::{PatchId, PatchSummary};

/// Action returned from browser panel
pub enum BrowserAction {
    None,
    /// Drop the patch onto the selected lane at the playhead
    Insert(PatchSummary),
    FetchPage(u32),
}

/// What the browser shows; owned by the app
pub struct BrowserView<'a> {
    pub patches: &'a [PatchSummary],
    pub page: u32,
    pub has_next: bool,
    pub loading: bool,
    pub message: Option<&'a str>,
    pub target_lane: usize,
}

pub struct BrowserPanel {
    filter_text: String,
    selected: Option<PatchId>,
}

impl BrowserPanel {
    pub fn new() -> Self {
        Self {
            filter_text: String::new(),
            selected: None,
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, view: BrowserView<'_>) -> BrowserAction {
        let mut action = BrowserAction::None;

        ui.heading("Patches");
        ui.horizontal(|ui| {
            ui.label("\u{1F50D}");
            ui.text_edit_singleline(&mut self.filter_text);
        });

        ui.horizontal(|ui| {
            if ui.add_enabled(view.page > 1 && !view.loading, egui::Button::new("\u{25C0}")).clicked() {
                action = BrowserAction::FetchPage(view.page - 1);
            }
            ui.label(format!("Page {}", view.page));
            if ui.add_enabled(view.has_next && !view.loading, egui::Button::new("\u{25B6}")).clicked() {
                action = BrowserAction::FetchPage(view.page + 1);
            }
            if ui.add_enabled(!view.loading, egui::Button::new("\u{27F3}")).on_hover_text("Refresh").clicked() {
                action = BrowserAction::FetchPage(view.page);
            }
            if view.loading {
                ui.spinner();
            }
        });

        if let Some(message) = view.message {
            ui.label(RichText::new(message).color(Color32::from_rgb(255, 160, 100)).small());
        }

        ui.separator();

        let filter = self.filter_text.to_lowercase();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for patch in view.patches {
                if !filter.is_empty() && !patch.label().to_lowercase().contains(&filter) {
                    continue;
                }
                let selected = self.selected == Some(patch.id);
                let response = ui
                    .selectable_label(selected, patch.label())
                    .on_hover_text(format!("{} {}  |  double-click to add", patch.note, patch.duration));
                if response.clicked() {
                    self.selected = Some(patch.id);
                }
                if response.double_clicked() {
                    action = BrowserAction::Insert(patch.clone());
                }
            }
            if view.patches.is_empty() && !view.loading {
                ui.label(RichText::new("No patches").weak());
            }
        });

        ui.separator();
        ui.label(RichText::new(format!("Adds to lane {}", view.target_lane + 1)).weak().small());
        ui.label(RichText::new("Drop a rack or composition .json to import").weak().small());

        action
    }
}
