//! Main application state

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use eframe::CreationContext;
use egui::{Context, RichText};
use synthgrid_core::{GestureOutcome, PatchEngine, PatchSummary, Session, Timeline, TransportState};
use synthgrid_services::{
    fetch_or_empty, load_composition, load_rack, save_composition, ChannelPatchEngine,
    HttpPatchRepository, ScheduledTrigger, SessionStore,
};

use crate::config::{data_dir, load_config, save_config, AppConfig};
use crate::panels::{
    ArrangeAction, ArrangePanel, BrowserAction, BrowserPanel, BrowserView, LaneAction,
    LanesPanel, TransportAction, TransportPanel, HEADER_WIDTH,
};

/// Result of a background patch fetch
struct FetchResult {
    page: u32,
    patches: Vec<PatchSummary>,
    message: Option<String>,
}

pub struct SynthgridApp {
    config: AppConfig,
    session: Session,
    engine: ChannelPatchEngine,
    fired: Receiver<ScheduledTrigger>,
    store: SessionStore,
    repository: Option<Arc<HttpPatchRepository>>,

    // Patch browser state
    patches: Vec<PatchSummary>,
    patch_page: u32,
    repo_message: Option<String>,
    fetch_rx: Option<Receiver<FetchResult>>,

    selected_lane: usize,
    /// Set when an edit finished and the session should be persisted
    boundary: bool,
    status: Option<String>,
    last_fired: Option<String>,

    transport_panel: TransportPanel,
    lanes_panel: LanesPanel,
    arrange_panel: ArrangePanel,
    browser_panel: BrowserPanel,
}

impl SynthgridApp {
    pub fn new(_cc: &CreationContext<'_>) -> Self {
        let config = load_config();
        save_config(&config);

        let store = SessionStore::new(config.session.resolved_path());
        let is_new = !store.path().exists();
        let engine = ChannelPatchEngine::new();
        let fired = engine.fired();

        let mut session = Session::from_snapshot(store.load(), Box::new(engine.clock()))
            .with_lookahead(config.transport.lookahead_secs);
        if is_new {
            session.arrangement_mut().set_px_per_beat(config.view.px_per_beat);
            session.mark_saved();
        }

        let repository = (!config.repository.username.trim().is_empty()).then(|| {
            Arc::new(HttpPatchRepository::new(
                config.repository.base_url.clone(),
                config.repository.username.trim(),
                config.repository.page_size,
            ))
        });
        let repo_message =
            repository.is_none().then(|| "Set repository.username in config.toml to browse patches".to_string());

        let bpm = session.arrangement().timeline().bpm;
        let lane_height = config.view.lane_height;

        let mut app = Self {
            config,
            session,
            engine,
            fired,
            store,
            repository,
            patches: Vec::new(),
            patch_page: 1,
            repo_message,
            fetch_rx: None,
            selected_lane: 0,
            boundary: false,
            status: None,
            last_fired: None,
            transport_panel: TransportPanel::new(bpm),
            lanes_panel: LanesPanel::new(),
            arrange_panel: ArrangePanel::new(lane_height),
            browser_panel: BrowserPanel::new(),
        };
        app.fetch_patches(1);
        app
    }

    // ── Persistence ─────────────────────────────────────────────────

    fn save_session(&mut self) {
        if !self.session.is_dirty() {
            return;
        }
        match self.store.save(&self.session.to_snapshot()) {
            Ok(()) => self.session.mark_saved(),
            Err(e) => {
                tracing::error!("Failed to save session: {e}");
                self.status = Some(format!("Save failed: {e}"));
            }
        }
    }

    // ── Patch repository ────────────────────────────────────────────

    fn fetch_patches(&mut self, page: u32) {
        let Some(repo) = self.repository.clone() else { return };
        let (tx, rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            let (patches, message) = fetch_or_empty(repo.as_ref(), page);
            let _ = tx.send(FetchResult { page, patches, message });
        });
        self.fetch_rx = Some(rx);
    }

    fn poll_fetch(&mut self) {
        let Some(rx) = &self.fetch_rx else { return };
        match rx.try_recv() {
            Ok(result) => {
                tracing::debug!(page = result.page, count = result.patches.len(), "Patches loaded");
                self.patch_page = result.page;
                self.patches = result.patches;
                self.repo_message = result.message;
                self.fetch_rx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.fetch_rx = None,
        }
    }

    fn has_next_page(&self) -> bool {
        self.patches.len() as u32 >= self.config.repository.page_size
    }

    // ── Imports ─────────────────────────────────────────────────────

    fn import_file(&mut self, path: &Path) {
        match load_rack(path) {
            Ok(rack) => {
                let ids = self.session.import_rack(&rack);
                self.status = Some(format!("Imported {} steps from rack", ids.len()));
                self.boundary = true;
                return;
            }
            Err(e) => tracing::debug!(path = %path.display(), "Not a rack file: {e}"),
        }

        let result = load_composition(path)
            .map_err(|e| e.to_string())
            .and_then(|comp| {
                self.session
                    .import_composition(comp, &self.patches)
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(ids) => {
                self.status = Some(format!("Imported {} clips", ids.len()));
                self.boundary = true;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Import failed: {e}");
                self.status = Some(format!("Import failed: {e}"));
            }
        }
    }

    fn export_composition(&mut self) {
        let path = data_dir().join("composition.json");
        match save_composition(&path, &self.session.export_composition()) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Exported composition");
                self.status = Some(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                tracing::error!("Export failed: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    // ── Editing ─────────────────────────────────────────────────────

    fn duplicate_selection(&mut self) {
        let arrangement = self.session.arrangement();
        let (min_start, max_end) = self
            .session
            .selection()
            .ids()
            .iter()
            .filter_map(|id| arrangement.clip(*id))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), clip| {
                (lo.min(clip.start_beat), hi.max(clip.end_beat()))
            });
        if min_start.is_finite() {
            self.session.duplicate_selected(max_end - min_start);
            self.boundary = true;
        }
    }

    fn play(&mut self) {
        match self.session.play(&mut self.engine) {
            Ok(()) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn toggle_playback(&mut self) {
        if self.session.transport().is_playing() {
            self.session.pause(&mut self.engine);
        } else if self.session.transport().state() == TransportState::Paused {
            self.session.resume(&mut self.engine);
        } else {
            self.play();
        }
    }

    fn handle_keys(&mut self, ctx: &Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (space, delete, duplicate, escape, save) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.modifiers.command && i.key_pressed(egui::Key::D),
                i.key_pressed(egui::Key::Escape),
                i.modifiers.command && i.key_pressed(egui::Key::S),
            )
        });

        if space {
            self.toggle_playback();
        }
        if delete && self.session.delete_selected() > 0 {
            self.boundary = true;
        }
        if duplicate {
            self.duplicate_selection();
        }
        if escape {
            if self.session.gesture().is_some() {
                self.session.cancel_gesture();
            } else {
                self.session.cancel_loop_picker();
            }
        }
        if save {
            self.boundary = true;
        }
    }

    fn handle_transport(&mut self, action: TransportAction) {
        match action {
            TransportAction::Play => self.play(),
            TransportAction::Pause => self.session.pause(&mut self.engine),
            TransportAction::Resume => self.session.resume(&mut self.engine),
            TransportAction::Stop => {
                self.session.stop(&mut self.engine);
                self.boundary = true;
            }
            TransportAction::SetBpm(bpm) => {
                self.session.arrangement_mut().set_bpm(bpm);
                self.session.recompile(&mut self.engine);
                self.boundary = true;
            }
            TransportAction::ArmLoop => self.session.arm_loop_picker(),
            TransportAction::CancelLoopPick => self.session.cancel_loop_picker(),
            TransportAction::ClearLoop => {
                self.session.clear_loop(&mut self.engine);
                self.boundary = true;
            }
            TransportAction::None => {}
        }
    }

    fn handle_lane(&mut self, action: LaneAction) {
        match action {
            LaneAction::Select(lane) => self.selected_lane = lane,
            LaneAction::ToggleMute(lane) => {
                self.session.arrangement_mut().toggle_mute(lane);
                self.boundary = true;
            }
            LaneAction::ToggleSolo(lane) => {
                self.session.arrangement_mut().toggle_solo(lane);
                self.boundary = true;
            }
            LaneAction::Rename(lane, name) => {
                self.session.arrangement_mut().rename_lane(lane, name);
                self.boundary = true;
            }
            LaneAction::Clear(lane) => {
                self.session.clear_lane(lane);
                self.boundary = true;
            }
            LaneAction::Add => {
                self.selected_lane = self.session.arrangement_mut().add_lane();
                self.boundary = true;
            }
            LaneAction::None => {}
        }
    }

    fn handle_arrange(&mut self, action: ArrangeAction) {
        match action {
            ArrangeAction::PointerDown(pointer, modifiers) => self.session.pointer_down(pointer, modifiers),
            ArrangeAction::PointerMove(pointer) => {
                self.session.pointer_move(pointer);
            }
            ArrangeAction::PointerUp(pointer) => {
                let outcome = self.session.pointer_up(pointer);
                if !matches!(outcome, None | Some(GestureOutcome::Click)) {
                    tracing::debug!(?outcome, "Gesture finished");
                    self.boundary = true;
                }
            }
            ArrangeAction::LoopClick(beat) => {
                if let Some(region) = self.session.loop_click(beat, &mut self.engine) {
                    tracing::info!(start = region.start_sec, end = region.end_sec, "Loop committed");
                    self.boundary = true;
                }
            }
            ArrangeAction::Seek(secs) => self.session.seek(secs, &mut self.engine),
            ArrangeAction::Zoom(px_per_beat) => self.session.arrangement_mut().set_px_per_beat(px_per_beat),
            ArrangeAction::SelectLane(lane) => self.selected_lane = lane,
            ArrangeAction::ClearLane(lane) => {
                self.session.clear_lane(lane);
                self.boundary = true;
            }
            ArrangeAction::DeleteSelected => {
                self.session.delete_selected();
                self.boundary = true;
            }
            ArrangeAction::DuplicateSelected => self.duplicate_selection(),
            ArrangeAction::AddLane => {
                self.selected_lane = self.session.arrangement_mut().add_lane();
                self.boundary = true;
            }
        }
    }

    fn handle_browser(&mut self, action: BrowserAction) {
        match action {
            BrowserAction::Insert(patch) => {
                let lane = self.selected_lane.min(self.session.arrangement().lanes().len().saturating_sub(1));
                let id = self.session.insert_patch_at_playhead(lane, patch);
                tracing::debug!(?id, lane, "Inserted patch at playhead");
                self.boundary = true;
            }
            BrowserAction::FetchPage(page) => self.fetch_patches(page),
            BrowserAction::None => {}
        }
    }
}

impl eframe::App for SynthgridApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_fetch();

        // Advance the transport and collect what the engine fired
        let report = self.session.tick(&mut self.engine);
        if report.auto_stopped {
            tracing::debug!("Reached end of arrangement");
        }
        for trigger in self.fired.try_iter() {
            self.last_fired = Some(trigger.patch.label().to_string());
        }

        // Handle dropped files
        let dropped: Vec<_> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .filter(|p| p.extension().is_some_and(|e| e == "json"))
                .collect()
        });
        for path in dropped {
            self.import_file(&path);
        }

        self.handle_keys(ctx);

        // 1. Menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save").clicked() {
                        self.boundary = true;
                        ui.close_menu();
                    }
                    if ui.button("Export composition").clicked() {
                        self.export_composition();
                        ui.close_menu();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui.button("Duplicate").clicked() {
                        self.duplicate_selection();
                        ui.close_menu();
                    }
                    if ui.button("Delete").clicked() {
                        self.session.delete_selected();
                        self.boundary = true;
                        ui.close_menu();
                    }
                });
            });
        });

        // 2. Transport bar
        let transport_action = egui::TopBottomPanel::top("transport")
            .show(ctx, |ui| self.transport_panel.ui(ui, &self.session, self.status.as_deref()))
            .inner;
        self.handle_transport(transport_action);

        // 3. Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let arrangement = self.session.arrangement();
                ui.label(format!(
                    "{} clips  |  {} selected  |  {}",
                    arrangement.clips().len(),
                    self.session.selection().len(),
                    Timeline::format_time(arrangement.timeline().length_secs()),
                ));
                if let Some(name) = &self.last_fired {
                    ui.separator();
                    ui.label(RichText::new(format!("\u{266A} {name}")).weak());
                }
                if self.session.is_dirty() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(RichText::new("unsaved").weak());
                    });
                }
            });
        });

        // 4. Right sidebar: Browser
        let browser_action = egui::SidePanel::right("browser")
            .resizable(true)
            .default_width(200.0)
            .min_width(140.0)
            .show(ctx, |ui| {
                let view = BrowserView {
                    patches: &self.patches,
                    page: self.patch_page,
                    has_next: self.has_next_page(),
                    loading: self.fetch_rx.is_some(),
                    message: self.repo_message.as_deref(),
                    target_lane: self.selected_lane,
                };
                self.browser_panel.ui(ui, view)
            })
            .inner;
        self.handle_browser(browser_action);

        // 5. Central panel: Lane headers + Arrange
        let (lane_action, arrange_actions) = egui::CentralPanel::default()
            .show(ctx, |ui| {
                ui.horizontal_top(|ui| {
                    let height = ui.available_height();
                    let lane_action = ui
                        .allocate_ui(egui::vec2(HEADER_WIDTH, height), |ui| {
                            self.lanes_panel.ui(
                                ui,
                                self.session.arrangement().lanes(),
                                self.selected_lane,
                                self.arrange_panel.lane_height,
                                self.arrange_panel.vertical_scroll,
                            )
                        })
                        .inner;
                    let arrange_actions = self.arrange_panel.ui(ui, &self.session);
                    (lane_action, arrange_actions)
                })
                .inner
            })
            .inner;
        self.handle_lane(lane_action);
        for action in arrange_actions {
            self.handle_arrange(action);
        }

        if std::mem::take(&mut self.boundary) {
            self.save_session();
        }

        // Request repaint for animation
        if self.session.transport().is_playing() || self.fetch_rx.is_some() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.stop(&mut self.engine);
        self.save_session();
        self.engine.cancel_pending();
    }
}
