//! Transport controls panel

use egui::{Color32, RichText, Ui};
use synthgrid_core::{PickerState, Session, Timeline, TransportState};

/// Actions that can be triggered from transport
pub enum TransportAction {
    None,
    Play,
    Pause,
    Resume,
    Stop,
    SetBpm(f64),
    ArmLoop,
    CancelLoopPick,
    ClearLoop,
}

pub struct TransportPanel {
    bpm_text: String,
}

impl TransportPanel {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm_text: format!("{bpm:.1}"),
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, session: &Session, status: Option<&str>) -> TransportAction {
        let mut action = TransportAction::None;
        let state = session.transport().state();

        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;

            // Play/Pause
            let (play_text, play_action) = match state {
                TransportState::Playing => ("\u{23F8}", TransportAction::Pause),
                TransportState::Paused => ("\u{25B6}", TransportAction::Resume),
                TransportState::Stopped => ("\u{25B6}", TransportAction::Play),
            };
            if ui.button(RichText::new(play_text).size(20.0)).clicked() {
                action = play_action;
            }

            // Stop
            if ui.button(RichText::new("\u{23F9}").size(20.0)).clicked() {
                action = TransportAction::Stop;
            }

            ui.separator();

            ui.monospace(Timeline::format_time(session.playhead_secs()));

            ui.separator();

            // BPM
            ui.label("BPM:");
            let response = ui.add(egui::TextEdit::singleline(&mut self.bpm_text).desired_width(50.0));
            let bpm = session.arrangement().timeline().bpm;
            if response.lost_focus() {
                match self.bpm_text.trim().parse::<f64>() {
                    Ok(value) => action = TransportAction::SetBpm(value),
                    Err(_) => self.bpm_text = format!("{bpm:.1}"),
                }
            } else if !response.has_focus() {
                self.bpm_text = format!("{bpm:.1}");
            }

            ui.separator();

            // Loop picker
            match session.loop_picker().state() {
                PickerState::PickingFirst | PickerState::PickingSecond { .. } => {
                    let hint = match session.loop_picker().state() {
                        PickerState::PickingFirst => "Click loop start",
                        _ => "Click loop end",
                    };
                    let btn = ui.button(RichText::new("\u{1F501}").size(16.0).color(Color32::from_rgb(100, 150, 200)));
                    if btn.clicked() {
                        action = TransportAction::CancelLoopPick;
                    }
                    btn.on_hover_text("Cancel loop pick");
                    ui.label(RichText::new(hint).color(Color32::from_rgb(100, 150, 200)));
                }
                PickerState::Idle | PickerState::Committed(_) => {
                    let btn = ui.button(RichText::new("\u{1F501}").size(16.0));
                    if btn.clicked() {
                        action = TransportAction::ArmLoop;
                    }
                    btn.on_hover_text("Pick loop region");
                }
            }

            if let Some(region) = session.arrangement().loop_region() {
                ui.monospace(format!(
                    "{} - {}",
                    Timeline::format_time(region.start_sec),
                    Timeline::format_time(region.end_sec)
                ));
                if ui.small_button("\u{2715}").on_hover_text("Clear loop").clicked() {
                    action = TransportAction::ClearLoop;
                }
            }

            // Status on right
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = match state {
                    TransportState::Playing => "Playing",
                    TransportState::Paused => "Paused",
                    TransportState::Stopped => "Stopped",
                };
                ui.label(label);
                if let Some(status) = status {
                    ui.label(RichText::new(status).color(Color32::from_rgb(255, 100, 100)));
                }
            });
        });

        action
    }
}
