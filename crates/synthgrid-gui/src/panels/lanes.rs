//! Lane headers - name, mute and solo per lane

use egui::{Color32, Rect, RichText, Sense, Stroke, Ui, Vec2};
use synthgrid_core::{Lane, LaneColor, LaneRegistry};

use super::arrange::RULER_HEIGHT;

pub const HEADER_WIDTH: f32 = 160.0;

pub enum LaneAction {
    None,
    Select(usize),
    ToggleMute(usize),
    ToggleSolo(usize),
    Rename(usize, String),
    Clear(usize),
    Add,
}

pub fn lane_color(color: LaneColor) -> Color32 {
    Color32::from_rgb(color.0, color.1, color.2)
}

pub struct LanesPanel {
    editing: Option<(usize, String)>,
}

impl LanesPanel {
    pub fn new() -> Self {
        Self { editing: None }
    }

    /// Draw one header per lane, aligned with the arrange rows
    pub fn ui(
        &mut self,
        ui: &mut Ui,
        lanes: &LaneRegistry,
        selected_lane: usize,
        lane_height: f32,
        vertical_scroll: f32,
    ) -> LaneAction {
        let mut action = LaneAction::None;

        let available = ui.available_rect_before_wrap();
        let (rect, _) = ui.allocate_exact_size(available.size(), Sense::hover());
        let painter = ui.painter_at(rect);

        painter.rect_filled(
            Rect::from_min_size(rect.min, Vec2::new(rect.width(), RULER_HEIGHT)),
            0.0,
            Color32::from_gray(30),
        );
        if ui
            .put(
                Rect::from_min_size(rect.min + Vec2::new(4.0, 2.0), Vec2::new(70.0, RULER_HEIGHT - 4.0)),
                egui::Button::new("+ Lane"),
            )
            .clicked()
        {
            action = LaneAction::Add;
        }

        let rows_top = rect.top() + RULER_HEIGHT;
        let rows_rect = Rect::from_min_max(egui::pos2(rect.left(), rows_top), rect.max);

        for lane in lanes.iter() {
            let y = rows_top + lane.index as f32 * lane_height - vertical_scroll;
            let row = Rect::from_min_size(egui::pos2(rect.left(), y), Vec2::new(rect.width(), lane_height));
            if !row.intersects(rows_rect) {
                continue;
            }
            if let Some(a) = self.row_ui(ui, &painter, lane, row, rows_rect, lane.index == selected_lane) {
                action = a;
            }
        }

        action
    }

    fn row_ui(
        &mut self,
        ui: &mut Ui,
        painter: &egui::Painter,
        lane: &Lane,
        row: Rect,
        clip: Rect,
        selected: bool,
    ) -> Option<LaneAction> {
        let mut action = None;
        let painter = painter.with_clip_rect(clip);

        let bg = if selected { Color32::from_gray(58) } else { Color32::from_gray(40) };
        painter.rect_filled(row, 0.0, bg);
        painter.rect_filled(
            Rect::from_min_size(row.min, Vec2::new(4.0, row.height())),
            0.0,
            lane_color(lane.color),
        );
        painter.line_segment(
            [row.left_bottom(), row.right_bottom()],
            Stroke::new(1.0, Color32::from_gray(25)),
        );

        // Rows scrolled partly out of view only get the painted background
        if !clip.contains_rect(row) {
            return None;
        }

        let name_rect = Rect::from_min_size(row.min + Vec2::new(10.0, 4.0), Vec2::new(row.width() - 60.0, 18.0));
        let editing_this = matches!(&self.editing, Some((index, _)) if *index == lane.index);
        match self.editing.as_mut() {
            Some((_, text)) if editing_this => {
                let response = ui.put(name_rect, egui::TextEdit::singleline(text));
                if response.lost_focus() {
                    let name = text.trim().to_string();
                    if !name.is_empty() && name != lane.name {
                        action = Some(LaneAction::Rename(lane.index, name));
                    }
                    self.editing = None;
                } else {
                    response.request_focus();
                }
            }
            _ => {
                let response = ui.put(
                    name_rect,
                    egui::Label::new(RichText::new(&lane.name).strong()).sense(Sense::click()),
                );
                if response.double_clicked() {
                    self.editing = Some((lane.index, lane.name.clone()));
                } else if response.clicked() {
                    action = Some(LaneAction::Select(lane.index));
                }
                response.context_menu(|ui| {
                    if ui.button("Rename").clicked() {
                        self.editing = Some((lane.index, lane.name.clone()));
                        ui.close_menu();
                    }
                    if ui.button("Clear lane").clicked() {
                        action = Some(LaneAction::Clear(lane.index));
                        ui.close_menu();
                    }
                });
            }
        }

        let button_y = row.top() + 24.0;
        let mute_rect = Rect::from_min_size(egui::pos2(row.left() + 10.0, button_y), Vec2::new(22.0, 18.0));
        let solo_rect = Rect::from_min_size(egui::pos2(row.left() + 36.0, button_y), Vec2::new(22.0, 18.0));

        if row.height() >= 44.0 {
            let mute_fill = if lane.mute { Color32::from_rgb(200, 120, 40) } else { Color32::from_gray(60) };
            let mute = ui.put(mute_rect, egui::Button::new("M").fill(mute_fill)).on_hover_text("Mute");
            if mute.clicked() {
                action = Some(LaneAction::ToggleMute(lane.index));
            }

            let solo_fill = if lane.solo { Color32::from_rgb(220, 200, 40) } else { Color32::from_gray(60) };
            let solo = ui.put(solo_rect, egui::Button::new("S").fill(solo_fill)).on_hover_text("Solo");
            if solo.clicked() {
                action = Some(LaneAction::ToggleSolo(lane.index));
            }
        }

        action
    }
}
