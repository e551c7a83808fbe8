//! Arrange panel - beat grid with lanes and clips

use egui::{Color32, CursorIcon, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use synthgrid_core::{
    Clip, Gesture, GestureMode, Modifiers, PickerState, Pointer, Session, TransportState,
};

use super::lanes::lane_color;

pub const RULER_HEIGHT: f32 = 24.0;

const MIN_PX_PER_BEAT: f64 = 10.0;
const MAX_PX_PER_BEAT: f64 = 200.0;

/// Action returned from arrange panel
#[derive(Clone)]
pub enum ArrangeAction {
    PointerDown(Pointer, Modifiers),
    PointerMove(Pointer),
    PointerUp(Pointer),
    LoopClick(f64),
    Seek(f64),
    Zoom(f64),
    SelectLane(usize),
    ClearLane(usize),
    DeleteSelected,
    DuplicateSelected,
    AddLane,
}

/// Arrange panel state
pub struct ArrangePanel {
    pub scroll_offset_beats: f32,
    pub vertical_scroll: f32,
    pub lane_height: f32,
    scrubbing: bool,
    menu_lane: Option<usize>,
}

/// Screen mapping for one frame
struct View {
    rect: Rect,
    lanes_top: f32,
    px_per_beat: f32,
    scroll_beats: f32,
    vertical_scroll: f32,
    lane_height: f32,
}

impl View {
    fn beat_x(&self, beat: f64) -> f32 {
        self.rect.left() + (beat as f32 - self.scroll_beats) * self.px_per_beat
    }

    fn lane_y(&self, lane: usize) -> f32 {
        self.lanes_top + lane as f32 * self.lane_height - self.vertical_scroll
    }

    fn pointer(&self, pos: Pos2) -> Pointer {
        let beat = self.scroll_beats + (pos.x - self.rect.left()) / self.px_per_beat;
        let lane = (pos.y - self.lanes_top + self.vertical_scroll) / self.lane_height;
        Pointer::new(beat as f64, lane as f64)
    }

    fn in_ruler(&self, pos: Pos2) -> bool {
        pos.y < self.lanes_top
    }

    fn clip_rect(&self, clip: &Clip) -> Rect {
        let top = self.lane_y(clip.lane) + 2.0;
        Rect::from_min_max(
            egui::pos2(self.beat_x(clip.start_beat), top),
            egui::pos2(self.beat_x(clip.end_beat()), top + self.lane_height - 4.0),
        )
    }
}

impl ArrangePanel {
    pub fn new(lane_height: f32) -> Self {
        Self {
            scroll_offset_beats: 0.0,
            vertical_scroll: 0.0,
            lane_height: lane_height.max(24.0),
            scrubbing: false,
            menu_lane: None,
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, session: &Session) -> Vec<ArrangeAction> {
        let mut actions = Vec::new();

        let available_rect = ui.available_rect_before_wrap();
        let (response, painter) = ui.allocate_painter(available_rect.size(), Sense::click_and_drag());
        let rect = response.rect;

        let arrangement = session.arrangement();
        let timeline = arrangement.timeline();
        let geometry = arrangement.geometry();
        let lane_count = arrangement.lanes().len();

        let view = View {
            rect,
            lanes_top: rect.top() + RULER_HEIGHT,
            px_per_beat: timeline.px_per_beat as f32,
            scroll_beats: self.scroll_offset_beats,
            vertical_scroll: self.vertical_scroll,
            lane_height: self.lane_height,
        };

        let start_beat = self.scroll_offset_beats;
        let end_beat = start_beat + rect.width() / view.px_per_beat;

        // === LAYER 1: Lane backgrounds ===
        for lane in arrangement.lanes().iter() {
            let y = view.lane_y(lane.index);
            if y + self.lane_height < view.lanes_top || y > rect.bottom() {
                continue;
            }
            let row = Rect::from_min_size(egui::pos2(rect.left(), y), Vec2::new(rect.width(), self.lane_height));
            let bg = if lane.index % 2 == 0 { Color32::from_gray(42) } else { Color32::from_gray(48) };
            painter.rect_filled(row, 0.0, bg);
            if !arrangement.lanes().is_audible(lane.index) {
                painter.rect_filled(row, 0.0, Color32::from_black_alpha(60));
            }
        }

        // === LAYER 2: Grid lines ===
        let subdivision = if view.px_per_beat >= 80.0 {
            0.25
        } else if view.px_per_beat >= 40.0 {
            0.5
        } else {
            1.0
        };
        let mut beat = (start_beat / subdivision).floor() * subdivision;
        while beat <= end_beat {
            let x = view.beat_x(beat as f64);
            let (color, width) = if beat % 4.0 == 0.0 {
                (Color32::from_gray(80), 1.0)
            } else if beat.fract() == 0.0 {
                (Color32::from_gray(62), 1.0)
            } else {
                (Color32::from_gray(52), 0.5)
            };
            painter.line_segment(
                [egui::pos2(x, view.lanes_top), egui::pos2(x, rect.bottom())],
                Stroke::new(width, color),
            );
            beat += subdivision;
        }

        let length_x = view.beat_x(timeline.length_beats);
        painter.line_segment(
            [egui::pos2(length_x, view.lanes_top), egui::pos2(length_x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgb(120, 120, 160)),
        );

        // === LAYER 3: Loop region ===
        if let Some(region) = arrangement.loop_region() {
            let x0 = view.beat_x(geometry.sec_to_beat(region.start_sec));
            let x1 = view.beat_x(geometry.sec_to_beat(region.end_sec));
            let loop_rect = Rect::from_min_max(egui::pos2(x0, rect.top()), egui::pos2(x1, rect.bottom()));
            painter.rect_filled(loop_rect, 0.0, Color32::from_rgba_unmultiplied(100, 150, 200, 60));
            let edge = Stroke::new(1.0, Color32::from_rgb(100, 150, 200));
            painter.line_segment([loop_rect.left_top(), loop_rect.left_bottom()], edge);
            painter.line_segment([loop_rect.right_top(), loop_rect.right_bottom()], edge);
        }
        if let PickerState::PickingSecond { first_sec } = session.loop_picker().state() {
            let x = view.beat_x(geometry.sec_to_beat(first_sec));
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                Stroke::new(2.0, Color32::from_rgb(100, 150, 200)),
            );
        }

        // === LAYER 4: Clips ===
        let selection = session.selection();
        for clip in arrangement.clips().iter() {
            let clip_rect = view.clip_rect(clip);
            if clip_rect.right() < rect.left() || clip_rect.left() > rect.right() {
                continue;
            }
            if clip_rect.bottom() < view.lanes_top || clip_rect.top() > rect.bottom() {
                continue;
            }

            let base = arrangement
                .lanes()
                .get(clip.lane)
                .map(|lane| lane_color(lane.color))
                .unwrap_or(Color32::from_gray(120));
            let fill = match (&clip.patch_ref, arrangement.lanes().is_audible(clip.lane)) {
                (None, _) => Color32::from_gray(90),
                (Some(_), true) => base.gamma_multiply(0.8),
                (Some(_), false) => base.gamma_multiply(0.35),
            };
            painter.rect_filled(clip_rect, 3.0, fill);

            let stroke = if selection.is_selected(clip.id) {
                Stroke::new(2.0, Color32::WHITE)
            } else {
                Stroke::new(1.0, Color32::from_black_alpha(120))
            };
            painter.rect_stroke(clip_rect, 3.0, stroke, egui::StrokeKind::Outside);

            let name = if !clip.label.is_empty() {
                clip.label.as_str()
            } else {
                clip.patch_ref.as_ref().map_or("(missing patch)", |p| p.label())
            };
            painter.with_clip_rect(clip_rect.intersect(rect)).text(
                clip_rect.left_top() + Vec2::new(4.0, 3.0),
                egui::Align2::LEFT_TOP,
                name,
                FontId::proportional(10.0),
                Color32::from_gray(20),
            );
        }

        // === LAYER 5: Box selection ===
        if let Some(Gesture::Box(gesture)) = session.gesture() {
            let (b0, b1) = gesture.beat_range();
            let lane_top = |lane: f64| view.lanes_top + lane as f32 * self.lane_height - self.vertical_scroll;
            let y0 = lane_top(gesture.origin.lane.min(gesture.current.lane));
            let y1 = lane_top(gesture.origin.lane.max(gesture.current.lane));
            let box_rect = Rect::from_min_max(egui::pos2(view.beat_x(b0), y0), egui::pos2(view.beat_x(b1), y1));
            painter.rect_filled(box_rect, 0.0, Color32::from_white_alpha(20));
            painter.rect_stroke(
                box_rect,
                0.0,
                Stroke::new(1.0, Color32::from_white_alpha(140)),
                egui::StrokeKind::Inside,
            );
        }

        // === LAYER 6: Ruler ===
        let ruler_rect = Rect::from_min_size(rect.min, Vec2::new(rect.width(), RULER_HEIGHT));
        painter.rect_filled(ruler_rect, 0.0, Color32::from_gray(30));
        let first_bar = (start_beat / 4.0).floor() as i64;
        let last_bar = (end_beat / 4.0).ceil() as i64;
        for bar in first_bar.max(0)..=last_bar {
            let x = view.beat_x(bar as f64 * 4.0);
            painter.line_segment(
                [egui::pos2(x, ruler_rect.bottom() - 8.0), egui::pos2(x, ruler_rect.bottom())],
                Stroke::new(1.0, Color32::from_gray(120)),
            );
            painter.text(
                egui::pos2(x + 3.0, ruler_rect.top() + 4.0),
                egui::Align2::LEFT_TOP,
                format!("{}", bar + 1),
                FontId::monospace(10.0),
                Color32::from_gray(170),
            );
        }

        // === LAYER 7: Playhead ===
        let playhead_beat = geometry.sec_to_beat(session.playhead_secs());
        let playhead_x = view.beat_x(playhead_beat);
        if playhead_x >= rect.left() && playhead_x <= rect.right() {
            let color = if session.transport().state() == TransportState::Playing {
                Color32::from_rgb(255, 100, 100)
            } else {
                Color32::from_rgb(200, 90, 90)
            };
            painter.line_segment(
                [egui::pos2(playhead_x, rect.top()), egui::pos2(playhead_x, rect.bottom())],
                Stroke::new(2.0, color),
            );
            painter.add(egui::Shape::convex_polygon(
                vec![
                    egui::pos2(playhead_x - 6.0, rect.top()),
                    egui::pos2(playhead_x + 6.0, rect.top()),
                    egui::pos2(playhead_x, rect.top() + 10.0),
                ],
                color,
                Stroke::NONE,
            ));
        }

        // === Input ===
        let modifiers = ui.input(|i| Modifiers {
            shift: i.modifiers.shift,
            clone: i.modifiers.alt,
        });
        let picking = session.loop_picker().is_picking();

        if picking {
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    actions.push(ArrangeAction::LoopClick(view.pointer(pos).beat));
                }
            }
        } else if response.drag_started() {
            let origin = ui.input(|i| i.pointer.press_origin()).or(response.interact_pointer_pos());
            if let Some(origin) = origin {
                if view.in_ruler(origin) {
                    self.scrubbing = true;
                    actions.push(ArrangeAction::Seek(geometry.beat_to_sec(view.pointer(origin).beat.max(0.0))));
                } else {
                    actions.push(ArrangeAction::PointerDown(view.pointer(origin), modifiers));
                }
            }
        } else if response.drag_stopped() {
            let pos = ui.input(|i| i.pointer.latest_pos());
            if !std::mem::take(&mut self.scrubbing) {
                if let Some(pos) = pos {
                    actions.push(ArrangeAction::PointerUp(view.pointer(pos)));
                }
            }
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let pointer = view.pointer(pos);
                if view.in_ruler(pos) {
                    actions.push(ArrangeAction::Seek(geometry.beat_to_sec(pointer.beat.max(0.0))));
                } else {
                    actions.push(ArrangeAction::PointerDown(pointer, modifiers));
                    actions.push(ArrangeAction::PointerUp(pointer));
                    if let Some(lane) = pointer.lane_index().filter(|l| *l < lane_count) {
                        actions.push(ArrangeAction::SelectLane(lane));
                    }
                }
            }
        }

        if response.dragged() && !picking {
            if let Some(pos) = response.interact_pointer_pos() {
                let pointer = view.pointer(pos);
                if self.scrubbing {
                    actions.push(ArrangeAction::Seek(geometry.beat_to_sec(pointer.beat.max(0.0))));
                } else {
                    actions.push(ArrangeAction::PointerMove(pointer));
                }
            }
        }

        // Cursor feedback over clip edges
        if let Some(pos) = response.hover_pos() {
            if picking {
                ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
            } else if !view.in_ruler(pos) {
                let pointer = view.pointer(pos);
                let hovered = pointer
                    .lane_index()
                    .and_then(|lane| arrangement.clips().clip_at(pointer.beat, lane));
                if let Some(clip) = hovered {
                    let icon = match session.interaction().hit_mode(clip, pointer.beat, &geometry) {
                        GestureMode::Move => CursorIcon::Grab,
                        GestureMode::ResizeLeft | GestureMode::ResizeRight => CursorIcon::ResizeHorizontal,
                    };
                    ui.ctx().set_cursor_icon(icon);
                }
            }
        }

        // Right-click context menu
        if response.secondary_clicked() {
            self.menu_lane = response
                .interact_pointer_pos()
                .and_then(|pos| view.pointer(pos).lane_index())
                .filter(|lane| *lane < lane_count);
        }
        response.context_menu(|ui| {
            let has_selection = !selection.is_empty();
            if ui.add_enabled(has_selection, egui::Button::new("Duplicate")).clicked() {
                actions.push(ArrangeAction::DuplicateSelected);
                ui.close_menu();
            }
            if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
                actions.push(ArrangeAction::DeleteSelected);
                ui.close_menu();
            }
            ui.separator();
            if let Some(lane) = self.menu_lane {
                if ui.button(format!("Clear lane {}", lane + 1)).clicked() {
                    actions.push(ArrangeAction::ClearLane(lane));
                    ui.close_menu();
                }
            }
            if ui.button("Add lane").clicked() {
                actions.push(ArrangeAction::AddLane);
                ui.close_menu();
            }
        });

        // Ctrl+scroll zooms, plain scroll pans
        if response.hovered() {
            let (zoom, scroll) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta));
            if zoom != 1.0 {
                let px = (timeline.px_per_beat * zoom as f64).clamp(MIN_PX_PER_BEAT, MAX_PX_PER_BEAT);
                actions.push(ArrangeAction::Zoom(px));
            } else {
                self.scroll_offset_beats = (self.scroll_offset_beats - scroll.x / view.px_per_beat).max(0.0);
                let content_height = lane_count as f32 * self.lane_height;
                let max_scroll = (content_height - (rect.height() - RULER_HEIGHT)).max(0.0);
                self.vertical_scroll = (self.vertical_scroll - scroll.y).clamp(0.0, max_scroll);
            }
        }

        actions
    }
}
