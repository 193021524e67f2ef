use egui::{Sense, Stroke, StrokeKind};
use log::debug;

use robot_console::render::{DrawCommand, MapFrame};

use super::ConsoleApp;

const GRID_LINE_WIDTH: f32 = 1.;

impl ConsoleApp {
    pub(crate) fn map_view(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("map")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(10.);
                let size = self.controller.map_frame().size;
                let (response, painter) = ui.allocate_painter(size, Sense::click());

                if response.clicked()
                    && let Some(pointer) = response.interact_pointer_pos()
                {
                    let local = pointer - response.rect.min;
                    let outcome = self.controller.click_at(local.x, local.y);
                    debug!("Map click at {:?}: {:?}", local, outcome);
                }

                paint_map(&painter, response.rect, self.controller.map_frame());
            });
    }
}

/// Replays a rendered map frame onto the surface at `target`. A surface with
/// no area is skipped.
fn paint_map(painter: &egui::Painter, target: egui::Rect, frame: &MapFrame) {
    if !target.is_positive() {
        return;
    }
    let offset = target.min.to_vec2();
    for command in &frame.commands {
        match *command {
            DrawCommand::FillRect { rect, color } => {
                painter.rect_filled(rect.translate(offset), 0., color);
            }
            DrawCommand::StrokeRect { rect, color } => {
                painter.rect_stroke(
                    rect.translate(offset),
                    0.,
                    Stroke::new(GRID_LINE_WIDTH, color),
                    StrokeKind::Inside,
                );
            }
        }
    }
}
