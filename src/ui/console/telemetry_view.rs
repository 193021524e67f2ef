use egui::{Align, ColorImage, Layout, RichText, TextureOptions, vec2};
use egui_extras::{Column, TableBuilder};
use log::warn;

use robot_console::telemetry::{DetectionBox, Frame};

use super::{ConsoleApp, VIDEO_SIZE};
use crate::ui::PALETTE_GREY;

const DETECTION_ROW_HEIGHT: f32 = 18.;

fn decode_frame(frame: &Frame) -> Result<ColorImage, image::ImageError> {
    let decoded = image::load_from_memory(&frame.bytes)?.to_rgba8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, decoded.as_raw()))
}

impl ConsoleApp {
    /// Uploads the snapshot's frame if it changed since the last paint. A
    /// frame that fails to decode leaves the previous one on screen.
    fn refresh_frame_texture(&mut self, ctx: &egui::Context) {
        let Some(frame) = &self.controller.state().telemetry().frame else {
            return;
        };
        if self.frame_sequence == Some(frame.sequence) {
            return;
        }
        self.frame_sequence = Some(frame.sequence);

        match decode_frame(frame) {
            Ok(image) => match &mut self.frame_texture {
                Some(texture) => texture.set(image, TextureOptions::LINEAR),
                None => {
                    self.frame_texture =
                        Some(ctx.load_texture("telemetry-frame", image, TextureOptions::LINEAR));
                }
            },
            Err(e) => warn!("Could not decode camera frame {}: {}", frame.sequence, e),
        }
    }

    pub(crate) fn telemetry_view(&mut self, ctx: &egui::Context) {
        self.refresh_frame_texture(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.);
            match &self.frame_texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(egui::load::SizedTexture::from_handle(texture))
                            .fit_to_exact_size(vec2(VIDEO_SIZE[0], VIDEO_SIZE[1])),
                    );
                }
                None => {
                    ui.allocate_ui(vec2(VIDEO_SIZE[0], VIDEO_SIZE[1]), |ui| {
                        ui.centered_and_justified(|ui| {
                            ui.label(
                                RichText::new("Waiting for video stream...").color(PALETTE_GREY),
                            );
                        });
                    });
                }
            }

            ui.add_space(10.);
            let telemetry = self.controller.state().telemetry();
            if let Some(distance) = telemetry.ultrasonic_distance_cm {
                ui.label(format!("Ultrasonic distance: {distance} cm"));
            }
            ui.with_layout(Layout::top_down(Align::LEFT), |ui| {
                detections_table(ui, &telemetry.detections);
            });
        });
    }
}

fn detections_table(ui: &mut egui::Ui, detections: &[DetectionBox]) {
    if detections.is_empty() {
        ui.label(RichText::new("No detections").color(PALETTE_GREY));
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.))
        .column(Column::auto().at_least(80.))
        .column(Column::remainder())
        .header(20., |mut header| {
            header.col(|ui| {
                ui.strong("Label");
            });
            header.col(|ui| {
                ui.strong("Confidence");
            });
            header.col(|ui| {
                ui.strong("Box");
            });
        })
        .body(|mut body| {
            for detection in detections {
                body.row(DETECTION_ROW_HEIGHT, |mut row| {
                    row.col(|ui| {
                        ui.label(detection.label().unwrap_or("?"));
                    });
                    row.col(|ui| {
                        ui.label(
                            detection
                                .confidence()
                                .map(|confidence| format!("{:.0}%", confidence * 100.))
                                .unwrap_or_default(),
                        );
                    });
                    row.col(|ui| {
                        ui.label(
                            detection
                                .bounds()
                                .map(|[x1, y1, x2, y2]| {
                                    format!("({x1:.0}, {y1:.0}) - ({x2:.0}, {y2:.0})")
                                })
                                .unwrap_or_default(),
                        );
                    });
                });
            }
        });
}
