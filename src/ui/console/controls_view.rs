use egui::{Button, Color32, Layout, RichText};
use log::debug;

use robot_console::NavigationStatus;

use super::ConsoleApp;
use crate::ui::PALETTE_ORANGE;

const START_BUTTON_COLOR: Color32 = Color32::from_rgb(0x25, 0x63, 0xeb);
const STOP_BUTTON_COLOR: Color32 = Color32::from_rgb(0xdc, 0x26, 0x26);
const RESET_BUTTON_COLOR: Color32 = Color32::from_rgb(0x6b, 0x72, 0x80);

impl ConsoleApp {
    pub(crate) fn controls_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls")
            .min_height(60.)
            .show(ctx, |ui| {
                ui.add_space(6.);
                ui.with_layout(Layout::top_down(egui::Align::Center), |ui| {
                    ui.horizontal(|ui| {
                        let in_flight = self.controller.state().navigation().is_in_flight();
                        let start_label = if in_flight {
                            "Processing..."
                        } else {
                            "Start navigation"
                        };

                        if ui
                            .add_enabled(
                                self.controller.can_start(),
                                Button::new(RichText::new(start_label).color(Color32::WHITE))
                                    .fill(START_BUTTON_COLOR),
                            )
                            .clicked()
                            && let Err(e) = self.controller.request_navigation_start()
                        {
                            debug!("Start rejected: {}", e);
                        }

                        if ui
                            .add_enabled(
                                self.controller.can_stop(),
                                Button::new(RichText::new("Stop robot").color(Color32::WHITE))
                                    .fill(STOP_BUTTON_COLOR),
                            )
                            .clicked()
                            && let Err(e) = self.controller.request_navigation_stop()
                        {
                            debug!("Stop rejected: {}", e);
                        }

                        if ui
                            .add(
                                Button::new(RichText::new("Reset").color(Color32::WHITE))
                                    .fill(RESET_BUTTON_COLOR),
                            )
                            .clicked()
                        {
                            self.controller.reset();
                        }

                        ui.label(status_label(self.controller.state().navigation()));
                    });

                    let state = self.controller.state();
                    if !state.message().is_empty() {
                        ui.label(state.message());
                    }
                    if state.unconfirmed_motion() {
                        ui.label(
                            RichText::new("Robot may still be moving").color(PALETTE_ORANGE),
                        );
                    }
                });
            });
    }
}

fn status_label(status: NavigationStatus) -> &'static str {
    match status {
        NavigationStatus::Idle => "Idle",
        NavigationStatus::Requesting => "Requesting path...",
        NavigationStatus::Running => "Running",
        NavigationStatus::Stopping => "Stopping...",
    }
}
