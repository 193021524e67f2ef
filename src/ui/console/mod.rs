mod controls_view;
mod map_view;
mod telemetry_view;

use std::sync::mpsc::Sender;

use egui::{Color32, TextureHandle, Visuals, style::Widgets};
use log::{error, info};

use robot_console::{
    ConsoleConfig, SessionController, TelemetryLink, TelemetryMessage,
};

use super::{PALETTE_BLACK, PALETTE_GREY, channel_indicator};

pub(crate) const VIDEO_SIZE: [f32; 2] = [800., 600.];

/// `ConsoleApp` hosts the navigation session in a window: the map with the
/// selection and the planned path on the left, the robot's live camera and
/// detections on the right, and the navigation controls underneath.
///
/// The app never changes session state itself. It forwards clicks and
/// button presses to the [`SessionController`] and paints what the
/// controller publishes.
pub struct ConsoleApp {
    controller: SessionController,
    config: ConsoleConfig,
    recorder: Option<Sender<TelemetryMessage>>,
    frame_sequence: Option<u64>,
    frame_texture: Option<TextureHandle>,
}

impl ConsoleApp {
    pub fn new(
        controller: SessionController,
        config: ConsoleConfig,
        recorder: Option<Sender<TelemetryMessage>>,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let default_visuals = Visuals {
            dark_mode: true,
            panel_fill: PALETTE_BLACK,
            faint_bg_color: PALETTE_BLACK,
            window_fill: PALETTE_BLACK,
            widgets: Widgets::dark(),
            striped: true,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);
        egui_extras::install_image_loaders(&cc.egui_ctx);

        Self {
            controller,
            config,
            recorder,
            frame_sequence: None,
            frame_texture: None,
        }
    }

    /// Opens a fresh telemetry stream on operator request. Nothing reconnects
    /// on its own.
    fn reconnect_telemetry(&mut self, ctx: &egui::Context) {
        info!("Reconnecting telemetry to {}", self.config.telemetry_url);
        match TelemetryLink::open(
            &self.config.telemetry_url,
            self.recorder.clone(),
            Some(ctx.clone()),
        ) {
            Ok(link) => self.controller.attach_telemetry(link),
            Err(e) => error!("Could not reopen telemetry channel: {}", e),
        }
    }

    fn header_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header")
            .min_height(30.)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.heading(egui::RichText::new("Robot Pathfinder").color(Color32::WHITE));
                    ui.separator();
                    ui.label(channel_indicator(self.controller.state().channel()));
                    let live = self.controller.state().channel().is_live();
                    if ui
                        .add_enabled(!live, egui::Button::new("Reconnect"))
                        .on_hover_text(self.config.telemetry_url.as_str())
                        .clicked()
                    {
                        self.reconnect_telemetry(ctx);
                    }
                    ui.label(
                        egui::RichText::new(format!(
                            "{} messages",
                            self.controller.state().telemetry().messages_received
                        ))
                        .color(PALETTE_GREY),
                    );
                });
            });
    }
}

impl eframe::App for ConsoleApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.detach_telemetry();
        self.recorder = None;
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.pump();

        self.header_view(ctx);
        self.controls_view(ctx);
        self.map_view(ctx);
        self.telemetry_view(ctx);
    }
}
