use egui::{Color32, RichText};

use robot_console::session::ChannelStatus;

pub(crate) mod console;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_GREY: Color32 = Color32::from_rgb(0x6b, 0x72, 0x80);
pub(crate) const PALETTE_GREEN: Color32 = Color32::from_rgb(0x22, 0xc5, 0x5e);
pub(crate) const PALETTE_ORANGE: Color32 = Color32::from_rgb(242, 97, 63);
pub(crate) const PALETTE_RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);

/// Connectivity indicator text for the telemetry stream.
pub(crate) fn channel_indicator(status: &ChannelStatus) -> RichText {
    match status {
        ChannelStatus::Disconnected => RichText::new("● Telemetry off").color(PALETTE_GREY),
        ChannelStatus::Connecting => RichText::new("● Connecting...").color(PALETTE_ORANGE),
        ChannelStatus::Connected => RichText::new("● Live").color(PALETTE_GREEN),
        ChannelStatus::Closed { reason: None } => {
            RichText::new("● Stream closed").color(PALETTE_RED)
        }
        ChannelStatus::Closed {
            reason: Some(reason),
        } => RichText::new(format!("● Stream closed: {reason}")).color(PALETTE_RED),
        ChannelStatus::Failed { reason } => {
            RichText::new(format!("● Stream error: {reason}")).color(PALETTE_RED)
        }
    }
}
