// Library interface for the robot console
// This allows integration tests and benches to access internal modules

pub mod config;
pub mod errors;
pub mod grid;
pub mod navigation;
pub mod render;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use config::ConsoleConfig;
pub use errors::{ConsoleError, PreconditionKind};
pub use grid::{Cell, GridModel};
pub use navigation::{NavigationBackend, NavigationClient};
pub use session::{NavigationStatus, Selection, SessionController};
pub use telemetry::{TelemetryEvent, TelemetryLink, TelemetryMessage, TelemetrySnapshot};
