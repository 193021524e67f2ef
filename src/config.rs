use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;
use crate::grid::{Cell, GridModel};

const CONFIG_DIR_NAME: &str = "robot-console";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_TELEMETRY_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const DEFAULT_ROWS: i32 = 5;
const DEFAULT_COLS: i32 = 7;
const DEFAULT_CELL_SIZE_PX: f32 = 50.;
/// Largest accepted row or column count.
pub const MAX_GRID_SIDE: i32 = 1024;
const DEFAULT_OBSTACLES: [[i32; 2]; 11] = [
    [0, 1],
    [0, 2],
    [1, 1],
    [1, 4],
    [1, 6],
    [2, 3],
    [2, 4],
    [3, 0],
    [3, 1],
    [3, 5],
    [4, 3],
];

/// Map geometry. Baked in at startup, never fetched from the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub rows: i32,
    pub cols: i32,
    pub cell_size_px: f32,
    pub obstacles: Vec<Cell>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            cell_size_px: DEFAULT_CELL_SIZE_PX,
            obstacles: DEFAULT_OBSTACLES.into_iter().map(Cell::from).collect(),
        }
    }
}

impl GridConfig {
    /// Rejects geometry the map cannot be drawn with.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let side = 1..=MAX_GRID_SIDE;
        if !side.contains(&self.rows) || !side.contains(&self.cols) {
            return Err(ConsoleError::InvalidGrid {
                reason: format!(
                    "{}x{} cells, each side must be between 1 and {}",
                    self.rows, self.cols, MAX_GRID_SIDE
                ),
            });
        }
        if !(self.cell_size_px.is_finite() && self.cell_size_px > 0.) {
            return Err(ConsoleError::InvalidGrid {
                reason: format!("cell size {} px", self.cell_size_px),
            });
        }
        Ok(())
    }

    pub fn build(&self) -> GridModel {
        GridModel::new(
            self.rows,
            self.cols,
            self.cell_size_px,
            self.obstacles.iter().copied(),
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub backend_url: String,
    pub telemetry_url: String,
    pub request_timeout_ms: u64,
    pub grid: GridConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            telemetry_url: DEFAULT_TELEMETRY_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            grid: GridConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn default_path() -> Result<PathBuf, ConsoleError> {
        Ok(dirs::config_dir()
            .ok_or(ConsoleError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Loads the config from the user's config directory, `None` when no
    /// config file has been written yet.
    pub fn from_local_file() -> Result<Option<Self>, ConsoleError> {
        match dirs::config_dir() {
            Some(dir) => Self::from_path(&dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
            None => Ok(None),
        }
    }

    pub fn from_path(path: &Path) -> Result<Option<Self>, ConsoleError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).map_err(|e| ConsoleError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| ConsoleError::ConfigSerializeError { source: e })?;
        config.grid.validate()?;
        Ok(Some(config))
    }

    pub fn save(&self) -> Result<PathBuf, ConsoleError> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConsoleError> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| ConsoleError::ConfigIOError { source: e })?;
        }

        let file = File::create(path).map_err(|e| ConsoleError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| ConsoleError::ConfigSerializeError { source: e })
    }

    pub fn start_navigation_url(&self) -> String {
        format!("{}/start-navigation", self.backend_url.trim_end_matches('/'))
    }

    pub fn stop_navigation_url(&self) -> String {
        format!("{}/stop-navigation", self.backend_url.trim_end_matches('/'))
    }
}
