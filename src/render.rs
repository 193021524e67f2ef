// Map rendering: grid, obstacles, path and endpoint markers as draw commands

use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};

use crate::grid::{Cell, GridModel};
use crate::session::{PathStore, Selection};

pub const GRID_LINE_COLOR: Color32 = Color32::from_rgb(0xd1, 0xd5, 0xdb);
pub const FREE_CELL_COLOR: Color32 = Color32::from_rgb(0x00, 0x00, 0x00);
pub const OBSTACLE_COLOR: Color32 = Color32::from_rgb(0xff, 0xff, 0xff);
pub const PATH_COLOR: Color32 = Color32::from_rgb(0x22, 0xc5, 0x5e);
pub const START_MARKER_COLOR: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
pub const END_MARKER_COLOR: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const MARKER_INSET_PX: f32 = 2.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPalette {
    pub grid_line: Color32,
    pub free_cell: Color32,
    pub obstacle: Color32,
    pub path: Color32,
    pub start_marker: Color32,
    pub end_marker: Color32,
}

impl Default for MapPalette {
    fn default() -> Self {
        Self {
            grid_line: GRID_LINE_COLOR,
            free_cell: FREE_CELL_COLOR,
            obstacle: OBSTACLE_COLOR,
            path: PATH_COLOR,
            start_marker: START_MARKER_COLOR,
            end_marker: END_MARKER_COLOR,
        }
    }
}

/// Rectangles are in surface pixels, origin at the map's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color32 },
    StrokeRect { rect: Rect, color: Color32 },
}

/// One full repaint of the map, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    pub size: Vec2,
    pub commands: Vec<DrawCommand>,
}

impl MapFrame {
    /// Color of the last fill covering `point`, i.e. what ends up visible there.
    pub fn color_at(&self, point: Pos2) -> Option<Color32> {
        self.commands.iter().rev().find_map(|command| match command {
            DrawCommand::FillRect { rect, color } if rect.contains(point) => Some(*color),
            _ => None,
        })
    }
}

/// Paints the map as a pure function of the grid, the current path and the
/// selection. Every call is a full repaint.
#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    palette: MapPalette,
}

impl MapRenderer {
    pub fn new(palette: MapPalette) -> Self {
        Self { palette }
    }

    pub fn render(&self, grid: &GridModel, path: &PathStore, selection: &Selection) -> MapFrame {
        let (width, height) = grid.pixel_size();
        let cell_size = grid.cell_size_px();
        let cell_count = usize::try_from(grid.rows())
            .unwrap_or(0)
            .saturating_mul(usize::try_from(grid.cols()).unwrap_or(0));
        let mut commands =
            Vec::with_capacity(cell_count.saturating_mul(2).saturating_add(path.len() + 2));

        for cell in grid.cells() {
            let rect = cell_rect(cell, cell_size);
            let color = if grid.is_obstacle(cell) {
                self.palette.obstacle
            } else {
                self.palette.free_cell
            };
            commands.push(DrawCommand::FillRect { rect, color });
            commands.push(DrawCommand::StrokeRect {
                rect,
                color: self.palette.grid_line,
            });
        }

        // obstacles keep their color even when the route crosses them
        commands.extend(
            path.cells()
                .iter()
                .filter(|cell| grid.is_valid(**cell) && !grid.is_obstacle(**cell))
                .map(|cell| DrawCommand::FillRect {
                    rect: cell_rect(*cell, cell_size),
                    color: self.palette.path,
                }),
        );

        // markers last so they stay on top of the path
        if let Some(start) = selection.start() {
            commands.push(marker(start, cell_size, self.palette.start_marker));
        }
        if let Some(end) = selection.end() {
            commands.push(marker(end, cell_size, self.palette.end_marker));
        }

        MapFrame {
            size: vec2(width, height),
            commands,
        }
    }
}

fn cell_rect(cell: Cell, cell_size: f32) -> Rect {
    Rect::from_min_size(
        pos2(cell.col as f32 * cell_size, cell.row as f32 * cell_size),
        Vec2::splat(cell_size),
    )
}

fn marker(cell: Cell, cell_size: f32, color: Color32) -> DrawCommand {
    DrawCommand::FillRect {
        rect: cell_rect(cell, cell_size).shrink(MARKER_INSET_PX),
        color,
    }
}
