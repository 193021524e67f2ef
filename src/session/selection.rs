use crate::errors::{ConsoleError, PreconditionKind};
use crate::grid::{Cell, GridModel};

/// Start/end selection. Neither endpoint is ever an obstacle and the two are
/// never the same cell when both are chosen through [`SelectionStateMachine::click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Empty,
    StartChosen {
        start: Cell,
    },
    BothChosen {
        start: Cell,
        end: Cell,
    },
}

impl Selection {
    pub fn start(&self) -> Option<Cell> {
        match self {
            Self::Empty => None,
            Self::StartChosen { start } | Self::BothChosen { start, .. } => Some(*start),
        }
    }

    pub fn end(&self) -> Option<Cell> {
        match self {
            Self::BothChosen { end, .. } => Some(*end),
            _ => None,
        }
    }
}

/// What a click did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    StartChosen(Cell),
    EndChosen(Cell),
    /// Out of bounds, obstacle, same cell as the start, or selection locked.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStateMachine {
    state: Selection,
}

impl SelectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing selection without running the click guards.
    #[cfg(test)]
    pub(crate) fn from_selection(state: Selection) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Selection {
        self.state
    }

    pub fn click(&mut self, grid: &GridModel, cell: Cell) -> ClickOutcome {
        if !grid.is_selectable(cell) {
            return ClickOutcome::Ignored;
        }

        match self.state {
            Selection::Empty => {
                self.state = Selection::StartChosen { start: cell };
                ClickOutcome::StartChosen(cell)
            }
            Selection::StartChosen { start } if start != cell => {
                self.state = Selection::BothChosen { start, end: cell };
                ClickOutcome::EndChosen(cell)
            }
            // same cell as the start, or both endpoints already locked in
            Selection::StartChosen { .. } | Selection::BothChosen { .. } => ClickOutcome::Ignored,
        }
    }

    pub fn reset(&mut self) {
        self.state = Selection::Empty;
    }

    /// Endpoints for a navigation request. Re-validates the selection rather
    /// than trusting that it was built through `click`.
    pub fn navigation_endpoints(&self) -> Result<(Cell, Cell), ConsoleError> {
        match self.state {
            Selection::BothChosen { start, end } if start == end => Err(
                ConsoleError::precondition(PreconditionKind::DegenerateSelection),
            ),
            Selection::BothChosen { start, end } => Ok((start, end)),
            _ => Err(ConsoleError::precondition(
                PreconditionKind::MissingEndpoints,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field_grid() -> GridModel {
        crate::config::GridConfig::default().build()
    }

    #[test]
    fn test_start_then_end() {
        let grid = field_grid();
        let mut machine = SelectionStateMachine::new();

        assert_eq!(
            machine.click(&grid, Cell::new(2, 2)),
            ClickOutcome::StartChosen(Cell::new(2, 2))
        );
        assert_eq!(
            machine.click(&grid, Cell::new(2, 5)),
            ClickOutcome::EndChosen(Cell::new(2, 5))
        );
        assert_eq!(
            machine.state(),
            Selection::BothChosen {
                start: Cell::new(2, 2),
                end: Cell::new(2, 5)
            }
        );
    }

    #[test]
    fn test_same_cell_as_start_is_ignored() {
        let grid = field_grid();
        let mut machine = SelectionStateMachine::new();
        machine.click(&grid, Cell::new(2, 2));

        assert_eq!(machine.click(&grid, Cell::new(2, 2)), ClickOutcome::Ignored);
        assert_eq!(
            machine.state(),
            Selection::StartChosen {
                start: Cell::new(2, 2)
            }
        );
    }

    #[test]
    fn test_selection_locked_once_both_chosen() {
        let grid = field_grid();
        let mut machine = SelectionStateMachine::new();
        machine.click(&grid, Cell::new(2, 2));
        machine.click(&grid, Cell::new(2, 5));

        assert_eq!(machine.click(&grid, Cell::new(4, 4)), ClickOutcome::Ignored);
        assert_eq!(machine.state().end(), Some(Cell::new(2, 5)));
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let grid = field_grid();
        let mut machine = SelectionStateMachine::new();
        assert_eq!(machine.click(&grid, Cell::new(5, 0)), ClickOutcome::Ignored);
        assert_eq!(machine.click(&grid, Cell::new(0, -1)), ClickOutcome::Ignored);
        assert_eq!(machine.state(), Selection::Empty);
    }

    #[test]
    fn test_endpoints_preconditions() {
        let grid = field_grid();
        let mut machine = SelectionStateMachine::new();
        assert_eq!(
            machine.navigation_endpoints().unwrap_err().precondition_kind(),
            Some(PreconditionKind::MissingEndpoints)
        );

        machine.click(&grid, Cell::new(2, 2));
        assert_eq!(
            machine.navigation_endpoints().unwrap_err().precondition_kind(),
            Some(PreconditionKind::MissingEndpoints)
        );

        let degenerate = SelectionStateMachine::from_selection(Selection::BothChosen {
            start: Cell::new(2, 2),
            end: Cell::new(2, 2),
        });
        assert_eq!(
            degenerate.navigation_endpoints().unwrap_err().precondition_kind(),
            Some(PreconditionKind::DegenerateSelection)
        );
    }

    fn any_selection() -> impl Strategy<Value = Selection> {
        let cell = (0i32..5, 0i32..7).prop_map(|(row, col)| Cell::new(row, col));
        prop_oneof![
            Just(Selection::Empty),
            cell.clone().prop_map(|start| Selection::StartChosen { start }),
            (cell.clone(), cell).prop_map(|(start, end)| Selection::BothChosen { start, end }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_obstacle_clicks_never_change_selection(
            prior in any_selection(),
            obstacle_index in 0usize..11,
        ) {
            let grid = field_grid();
            let mut obstacles: Vec<Cell> = grid.obstacles().collect();
            obstacles.sort();
            let mut machine = SelectionStateMachine::from_selection(prior);

            let outcome = machine.click(&grid, obstacles[obstacle_index]);

            prop_assert_eq!(outcome, ClickOutcome::Ignored);
            prop_assert_eq!(machine.state(), prior);
        }

        #[test]
        fn prop_clicks_never_produce_equal_endpoints(
            clicks in prop::collection::vec((-1i32..6, -1i32..8), 0..20),
        ) {
            let grid = field_grid();
            let mut machine = SelectionStateMachine::new();
            for (row, col) in clicks {
                machine.click(&grid, Cell::new(row, col));
                if let Selection::BothChosen { start, end } = machine.state() {
                    prop_assert_ne!(start, end);
                }
                if let Some(start) = machine.state().start() {
                    prop_assert!(grid.is_selectable(start));
                }
                if let Some(end) = machine.state().end() {
                    prop_assert!(grid.is_selectable(end));
                }
            }
        }
    }
}
