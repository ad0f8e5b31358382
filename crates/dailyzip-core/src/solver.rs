//! Solvability search for puzzle definitions.
//!
//! A depth-first backtracking walk from the first waypoint: blank cells may
//! be crossed freely, the next expected waypoint advances the order, and any
//! other waypoint prunes the branch. The walk keeps its own stack of frames,
//! so its depth is bounded by the number of cells rather than by the thread's
//! call stack.

use crate::grid::{Position, PuzzleDefinition, DIRECTIONS};

/// One level of the search: the cell we stand on, how much of the order is
/// already satisfied there, and which neighbour to try next
#[derive(Debug, Clone, Copy)]
struct Frame {
    pos: Position,
    order_index: usize,
    next_dir: usize,
}

/// Backtracking solver over a borrowed definition
pub struct LayoutSolver<'a> {
    def: &'a PuzzleDefinition,
}

impl<'a> LayoutSolver<'a> {
    pub fn new(def: &'a PuzzleDefinition) -> Self {
        Self { def }
    }

    /// Find one legal path visiting every waypoint in order, if any exists
    pub fn solve(&self) -> Option<Vec<Position>> {
        let def = self.def;
        let order = def.order();
        let start = def.waypoint_position(0)?;
        let last = order.len() - 1;

        let mut visited = vec![false; def.cell_count()];
        visited[def.index(start)?] = true;
        let mut stack = vec![Frame {
            pos: start,
            order_index: 0,
            next_dir: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.order_index == last {
                return Some(stack.iter().map(|f| f.pos).collect());
            }

            if frame.next_dir == DIRECTIONS.len() {
                let pos = frame.pos;
                stack.pop();
                if let Some(idx) = def.index(pos) {
                    visited[idx] = false;
                }
                continue;
            }

            let dir = DIRECTIONS[frame.next_dir];
            frame.next_dir += 1;
            let (pos, order_index) = (frame.pos, frame.order_index);

            let Some(next) = def.step(pos, dir) else {
                continue;
            };
            let Some(idx) = def.index(next) else {
                continue;
            };
            if visited[idx] {
                continue;
            }

            let value = def.value(next);
            let next_index = if value == order[order_index + 1] {
                order_index + 1
            } else if value == 0 {
                order_index
            } else {
                continue;
            };

            visited[idx] = true;
            stack.push(Frame {
                pos: next,
                order_index: next_index,
                next_dir: 0,
            });
        }

        None
    }

    pub fn is_solvable(&self) -> bool {
        self.solve().is_some()
    }
}

/// Whether the definition admits at least one legal solution path
pub fn validate_layout(def: &PuzzleDefinition) -> bool {
    LayoutSolver::new(def).is_solvable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_legal_solution(def: &PuzzleDefinition, path: &[Position]) {
        let unique: HashSet<_> = path.iter().collect();
        assert_eq!(unique.len(), path.len(), "path revisits a cell");
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]), "{} -> {}", pair[0], pair[1]);
        }

        let waypoints: Vec<u8> = path
            .iter()
            .map(|&p| def.value(p))
            .filter(|&v| v > 0)
            .collect();
        assert_eq!(waypoints, def.order());
    }

    #[test]
    fn test_daily_is_solvable() {
        let def = PuzzleDefinition::daily();
        assert!(validate_layout(&def));

        let path = LayoutSolver::new(&def).solve().unwrap();
        assert_legal_solution(&def, &path);
    }

    #[test]
    fn test_out_of_order_waypoint_blocks() {
        // 2 can only be reached through 3
        let def = PuzzleDefinition::new(vec![vec![1, 3, 2]], vec![1, 2, 3]).unwrap();
        assert!(!validate_layout(&def));
    }

    #[test]
    fn test_start_boxed_in_by_later_waypoints() {
        let def = PuzzleDefinition::from_string(
            "2 3\n\
             4 1",
        )
        .unwrap();
        // both neighbours of 1 are waypoints other than 2
        assert!(!validate_layout(&def));
    }

    #[test]
    fn test_single_waypoint_is_trivially_solvable() {
        let def = PuzzleDefinition::new(vec![vec![0, 1, 0]], vec![1]).unwrap();
        assert_eq!(LayoutSolver::new(&def).solve(), Some(vec![Position::new(0, 1)]));
    }

    #[test]
    fn test_detour_around_waypoint() {
        let def = PuzzleDefinition::from_string(
            "1 3 2\n\
             . . .",
        )
        .unwrap();
        let path = LayoutSolver::new(&def).solve().unwrap();
        assert_legal_solution(&def, &path);
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(0, 1)));
    }

    #[test]
    fn test_custom_order() {
        let def = PuzzleDefinition::from_string("1 . 2\norder: 2 1").unwrap();
        let path = LayoutSolver::new(&def).solve().unwrap();
        assert_eq!(path.first(), Some(&Position::new(0, 2)));
        assert_eq!(path.last(), Some(&Position::new(0, 0)));
    }

    #[test]
    fn test_large_open_grid_does_not_overflow() {
        let mut grid = vec![vec![0u8; 40]; 40];
        grid[0][0] = 1;
        grid[39][39] = 2;
        let def = PuzzleDefinition::new(grid, vec![1, 2]).unwrap();
        assert!(validate_layout(&def));
    }
}
