//! N-puzzle environment: board representation, blank moves, and the
//! [`Environment`] trait the training pipeline scrambles and labels through.

mod board;
mod environment;
mod moves;

pub use board::{MoveError, PuzzleBoard, BLANK};
pub use environment::{Environment, SlidingPuzzle};
pub use moves::Move;
