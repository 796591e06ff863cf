use rand::rngs::StdRng;
use rand::Rng;

use super::{Move, PuzzleBoard};

/// Puzzle environment consumed by the training pipeline.
///
/// Implementations must be cheap to clone: every generation worker receives
/// its own copy.
pub trait Environment: Clone + Send + Sync + 'static {
    type State: Clone + Send;

    /// Produce `count` states, each reached by `depth` random legal moves from
    /// the goal.
    fn scramble(&self, count: usize, depth: usize, rng: &mut StdRng) -> Vec<Self::State>;

    /// States one legal move away from `state`.
    fn successors(&self, state: &Self::State) -> Vec<Self::State>;

    fn is_goal(&self, state: &Self::State) -> bool;

    /// Length of the flat feature vector produced by [`Environment::encode_into`].
    fn encoded_len(&self) -> usize;

    /// Append the network encoding of `state` to `out`.
    fn encode_into(&self, state: &Self::State, out: &mut Vec<f32>);
}

/// The sliding-tile N-puzzle on a `side x side` board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingPuzzle {
    side: usize,
}

impl SlidingPuzzle {
    /// Puzzle with `num_tiles` numbered tiles (15 for the 4x4 puzzle).
    /// Returns None unless `num_tiles + 1` is a square of side >= 2.
    pub fn new(num_tiles: usize) -> Option<Self> {
        let cells = num_tiles + 1;
        let side = (cells as f64).sqrt().round() as usize;
        if side < 2 || side * side != cells || cells > u8::MAX as usize + 1 {
            return None;
        }
        Some(SlidingPuzzle { side })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn num_cells(&self) -> usize {
        self.side * self.side
    }

    /// One random walk of `depth` moves from the goal. The walk never undoes
    /// the move it just made.
    pub fn random_walk(&self, depth: usize, rng: &mut StdRng) -> PuzzleBoard {
        let mut board = PuzzleBoard::goal(self.side);
        let mut last: Option<Move> = None;
        let mut candidates = Vec::with_capacity(4);
        for _ in 0..depth {
            candidates.clear();
            candidates.extend(
                board
                    .legal_moves()
                    .filter(|&mv| last.map_or(true, |prev| mv != prev.opposite())),
            );
            let mv = candidates[rng.random_range(0..candidates.len())];
            // Always legal: `candidates` only holds on-board moves.
            if board.apply_move_mut(mv).is_ok() {
                last = Some(mv);
            }
        }
        board
    }
}

impl Environment for SlidingPuzzle {
    type State = PuzzleBoard;

    fn scramble(&self, count: usize, depth: usize, rng: &mut StdRng) -> Vec<PuzzleBoard> {
        (0..count).map(|_| self.random_walk(depth, rng)).collect()
    }

    fn successors(&self, state: &PuzzleBoard) -> Vec<PuzzleBoard> {
        state
            .legal_moves()
            .filter_map(|mv| state.apply_move(mv).ok())
            .collect()
    }

    fn is_goal(&self, state: &PuzzleBoard) -> bool {
        state.is_goal()
    }

    fn encoded_len(&self) -> usize {
        self.num_cells() * self.num_cells()
    }

    /// One-hot per position: block `p` of length `cells` has a 1.0 at the
    /// index of the tile sitting at position `p`.
    fn encode_into(&self, state: &PuzzleBoard, out: &mut Vec<f32>) {
        let cells = self.num_cells();
        let start = out.len();
        out.resize(start + cells * cells, 0.0);
        for (pos, &tile) in state.tiles().iter().enumerate() {
            out[start + pos * cells + tile as usize] = 1.0;
        }
    }
}
