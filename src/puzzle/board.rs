use super::Move;

/// Blank tile marker.
pub const BLANK: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PuzzleBoard {
    side: usize,
    tiles: Vec<u8>,
    blank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    OffBoard,
}

impl PuzzleBoard {
    /// Solved board: tiles `1..side*side` in row-major order, blank last
    pub fn goal(side: usize) -> Self {
        let cells = side * side;
        let mut tiles: Vec<u8> = (1..cells).map(|t| t as u8).collect();
        tiles.push(BLANK);
        PuzzleBoard {
            side,
            tiles,
            blank: cells - 1,
        }
    }

    /// Build a board from row-major tiles. Returns None unless the tiles are a
    /// permutation of `0..side*side`.
    pub fn from_tiles(side: usize, tiles: Vec<u8>) -> Option<Self> {
        let cells = side * side;
        if side < 2 || tiles.len() != cells {
            return None;
        }
        let mut seen = vec![false; cells];
        for &t in &tiles {
            let t = t as usize;
            if t >= cells || seen[t] {
                return None;
            }
            seen[t] = true;
        }
        let blank = tiles.iter().position(|&t| t == BLANK)?;
        Some(PuzzleBoard { side, tiles, blank })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    /// Index of the blank in row-major order
    pub fn blank(&self) -> usize {
        self.blank
    }

    pub fn is_goal(&self) -> bool {
        let last = self.tiles.len() - 1;
        self.blank == last
            && self.tiles[..last]
                .iter()
                .enumerate()
                .all(|(i, &t)| t as usize == i + 1)
    }

    /// Target index of the blank after `mv`, if it stays on the board
    fn target(&self, mv: Move) -> Option<usize> {
        let row = (self.blank / self.side) as isize;
        let col = (self.blank % self.side) as isize;
        let (dr, dc) = mv.delta();
        let (r, c) = (row + dr, col + dc);
        let side = self.side as isize;
        if r < 0 || c < 0 || r >= side || c >= side {
            return None;
        }
        Some((r * side + c) as usize)
    }

    /// Moves that keep the blank on the board
    pub fn legal_moves(&self) -> impl Iterator<Item = Move> + '_ {
        Move::ALL
            .into_iter()
            .filter(move |&mv| self.target(mv).is_some())
    }

    /// Apply a move and return the new board (immutable)
    pub fn apply_move(&self, mv: Move) -> Result<PuzzleBoard, MoveError> {
        let mut next = self.clone();
        next.apply_move_mut(mv)?;
        Ok(next)
    }

    /// Apply move in place
    pub fn apply_move_mut(&mut self, mv: Move) -> Result<(), MoveError> {
        let target = self.target(mv).ok_or(MoveError::OffBoard)?;
        self.tiles.swap(self.blank, target);
        self.blank = target;
        Ok(())
    }
}
