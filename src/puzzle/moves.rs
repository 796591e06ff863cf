/// Direction the blank slides in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// The move that undoes this one
    pub fn opposite(self) -> Move {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
        }
    }

    /// Row/column offset applied to the blank
    pub fn delta(self) -> (isize, isize) {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for mv in Move::ALL {
            assert_eq!(mv.opposite().opposite(), mv);
            assert_ne!(mv.opposite(), mv);
        }
    }

    #[test]
    fn test_opposite_deltas_cancel() {
        for mv in Move::ALL {
            let (dr, dc) = mv.delta();
            let (or, oc) = mv.opposite().delta();
            assert_eq!((dr + or, dc + oc), (0, 0));
        }
    }
}
