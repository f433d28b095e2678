use itertools::{Itertools, MinMaxResult};
use rand::{seq::SliceRandom, Rng};

/// A cell coordinate on the grid. Rows grow downwards, columns grow to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

/// One of the four axis-aligned moves available to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row, col) offset of the move.
    #[inline(always)]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// A fresh uniformly random permutation of all four directions.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> [Direction; 4] {
        let mut order = Self::ALL;
        order.shuffle(rng);
        order
    }
}

/// A square 2D grid with a scalar value per each grid block, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    size: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Create a new `size` x `size` grid filled with zeros.
    pub fn new(size: usize) -> Self {
        Grid {
            size,
            data: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Iterate over the grid one row slice at a time.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.size.max(1))
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    /// Return a corresponding index into the data slice. Panics on out-of-bounds positions, which
    /// would mean the cursor invariant has been broken.
    fn index(&self, pos: Position) -> usize {
        assert!(
            self.contains(pos),
            "position {:?} is outside a {}x{} grid",
            pos,
            self.size,
            self.size
        );
        pos.row * self.size + pos.col
    }

    pub fn get(&self, pos: Position) -> f32 {
        self.data[self.index(pos)]
    }

    pub fn set(&mut self, pos: Position, value: f32) {
        let idx = self.index(pos);
        self.data[idx] = value;
    }

    /// Add one unit to the cell at a given position.
    pub fn increment(&mut self, pos: Position) {
        let idx = self.index(pos);
        self.data[idx] += 1.0;
    }

    /// Zero every cell without changing the dimensions.
    pub fn reset(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    /// The neighbour of `pos` one step in `dir`, or `None` if it falls off the grid.
    pub fn neighbor(&self, pos: Position, dir: Direction) -> Option<Position> {
        let (dr, dc) = dir.offset();
        let row = pos.row.checked_add_signed(dr)?;
        let col = pos.col.checked_add_signed(dc)?;
        let next = Position::new(row, col);
        if self.contains(next) {
            Some(next)
        } else {
            None
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Largest value on the grid and where it sits. The first cell in row-major order wins ties.
    pub fn max(&self) -> Option<(Position, f32)> {
        self.data
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
                Some((_, b)) if v <= b => best,
                _ => Some((i, v)),
            })
            .map(|(i, v)| (Position::new(i / self.size, i % self.size), v))
    }

    /// `(min, max)` over all cells. An empty grid maps to `(0, 0)`.
    pub fn value_range(&self) -> (f32, f32) {
        match self.data.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        }
    }

    /// Positions of all non-zero cells, in row-major order.
    pub fn visited(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size;
        self.data
            .iter()
            .positions(|&v| v > 0.0)
            .map(move |i| Position::new(i / size, i % size))
    }
}
