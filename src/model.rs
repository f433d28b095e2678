use crate::grid::{Direction, Grid, Position};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::{error::Error, fmt};

/// Simulation parameters. Everything the binary needs to fix up front lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub grid_size: usize,
    pub iterations: usize,
    /// Seed for the direction shuffles. `None` draws one from the OS.
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl SimConfig {
    pub const DEFAULT_GRID_SIZE: usize = 100;
    pub const DEFAULT_ITERATIONS: usize = 5000;

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_grid_size(self.grid_size)?;
        if self.iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            grid_size: Self::DEFAULT_GRID_SIZE,
            iterations: Self::DEFAULT_ITERATIONS,
            seed: None,
            show_progress: false,
        }
    }
}

fn validate_grid_size(size: usize) -> Result<(), ConfigError> {
    // Anything smaller leaves the seed cell without an in-bounds neighbour.
    if size < 2 {
        return Err(ConfigError::InvalidGridSize { size });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidGridSize { size: usize },
    InvalidIterations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidGridSize { size } => {
                write!(f, "grid size must be at least 2 (got {size})")
            }
            ConfigError::InvalidIterations => write!(f, "iteration count must be positive"),
        }
    }
}

impl Error for ConfigError {}

/// Pick the next cell for the cursor: among the in-bounds neighbours visited in `order`, the one
/// with the strictly smallest value. The first neighbour to reach a new minimum is kept, so with
/// a shuffled `order` ties are broken at random. Returns `None` only when no neighbour exists.
pub fn select_next_position(
    grid: &Grid,
    cursor: Position,
    order: &[Direction; 4],
) -> Option<Position> {
    let mut min_resistance = f32::INFINITY;
    let mut best = None;

    for &dir in order.iter() {
        if let Some(next) = grid.neighbor(cursor, dir) {
            let resistance = grid.get(next);
            if resistance < min_resistance {
                min_resistance = resistance;
                best = Some(next);
            }
        }
    }
    best
}

/// Bounding box of the visited cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub min: Position,
    pub max: Position,
}

/// Statistics over a finished (or partial) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    pub total_mass: f64,
    pub peak: Option<(Position, f32)>,
    pub visited_cells: usize,
    pub extent: Option<Extent>,
    pub cursor: Position,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "iterations: {}", self.iterations)?;
        writeln!(f, "total mass: {}", self.total_mass)?;
        if let Some((pos, value)) = self.peak {
            writeln!(f, "peak: {} at ({}, {})", value, pos.row, pos.col)?;
        }
        writeln!(f, "visited cells: {}", self.visited_cells)?;
        if let Some(extent) = self.extent {
            writeln!(
                f,
                "extent: rows {}..={}, cols {}..={}",
                extent.min.row, extent.max.row, extent.min.col, extent.max.col
            )?;
        }
        write!(f, "cursor: ({}, {})", self.cursor.row, self.cursor.col)
    }
}

/// Top-level simulation class. Owns the grid, the cursor and the random source driving the
/// direction shuffles.
#[derive(Debug)]
pub struct Model {
    grid: Grid,
    cursor: Position,
    rng: ChaCha8Rng,
    config: SimConfig,
    iteration: usize,
}

impl Model {
    /// Construct a new model with a single seed cell at the centre of the grid.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let size = config.grid_size;
        let mut model = Model {
            grid: Grid::new(size),
            cursor: Position::new(0, 0),
            rng,
            config,
            iteration: 0,
        };
        model.initialize(size)?;
        Ok(model)
    }

    /// Reset to a zero `size` x `size` grid with the seed cell (value 1) and the cursor at the
    /// centre. The random source is left where it is.
    pub fn initialize(&mut self, size: usize) -> Result<(), ConfigError> {
        validate_grid_size(size)?;
        if self.grid.size() == size {
            self.grid.reset();
        } else {
            self.grid = Grid::new(size);
        }
        self.config.grid_size = size;
        self.cursor = Position::new(size / 2, size / 2);
        self.grid.set(self.cursor, 1.0);
        self.iteration = 0;
        debug!("initialized {size}x{size} grid, seed cell at {:?}", self.cursor);
        Ok(())
    }

    pub fn print_configurations(&self) {
        println!("grid size: {0}x{0}", self.config.grid_size);
        println!("iterations: {}", self.config.iterations);
        match self.config.seed {
            Some(seed) => println!("seed: {}", seed),
            None => println!("seed: random"),
        }
    }

    /// Perform a single simulation step: move to the least resistant neighbour and increment it.
    pub fn step(&mut self) {
        let order = Direction::shuffled(&mut self.rng);
        match select_next_position(&self.grid, self.cursor, &order) {
            Some(next) => {
                self.grid.increment(next);
                self.cursor = next;
            }
            None => warn!("cursor at {:?} has no in-bounds neighbour", self.cursor),
        }
        self.iteration += 1;
    }

    /// Run `iterations` steps in sequence and return the resulting grid.
    pub fn run(&mut self, iterations: usize) -> &Grid {
        info!("running {} iterations", iterations);
        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(iterations as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for _ in 0..iterations {
            self.step();
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish();
        }
        info!("finished at iteration {}", self.iteration);
        &self.grid
    }

    /// Run the number of iterations given in the configuration.
    pub fn run_configured(&mut self) -> &Grid {
        let iterations = self.config.iterations;
        self.run(iterations)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn summary(&self) -> RunSummary {
        let extent = self.grid.visited().fold(None, |acc: Option<Extent>, p| {
            Some(match acc {
                None => Extent { min: p, max: p },
                Some(e) => Extent {
                    min: Position::new(e.min.row.min(p.row), e.min.col.min(p.col)),
                    max: Position::new(e.max.row.max(p.row), e.max.col.max(p.col)),
                },
            })
        });
        RunSummary {
            iterations: self.iteration,
            total_mass: self.grid.sum(),
            peak: self.grid.max(),
            visited_cells: self.grid.visited().count(),
            extent,
            cursor: self.cursor,
        }
    }
}
