use crate::{grid::Grid, palette::Palette};

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use log::info;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use std::{error::Error, fmt, path::Path};

pub const DEFAULT_TITLE: &str = "Universe Simulation (Expansion from Zero-Dimensional Point)";

const BACKGROUND: [u8; 3] = [255, 255, 255];
const FONT: &str = "sans-serif";
const TICK_LENGTH: i32 = 4;

/// Layout of the rendered picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Side length in pixels of one grid cell.
    pub scale: u32,
    pub colorbar_width: u32,
    /// Blank space between the map and the colour bar.
    pub gap: u32,
    /// Band above the map holding the title.
    pub title_height: u32,
    /// Space right of the colour bar for its value labels.
    pub label_width: u32,
    pub margin: u32,
    /// Number of labelled intervals on the colour bar.
    pub ticks: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            scale: 6,
            colorbar_width: 24,
            gap: 12,
            title_height: 40,
            label_width: 56,
            margin: 10,
            ticks: 5,
        }
    }
}

/// Pixel positions of the parts of a rendered heat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the cell map.
    pub map_x: u32,
    pub map_y: u32,
    /// Side length of the (square) cell map.
    pub map_size: u32,
    pub bar_x: u32,
    pub bar_width: u32,
}

impl Layout {
    fn new(grid_size: u32, config: &RenderConfig) -> Self {
        let map_size = grid_size * config.scale;
        let map_x = config.margin;
        let map_y = config.title_height;
        let bar_x = map_x + map_size + config.gap;
        Layout {
            width: bar_x + config.colorbar_width + config.label_width,
            height: map_y + map_size + config.margin,
            map_x,
            map_y,
            map_size,
            bar_x,
            bar_width: config.colorbar_width,
        }
    }

    /// Pixel row on the colour bar for a normalised level, 1.0 at the top.
    fn bar_row(&self, level: f32) -> u32 {
        let span = self.map_size.saturating_sub(1) as f32;
        self.map_y + ((1.0 - level) * span).round() as u32
    }
}

#[derive(Debug)]
pub enum RenderError {
    InvalidScale,
    EmptyGrid,
    BufferSize { expected: usize, actual: usize },
    Draw(String),
    Image(image::ImageError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidScale => write!(f, "render scale must be positive"),
            RenderError::EmptyGrid => write!(f, "cannot render an empty grid"),
            RenderError::BufferSize { expected, actual } => write!(
                f,
                "pixel buffer holds {actual} bytes, image needs {expected}"
            ),
            RenderError::Draw(e) => write!(f, "failed to draw annotations: {}", e),
            RenderError::Image(e) => write!(f, "failed to write image: {}", e),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::Image(err)
    }
}

fn draw_err<E: fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Colour bar label: whole numbers without a fraction, everything else to two places.
fn format_tick(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// A grid rendered as a titled, colour-mapped image with a labelled colour bar on the right.
pub struct HeatMap {
    pub image: RgbImage,
    pub title: String,
    /// Value range the palette was stretched over.
    pub range: (f32, f32),
    pub layout: Layout,
}

impl HeatMap {
    pub fn from_grid(grid: &Grid, config: RenderConfig) -> Result<Self, RenderError> {
        Self::render(grid, config, &Palette::hot(), DEFAULT_TITLE)
    }

    pub fn with_title(grid: &Grid, config: RenderConfig, title: &str) -> Result<Self, RenderError> {
        Self::render(grid, config, &Palette::hot(), title)
    }

    pub fn render(
        grid: &Grid,
        config: RenderConfig,
        palette: &Palette,
        title: &str,
    ) -> Result<Self, RenderError> {
        if config.scale == 0 {
            return Err(RenderError::InvalidScale);
        }
        let n = grid.size();
        if n == 0 {
            return Err(RenderError::EmptyGrid);
        }

        let layout = Layout::new(n as u32, &config);
        let (lo, hi) = grid.value_range();
        let span = hi - lo;
        let scale = config.scale as usize;
        let width = layout.width as usize;
        let map_x = layout.map_x as usize;
        let map_y = layout.map_y as usize;
        let map_size = layout.map_size as usize;
        let bar_x = layout.bar_x as usize;
        let bar_end = bar_x + layout.bar_width as usize;
        let rows: Vec<&[f32]> = grid.rows().collect();

        let mut buf = vec![0u8; width * layout.height as usize * 3];
        buf.par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(y, row)| {
                if y < map_y || y >= map_y + map_size {
                    row.chunks_exact_mut(3)
                        .for_each(|px| px.copy_from_slice(&BACKGROUND));
                    return;
                }
                let cells = rows[(y - map_y) / scale];
                // The bar runs from the maximum at the top to the minimum at the bottom.
                let bar_level = if map_size > 1 {
                    1.0 - (y - map_y) as f32 / (map_size - 1) as f32
                } else {
                    1.0
                };
                let bar_color = palette.color(bar_level);

                for (x, px) in row.chunks_exact_mut(3).enumerate() {
                    let Rgb(rgb) = if x >= map_x && x < map_x + map_size {
                        let v = cells[(x - map_x) / scale];
                        let t = if span > 0.0 { (v - lo) / span } else { 0.0 };
                        palette.color(t)
                    } else if x >= bar_x && x < bar_end {
                        bar_color
                    } else {
                        Rgb(BACKGROUND)
                    };
                    px.copy_from_slice(&rgb);
                }
            });

        Self::annotate(&mut buf, &layout, &config, title, (lo, hi))?;

        let expected = width * layout.height as usize * 3;
        let actual = buf.len();
        let image = ImageBuffer::from_raw(layout.width, layout.height, buf)
            .ok_or(RenderError::BufferSize { expected, actual })?;

        Ok(HeatMap {
            image,
            title: title.to_string(),
            range: (lo, hi),
            layout,
        })
    }

    /// Draw the title and the colour bar ticks over an already rasterised buffer.
    fn annotate(
        buf: &mut [u8],
        layout: &Layout,
        config: &RenderConfig,
        title: &str,
        (lo, hi): (f32, f32),
    ) -> Result<(), RenderError> {
        let root = BitMapBackend::with_buffer(buf, (layout.width, layout.height))
            .into_drawing_area();

        let title_size = (config.title_height as f64 * 0.5).max(8.0);
        let title_style = TextStyle::from((FONT, title_size).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(
            title.to_string(),
            (layout.width as i32 / 2, config.title_height as i32 / 2),
            title_style,
        ))
        .map_err(draw_err)?;

        let label_style =
            TextStyle::from((FONT, 12.0).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
        let bar_end = (layout.bar_x + layout.bar_width) as i32;
        let ticks = config.ticks.max(1);
        for i in 0..=ticks {
            let level = i as f32 / ticks as f32;
            let y = layout.bar_row(level) as i32;
            root.draw(&PathElement::new(
                vec![(bar_end, y), (bar_end + TICK_LENGTH, y)],
                &BLACK,
            ))
            .map_err(draw_err)?;
            root.draw(&Text::new(
                format_tick(lo + (hi - lo) * level),
                (bar_end + TICK_LENGTH + 2, y),
                label_style.clone(),
            ))
            .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Write the image out as a PNG.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.image.save_with_format(path, ImageFormat::Png)?;
        info!(
            "saved \"{}\" ({}x{}, values {}..={}) to {}",
            self.title,
            self.image.width(),
            self.image.height(),
            self.range.0,
            self.range.1,
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    fn small_config() -> RenderConfig {
        RenderConfig {
            scale: 2,
            colorbar_width: 3,
            gap: 1,
            title_height: 24,
            label_width: 40,
            margin: 2,
            ticks: 2,
        }
    }

    fn is_background(map: &HeatMap, x: u32, y: u32) -> bool {
        *map.image.get_pixel(x, y) == Rgb(BACKGROUND)
    }

    #[test]
    fn test_dimensions() {
        let grid = Grid::new(4);
        let map = HeatMap::from_grid(&grid, small_config()).unwrap();
        assert_eq!(map.image.width(), 2 + 4 * 2 + 1 + 3 + 40);
        assert_eq!(map.image.height(), 24 + 4 * 2 + 2);
        assert_eq!(map.layout.map_x, 2);
        assert_eq!(map.layout.map_y, 24);
        assert_eq!(map.layout.bar_x, 2 + 8 + 1);
        assert_eq!(map.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_cells_map_to_palette() {
        let mut grid = Grid::new(3);
        grid.set(Position::new(1, 2), 4.0);
        grid.set(Position::new(0, 0), 2.0);
        let map = HeatMap::from_grid(&grid, small_config()).unwrap();
        let hot = Palette::hot();
        let (x0, y0) = (map.layout.map_x, map.layout.map_y);

        assert_eq!(map.range, (0.0, 4.0));
        // Every pixel of a cell block shares the cell's colour.
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)].iter() {
            assert_eq!(
                *map.image.get_pixel(x0 + 4 + *dx, y0 + 2 + *dy),
                hot.color(1.0)
            );
            assert_eq!(*map.image.get_pixel(x0 + *dx, y0 + *dy), hot.color(0.5));
        }
        assert_eq!(*map.image.get_pixel(x0, y0 + 5), hot.color(0.0));
        // Gap column.
        assert!(is_background(&map, x0 + 6, y0 + 3));
    }

    #[test]
    fn test_colorbar_runs_top_to_bottom() {
        let grid = Grid::new(3);
        let map = HeatMap::from_grid(&grid, small_config()).unwrap();
        let hot = Palette::hot();
        let top = map.layout.map_y;
        let bottom = top + map.layout.map_size - 1;
        for x in map.layout.bar_x..map.layout.bar_x + map.layout.bar_width {
            assert_eq!(*map.image.get_pixel(x, top), hot.color(1.0));
            assert_eq!(*map.image.get_pixel(x, bottom), hot.color(0.0));
        }
    }

    #[test]
    fn test_title_is_drawn() {
        let mut grid = Grid::new(5);
        grid.set(Position::new(2, 2), 1.0);
        let config = RenderConfig::default();
        let default = HeatMap::from_grid(&grid, config).unwrap();
        let other = HeatMap::with_title(&grid, config, "something else entirely").unwrap();
        assert_eq!(other.title, "something else entirely");
        assert_ne!(default.image.as_raw(), other.image.as_raw());

        let title_band_inked = (0..default.layout.width)
            .any(|x| (0..config.title_height).any(|y| !is_background(&default, x, y)));
        assert!(title_band_inked);
    }

    #[test]
    fn test_colorbar_is_labelled() {
        let mut grid = Grid::new(5);
        grid.set(Position::new(2, 2), 9.0);
        let config = RenderConfig::default();
        let map = HeatMap::from_grid(&grid, config).unwrap();
        let label_x = map.layout.bar_x + map.layout.bar_width;
        let inked = (label_x..map.layout.width)
            .filter(|&x| (0..map.layout.height).any(|y| !is_background(&map, x, y)))
            .count();
        assert!(inked > TICK_LENGTH as usize);

        // Different ranges produce different labels.
        let mut brighter = grid.clone();
        brighter.set(Position::new(2, 2), 250.0);
        let relabelled = HeatMap::from_grid(&brighter, config).unwrap();
        let label_columns = |m: &HeatMap| -> Vec<Rgb<u8>> {
            (label_x..m.layout.width)
                .flat_map(|x| (0..m.layout.height).map(move |y| (x, y)))
                .map(|(x, y)| *m.image.get_pixel(x, y))
                .collect()
        };
        assert_ne!(label_columns(&map), label_columns(&relabelled));
    }

    #[test]
    fn test_render_error_messages() {
        let err = RenderError::BufferSize {
            expected: 12,
            actual: 9,
        };
        assert_eq!(err.to_string(), "pixel buffer holds 9 bytes, image needs 12");
        assert!(err.source().is_none());
        assert_eq!(
            RenderError::EmptyGrid.to_string(),
            "cannot render an empty grid"
        );
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(42.0), "42");
        assert_eq!(format_tick(2.5), "2.50");
    }

    #[test]
    fn test_flat_grid_renders_bottom_color() {
        let mut grid = Grid::new(2);
        for row in 0..2 {
            for col in 0..2 {
                grid.set(Position::new(row, col), 3.0);
            }
        }
        let map = HeatMap::from_grid(&grid, small_config()).unwrap();
        assert_eq!(map.range, (3.0, 3.0));
        assert_eq!(
            *map.image.get_pixel(map.layout.map_x + 3, map.layout.map_y + 3),
            Palette::hot().color(0.0)
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let grid = Grid::new(3);
        let config = RenderConfig {
            scale: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(
            HeatMap::from_grid(&grid, config),
            Err(RenderError::InvalidScale)
        ));
        assert!(matches!(
            HeatMap::from_grid(&Grid::new(0), RenderConfig::default()),
            Err(RenderError::EmptyGrid)
        ));
    }

    #[test]
    fn test_save_png() {
        let mut grid = Grid::new(5);
        grid.set(Position::new(2, 2), 1.0);
        let map = HeatMap::with_title(&grid, small_config(), "test").unwrap();
        let path = std::env::temp_dir().join(format!("expansion-test-{}.png", std::process::id()));
        map.save(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
        std::fs::remove_file(&path).unwrap();
    }
}
