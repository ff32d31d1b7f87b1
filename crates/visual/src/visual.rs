//! Visual regression testing with grid-based screenshot comparison
//!
//! Both screenshots are divided into the same grid. For every sampled cell
//! the channel values are summed and the production sum is divided by the
//! staging sum; a ratio further than `accuracy` from 1.0 marks the cell as
//! a mistaken block. Mistaken blocks are outlined in red on a copy of the
//! staging screenshot.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::VisualResult;
use crate::grid::{Cell, Grid, GridGeometry};

const MISTAKE_OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GRID_OUTLINE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// A decoded screenshot
#[derive(Debug, Clone)]
pub struct Screenshot {
    pixels: RgbaImage,
    /// Whether the source image carried an alpha channel. Alpha only
    /// contributes to region sums when it was actually captured.
    has_alpha: bool,
    sha256: String,
}

impl Screenshot {
    /// Decode a PNG screenshot
    pub fn from_png(bytes: &[u8]) -> VisualResult<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        Ok(Self::from_image(image.to_rgba8(), image.color().has_alpha()))
    }

    /// Wrap an already decoded image
    pub fn from_image(pixels: RgbaImage, has_alpha: bool) -> Self {
        let sha256 = hash_bytes(pixels.as_raw());
        Self { pixels, has_alpha, sha256 }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Hex SHA-256 of the decoded RGBA pixels
    ///
    /// Independent of how the image was encoded, so the same picture hashes
    /// the same whether it came from a PNG or from memory.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

/// Result of comparing a staging screenshot against production
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Grid laid over the staging screenshot
    pub geometry: GridGeometry,

    /// Cells whose intensity ratio was out of tolerance
    pub mistakes: Vec<Cell>,

    /// Cells the grid produced
    pub cells_visited: usize,

    /// Cells left out because they reach past an image edge
    pub cells_skipped: usize,

    /// Staging screenshot with every mistaken block outlined in red
    pub result_image: RgbaImage,
}

impl Comparison {
    /// Number of mistaken blocks
    pub fn mistake_count(&self) -> usize {
        self.mistakes.len()
    }

    pub fn is_match(&self) -> bool {
        self.mistakes.is_empty()
    }
}

/// Configuration for screenshot comparison
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Grid used to sample both screenshots
    pub grid: Grid,

    /// Grid drawn by `divide_to_cells`
    pub debug_grid: Grid,

    /// Largest tolerated `|1 - production / staging|` per cell
    pub accuracy: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            grid: Grid::COMPARISON,
            debug_grid: Grid::DEBUG,
            accuracy: 0.0001,
        }
    }
}

/// Grid-based screenshot comparer
///
/// Holds configuration only; every comparison takes its screenshots as
/// arguments, so one value can be shared freely between tests.
#[derive(Debug, Clone, Default)]
pub struct ImageComparer {
    config: CompareConfig,
}

impl ImageComparer {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Decode two PNG screenshots and compare them
    pub fn compare_png(&self, staging: &[u8], production: &[u8]) -> VisualResult<Comparison> {
        let staging = Screenshot::from_png(staging)?;
        let production = Screenshot::from_png(production)?;
        Ok(self.compare_pictures(&staging, &production))
    }

    /// Compare two screenshots cell by cell
    pub fn compare_pictures(&self, staging: &Screenshot, production: &Screenshot) -> Comparison {
        if staging.dimensions() != production.dimensions() {
            warn!(
                "Screenshot dimensions differ: staging {:?} vs production {:?}",
                staging.dimensions(),
                production.dimensions()
            );
        } else if staging.sha256() == production.sha256() {
            debug!("Screenshots are pixel-identical (same hash)");
        }

        let (width, height) = staging.dimensions();
        let geometry = self.config.grid.geometry(width, height);
        let mut result_image = staging.pixels().clone();
        let mut mistakes = Vec::new();
        let mut cells_visited = 0;
        let mut cells_skipped = 0;

        for cell in geometry.cells() {
            cells_visited += 1;

            let regions = (
                process_region(staging, &cell),
                process_region(production, &cell),
            );
            let (Some(staging_total), Some(production_total)) = regions else {
                cells_skipped += 1;
                continue;
            };

            if self.region_differs(production_total, staging_total) {
                draw_outline(&mut result_image, &cell, MISTAKE_OUTLINE);
                mistakes.push(cell);
            }
        }

        if !mistakes.is_empty() {
            info!(
                "{} of {} cells differ ({} skipped at the edges)",
                mistakes.len(),
                cells_visited,
                cells_skipped
            );
        }

        Comparison {
            geometry,
            mistakes,
            cells_visited,
            cells_skipped,
            result_image,
        }
    }

    /// A fully dark staging cell only matches a fully dark production cell.
    fn region_differs(&self, production: u64, staging: u64) -> bool {
        if staging == 0 {
            return production != 0;
        }
        let ratio = production as f64 / staging as f64;
        (1.0 - ratio).abs() > self.config.accuracy
    }

    /// Draw the debug grid over a screenshot
    pub fn divide_to_cells(&self, screenshot: &Screenshot) -> RgbaImage {
        let (width, height) = screenshot.dimensions();
        let geometry = self.config.debug_grid.geometry(width, height);
        let mut image = screenshot.pixels().clone();

        for cell in geometry.cells() {
            draw_outline(&mut image, &cell, GRID_OUTLINE);
        }

        image
    }

    /// Draw the debug grid over a PNG screenshot and save it to `path`
    pub fn save_cells(&self, png: &[u8], path: &Path) -> VisualResult<()> {
        let screenshot = Screenshot::from_png(png)?;
        self.divide_to_cells(&screenshot).save(path)?;
        info!("Cell grid written to: {}", path.display());
        Ok(())
    }
}

/// Sum of every channel value inside `cell`
///
/// Returns `None` when the cell reaches past the image, so edge cells are
/// never compared on partial data.
pub fn process_region(screenshot: &Screenshot, cell: &Cell) -> Option<u64> {
    let (width, height) = screenshot.dimensions();
    if !cell.fits_within(width, height) {
        return None;
    }

    let channels = if screenshot.has_alpha() { 4 } else { 3 };
    let pixels = screenshot.pixels();
    let mut total = 0u64;

    for y in cell.y..cell.y + cell.height {
        for x in cell.x..cell.x + cell.width {
            let pixel = pixels.get_pixel(x, y);
            total += pixel.0[..channels].iter().map(|&c| c as u64).sum::<u64>();
        }
    }

    Some(total)
}

/// Outline `cell` with a one pixel border from `(x, y)` to
/// `(x + width, y + height)` inclusive, clipped to the image.
fn draw_outline(image: &mut RgbaImage, cell: &Cell, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let left = cell.x;
    let top = cell.y;
    let right = cell.x.saturating_add(cell.width);
    let bottom = cell.y.saturating_add(cell.height);

    let mut put = |x: u32, y: u32| {
        if x < width && y < height {
            image.put_pixel(x, y, color);
        }
    };

    for x in left..=right {
        put(x, top);
        put(x, bottom);
    }
    for y in top..=bottom {
        put(left, y);
        put(right, y);
    }
}

/// Hash bytes using SHA256
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Screenshot {
        Screenshot::from_image(
            RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255])),
            false,
        )
    }

    #[test]
    fn test_compare_config_default() {
        let config = CompareConfig::default();
        assert_eq!(config.grid, Grid::new(60, 80));
        assert_eq!(config.debug_grid, Grid::new(30, 40));
        assert_eq!(config.accuracy, 0.0001);
    }

    #[test]
    fn test_process_region_sums_rgb() {
        let screenshot = solid(4, 4, 10);
        let cell = Cell { x: 0, y: 0, width: 2, height: 2 };
        assert_eq!(process_region(&screenshot, &cell), Some(4 * 30));
    }

    #[test]
    fn test_process_region_counts_alpha_when_present() {
        let screenshot = Screenshot::from_image(
            RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 100])),
            true,
        );
        let cell = Cell { x: 0, y: 0, width: 2, height: 2 };
        assert_eq!(process_region(&screenshot, &cell), Some(4 * 130));
    }

    #[test]
    fn test_process_region_out_of_bounds() {
        let screenshot = solid(4, 4, 10);
        let cell = Cell { x: 3, y: 0, width: 2, height: 2 };
        assert_eq!(process_region(&screenshot, &cell), None);
    }

    #[test]
    fn test_zero_policy() {
        let comparer = ImageComparer::default();
        assert!(!comparer.region_differs(0, 0));
        assert!(comparer.region_differs(1, 0));
        assert!(comparer.region_differs(0, 1));
    }

    #[test]
    fn test_draw_outline_is_inclusive_and_clipped() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let cell = Cell { x: 2, y: 2, width: 2, height: 2 };
        draw_outline(&mut image, &cell, MISTAKE_OUTLINE);

        assert_eq!(*image.get_pixel(2, 2), MISTAKE_OUTLINE);
        assert_eq!(*image.get_pixel(3, 2), MISTAKE_OUTLINE);
        assert_eq!(*image.get_pixel(2, 3), MISTAKE_OUTLINE);
        // Interior of a 2x2 outline at the image corner
        assert_eq!(*image.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
        assert_eq!(*image.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_divide_to_cells_draws_blue_grid() {
        let comparer = ImageComparer::default();
        let image = comparer.divide_to_cells(&solid(120, 160, 255));

        // 30x40 grid over 120x160: 4x4 blocks, stride 5
        assert_eq!(*image.get_pixel(0, 0), GRID_OUTLINE);
        assert_eq!(*image.get_pixel(4, 4), GRID_OUTLINE);
        assert_eq!(*image.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_sha256_ignores_source_encoding() {
        let pixels = RgbaImage::from_fn(9, 4, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let png = crate::encode::image_to_png(&pixels).unwrap();

        let decoded = Screenshot::from_png(&png).unwrap();
        let wrapped = Screenshot::from_image(pixels, true);
        assert_eq!(decoded.sha256(), wrapped.sha256());
        assert_ne!(decoded.sha256(), hash_bytes(&png));
    }

    #[test]
    fn test_hash_bytes() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
