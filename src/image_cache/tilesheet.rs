//! Cutting tile sheets into individual tiles

use image::{imageops, Rgba, RgbaImage};
use std::path::PathBuf;
use std::time::SystemTime;

use super::Pixmap;
use crate::color::same_rgb;

/// Everything that affects how a sheet is cut into tiles.
///
/// Two requests with equal parameters share one cached cut. A missing
/// transparent color is a different key from any present one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TilesheetParameters {
    pub file_name: PathBuf,
    pub tile_width: u32,
    pub tile_height: u32,
    pub margin: u32,
    pub spacing: u32,
    pub transparent_color: Option<Rgba<u8>>,
}

impl TilesheetParameters {
    /// Parameters for a sheet of `tile_width` x `tile_height` tiles with no
    /// margin, spacing or transparent color.
    pub fn new(file_name: impl Into<PathBuf>, tile_width: u32, tile_height: u32) -> Self {
        Self {
            file_name: file_name.into(),
            tile_width,
            tile_height,
            margin: 0,
            spacing: 0,
            transparent_color: None,
        }
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_transparent_color(mut self, color: Rgba<u8>) -> Self {
        self.transparent_color = Some(color);
        self
    }
}

/// The tiles cut from one sheet, with the sheet's modification time.
#[derive(Debug, Clone)]
pub(crate) struct CutTiles {
    pub tiles: Vec<Pixmap>,
    pub last_modified: Option<SystemTime>,
}

/// Cut `sheet` into tiles, row by row from the top-left corner.
///
/// Tiles start at `margin` and advance by tile size plus `spacing`. A tile
/// that would extend past the right or bottom edge is not produced, so a
/// trailing partial column or row is dropped.
pub fn cut_sheet(sheet: &RgbaImage, params: &TilesheetParameters) -> Vec<Pixmap> {
    assert!(
        params.tile_width > 0 && params.tile_height > 0,
        "tile size must be positive, got {}x{}",
        params.tile_width,
        params.tile_height
    );

    let tile_width = i64::from(params.tile_width);
    let tile_height = i64::from(params.tile_height);
    let step_x = tile_width + i64::from(params.spacing);
    let step_y = tile_height + i64::from(params.spacing);
    let stop_width = i64::from(sheet.width()) - tile_width;
    let stop_height = i64::from(sheet.height()) - tile_height;

    let mut tiles = Vec::new();

    let mut y = i64::from(params.margin);
    while y <= stop_height {
        let mut x = i64::from(params.margin);
        while x <= stop_width {
            let mut tile = imageops::crop_imm(
                sheet,
                x as u32,
                y as u32,
                params.tile_width,
                params.tile_height,
            )
            .to_image();

            if let Some(color) = params.transparent_color {
                mask_color(&mut tile, color);
            }

            tiles.push(Pixmap::new(tile));
            x += step_x;
        }
        y += step_y;
    }

    tiles
}

/// Make every pixel whose RGB equals `color` fully transparent.
fn mask_color(tile: &mut RgbaImage, color: Rgba<u8>) {
    for pixel in tile.pixels_mut() {
        if same_rgb(*pixel, color) {
            pixel.0[3] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Sheet where each pixel encodes its own coordinates
    fn coordinate_sheet(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    fn origin(tile: &Pixmap) -> (u8, u8) {
        let p = tile.image().get_pixel(0, 0);
        (p.0[0], p.0[1])
    }

    #[test]
    fn test_exact_grid_row_major() {
        let sheet = coordinate_sheet(64, 32);
        let params = TilesheetParameters::new("sheet.png", 16, 16);

        let tiles = cut_sheet(&sheet, &params);
        let origins: Vec<_> = tiles.iter().map(origin).collect();

        assert_eq!(
            origins,
            vec![(0, 0), (16, 0), (32, 0), (48, 0), (0, 16), (16, 16), (32, 16), (48, 16)]
        );
        assert!(tiles.iter().all(|t| t.width() == 16 && t.height() == 16));
    }

    #[test]
    fn test_margin_and_spacing() {
        // 2 + 3*8 + 2*1 + 2 = 30 wide, one row
        let sheet = coordinate_sheet(30, 12);
        let params = TilesheetParameters::new("sheet.png", 8, 8).with_margin(2).with_spacing(1);

        let tiles = cut_sheet(&sheet, &params);
        let origins: Vec<_> = tiles.iter().map(origin).collect();

        assert_eq!(origins, vec![(2, 2), (11, 2), (20, 2)]);
    }

    #[test]
    fn test_partial_tiles_are_dropped() {
        let sheet = coordinate_sheet(40, 20);
        let params = TilesheetParameters::new("sheet.png", 16, 16);

        let tiles = cut_sheet(&sheet, &params);
        assert_eq!(tiles.len(), 2);
    }

    #[test]
    fn test_sheet_smaller_than_tile() {
        let sheet = coordinate_sheet(8, 8);
        let params = TilesheetParameters::new("sheet.png", 16, 16);
        assert!(cut_sheet(&sheet, &params).is_empty());
    }

    #[test]
    fn test_empty_sheet_yields_no_tiles() {
        let params = TilesheetParameters::new("sheet.png", 16, 16);
        assert!(cut_sheet(&RgbaImage::new(0, 0), &params).is_empty());
    }

    #[test]
    fn test_transparent_color_masks_exact_rgb() {
        let magenta = Rgba([255, 0, 255, 255]);
        let red = Rgba([255, 0, 0, 255]);
        let almost = Rgba([254, 0, 255, 255]);

        let mut sheet = RgbaImage::from_pixel(4, 2, magenta);
        sheet.put_pixel(1, 0, red);
        sheet.put_pixel(3, 1, almost);

        let params =
            TilesheetParameters::new("sheet.png", 2, 2).with_transparent_color(Rgba([255, 0, 255, 0]));
        let tiles = cut_sheet(&sheet, &params);
        assert_eq!(tiles.len(), 2);

        let first = tiles[0].image();
        assert_eq!(first.get_pixel(0, 0).0[3], 0);
        assert_eq!(*first.get_pixel(1, 0), red);

        let second = tiles[1].image();
        assert_eq!(second.get_pixel(0, 0).0[3], 0);
        assert_eq!(*second.get_pixel(1, 1), almost);
    }

    #[test]
    fn test_parameters_hash_structurally() {
        let a = TilesheetParameters::new("a.png", 16, 16);
        let mut set = HashSet::new();
        set.insert(a.clone());

        assert!(set.contains(&TilesheetParameters::new("a.png", 16, 16)));
        assert!(!set.contains(&a.clone().with_spacing(1)));
        assert!(!set.contains(&a.clone().with_transparent_color(Rgba([0, 0, 0, 255]))));
    }

    #[test]
    #[should_panic(expected = "tile size must be positive")]
    fn test_zero_tile_size_panics() {
        let params = TilesheetParameters::new("sheet.png", 0, 16);
        cut_sheet(&coordinate_sheet(4, 4), &params);
    }
}
