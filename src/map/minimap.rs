//! Thumbnail rendering of whole maps

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::{ImageLayer, Layer, Map, ObjectGroup, TileLayer, MAX_MAP_PIXELS};
use crate::color::parse_color;
use crate::image_cache::{ImageCache, Pixmap, TilesheetParameters};

/// Outline color for objects in groups without a color of their own
const DEFAULT_OBJECT_COLOR: Rgba<u8> = Rgba([160, 160, 164, 255]);

/// What a map thumbnail includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFlags {
    pub draw_tile_layers: bool,
    pub draw_objects: bool,
    pub draw_image_layers: bool,
    pub ignore_invisible_layers: bool,
    pub draw_background: bool,
}

impl RenderFlags {
    /// Everything visible, background included. Used when a map stands in
    /// for an image.
    pub const THUMBNAIL: RenderFlags = RenderFlags {
        draw_tile_layers: true,
        draw_objects: true,
        draw_image_layers: true,
        ignore_invisible_layers: true,
        draw_background: true,
    };
}

/// Renders a map into a single image.
///
/// Rendering goes through the image cache for tile sheets and layer
/// images, which is how a map can end up depending on itself.
pub trait MapRenderer {
    /// Natural size of the rendered map in pixels
    fn map_size(&self, map: &Map) -> (u32, u32);

    fn render(
        &self,
        map: &Map,
        size: (u32, u32),
        flags: RenderFlags,
        images: &mut ImageCache,
    ) -> RgbaImage;
}

/// Renders orthogonal maps at one pixel per map pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniMapRenderer;

impl MapRenderer for MiniMapRenderer {
    fn map_size(&self, map: &Map) -> (u32, u32) {
        (map.width.saturating_mul(map.tile_width), map.height.saturating_mul(map.tile_height))
    }

    fn render(
        &self,
        map: &Map,
        size: (u32, u32),
        flags: RenderFlags,
        images: &mut ImageCache,
    ) -> RgbaImage {
        let (width, height) = self.map_size(map);
        if !within_budget(width, height) || !within_budget(size.0, size.1) {
            return RgbaImage::new(0, 0);
        }

        let mut canvas = RgbaImage::new(width, height);

        if flags.draw_background {
            if let Some(color) = map.background_color.as_deref().and_then(|c| parse_color(c).ok()) {
                for pixel in canvas.pixels_mut() {
                    *pixel = color;
                }
            }
        }

        for layer in &map.layers {
            if flags.ignore_invisible_layers && !layer.is_visible() {
                continue;
            }
            match layer {
                Layer::TileLayer(l) if flags.draw_tile_layers => {
                    draw_tile_layer(&mut canvas, map, l, images)
                }
                Layer::ObjectGroup(l) if flags.draw_objects => {
                    draw_object_group(&mut canvas, map, l, images)
                }
                Layer::ImageLayer(l) if flags.draw_image_layers => {
                    draw_image_layer(&mut canvas, map, l, images)
                }
                _ => {}
            }
        }

        if (width, height) != size {
            return imageops::resize(&canvas, size.0, size.1, FilterType::Nearest);
        }
        canvas
    }
}

/// Whether a canvas of this size is non-empty and small enough to allocate
fn within_budget(width: u32, height: u32) -> bool {
    width > 0 && height > 0 && u64::from(width) * u64::from(height) <= MAX_MAP_PIXELS
}

/// Look up the pixmap for a global tile ID through the cut-tiles cache.
fn tile_pixmap(map: &Map, gid: u32, images: &mut ImageCache) -> Option<Pixmap> {
    let tileset = map.tileset_for_gid(gid)?;
    let params = TilesheetParameters {
        file_name: map.resolve(&tileset.image),
        tile_width: tileset.tile_width,
        tile_height: tileset.tile_height,
        margin: tileset.margin,
        spacing: tileset.spacing,
        transparent_color: tileset.transparent_color.as_deref().and_then(|c| parse_color(c).ok()),
    };
    let tiles = images.cut_tiles(&params);
    tiles.get((gid - tileset.first_gid) as usize).cloned()
}

fn draw_tile_layer(canvas: &mut RgbaImage, map: &Map, layer: &TileLayer, images: &mut ImageCache) {
    if layer.width == 0 {
        return;
    }
    for (index, &raw_gid) in layer.data.iter().enumerate() {
        let gid = raw_gid & !super::FLIP_FLAGS_MASK;
        if gid == 0 {
            continue;
        }
        let Some(tile) = tile_pixmap(map, gid, images) else {
            continue;
        };
        let column = (index as u32 % layer.width) as i64;
        let row = (index as u32 / layer.width) as i64;
        // Tiles taller than the grid extend upwards from the cell's bottom
        let x = layer.offset_x.saturating_add(column * i64::from(map.tile_width));
        let y = layer
            .offset_y
            .saturating_add((row + 1) * i64::from(map.tile_height) - i64::from(tile.height()));
        overlay_clipped(canvas, tile.image(), x, y);
    }
}

fn draw_object_group(
    canvas: &mut RgbaImage,
    map: &Map,
    group: &ObjectGroup,
    images: &mut ImageCache,
) {
    let color = group
        .color
        .as_deref()
        .and_then(|c| parse_color(c).ok())
        .unwrap_or(DEFAULT_OBJECT_COLOR);

    for object in group.objects.iter().filter(|o| o.visible) {
        let x = object.x.round() as i64;
        let y = object.y.round() as i64;

        if let Some(gid) = object.tile_gid() {
            // Tile objects are anchored at their bottom-left corner
            if let Some(tile) = tile_pixmap(map, gid, images) {
                overlay_clipped(canvas, tile.image(), x, y.saturating_sub(i64::from(tile.height())));
            }
            continue;
        }

        let width = object.width.round() as i64;
        let height = object.height.round() as i64;
        draw_rect_outline(canvas, x, y, width.max(1), height.max(1), color);
    }
}

fn draw_image_layer(canvas: &mut RgbaImage, map: &Map, layer: &ImageLayer, images: &mut ImageCache) {
    let loaded = images.load_image(map.resolve(&layer.image));
    if loaded.is_null() {
        return;
    }
    overlay_clipped(canvas, loaded.image(), layer.offset_x, layer.offset_y);
}

/// Draw `top` at (`x`, `y`), skipping it when it lies entirely off the canvas.
fn overlay_clipped(canvas: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64) {
    let off_canvas = x >= i64::from(canvas.width())
        || y >= i64::from(canvas.height())
        || x.saturating_add(i64::from(top.width())) <= 0
        || y.saturating_add(i64::from(top.height())) <= 0;
    if !off_canvas {
        imageops::overlay(canvas, top, x, y);
    }
}

/// Outline a rectangle, visiting only the part of it that is on the canvas.
fn draw_rect_outline(canvas: &mut RgbaImage, x: i64, y: i64, width: i64, height: i64, color: Rgba<u8>) {
    let right = x.saturating_add(width).saturating_sub(1);
    let bottom = y.saturating_add(height).saturating_sub(1);
    let max_x = i64::from(canvas.width()) - 1;
    let max_y = i64::from(canvas.height()) - 1;
    if right < 0 || bottom < 0 || x > max_x || y > max_y {
        return;
    }

    let (x0, x1) = (x.max(0), right.min(max_x));
    let (y0, y1) = (y.max(0), bottom.min(max_y));
    for px in x0..=x1 {
        if y >= 0 {
            canvas.put_pixel(px as u32, y as u32, color);
        }
        if bottom <= max_y {
            canvas.put_pixel(px as u32, bottom as u32, color);
        }
    }
    for py in y0..=y1 {
        if x >= 0 {
            canvas.put_pixel(x as u32, py as u32, color);
        }
        if right <= max_x {
            canvas.put_pixel(right as u32, py as u32, color);
        }
    }
}
