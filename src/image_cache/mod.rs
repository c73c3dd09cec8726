//! Cache of decoded images, display pixmaps and cut tile sheets
//!
//! Entries are keyed by file path (or by [`TilesheetParameters`] for cut
//! tiles) and remember the file's modification time at the moment they were
//! built. An entry is only checked for staleness when it is requested again;
//! a stale entry invalidates every table derived from the same file before
//! being rebuilt.
//!
//! When a path cannot be decoded as an image, it is read as a map and the
//! rendered map is used instead. This is how maps serve as metatiles.

mod tilesheet;

pub use tilesheet::{cut_sheet, TilesheetParameters};

use image::RgbaImage;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use crate::backend::{FileClock, ImageCrateDecoder, ImageDecoder, SystemClock};
use crate::logging::{LogSink, TracingLog};
use crate::map::{JsonMapFormat, MapReader, MapRenderer, MiniMapRenderer, RenderFlags};
use tilesheet::CutTiles;

/// Display-ready pixels shared between all holders.
///
/// Cloning is cheap; the pixels are never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap(Arc<RgbaImage>);

impl Pixmap {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// True for the empty pixmap returned when loading failed
    pub fn is_null(&self) -> bool {
        self.0.width() == 0 || self.0.height() == 0
    }

    /// Whether both pixmaps share the same pixel storage
    pub fn ptr_eq(&self, other: &Pixmap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A decoded image together with the modification time of its source file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    image: Arc<RgbaImage>,
    pub last_modified: Option<SystemTime>,
}

impl LoadedImage {
    pub fn new(image: RgbaImage, last_modified: Option<SystemTime>) -> Self {
        Self { image: Arc::new(image), last_modified }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the file could be neither decoded nor rendered as a map
    pub fn is_null(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Whether both values share the same decoded pixels
    pub fn ptr_eq(&self, other: &LoadedImage) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

#[derive(Debug, Clone)]
struct LoadedPixmap {
    pixmap: Pixmap,
    last_modified: Option<SystemTime>,
}

impl From<&LoadedImage> for LoadedPixmap {
    fn from(loaded: &LoadedImage) -> Self {
        Self { pixmap: Pixmap(Arc::clone(&loaded.image)), last_modified: loaded.last_modified }
    }
}

/// Number of entries in each table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub images: usize,
    pub pixmaps: usize,
    pub cut_tile_sets: usize,
}

/// The image, pixmap and cut-tiles tables of one editing session.
pub struct ImageCache {
    images: HashMap<PathBuf, LoadedImage>,
    pixmaps: HashMap<PathBuf, LoadedPixmap>,
    cut_tiles: HashMap<TilesheetParameters, CutTiles>,
    /// Maps currently being rendered as images
    loading_maps: HashSet<PathBuf>,
    clock: Rc<dyn FileClock>,
    decoder: Rc<dyn ImageDecoder>,
    map_reader: Rc<dyn MapReader>,
    map_renderer: Rc<dyn MapRenderer>,
    log: Rc<dyn LogSink>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    /// Create an empty cache reading from the file system.
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            pixmaps: HashMap::new(),
            cut_tiles: HashMap::new(),
            loading_maps: HashSet::new(),
            clock: Rc::new(SystemClock),
            decoder: Rc::new(ImageCrateDecoder),
            map_reader: Rc::new(JsonMapFormat),
            map_renderer: Rc::new(MiniMapRenderer),
            log: Rc::new(TracingLog),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn FileClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_decoder(mut self, decoder: Rc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_map_reader(mut self, reader: Rc<dyn MapReader>) -> Self {
        self.map_reader = reader;
        self
    }

    pub fn with_map_renderer(mut self, renderer: Rc<dyn MapRenderer>) -> Self {
        self.map_renderer = renderer;
        self
    }

    pub fn with_log(mut self, log: Rc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Load the image at `path`, decoding it only when it is not cached or
    /// the file changed since it was cached.
    ///
    /// A file that is neither an image nor a readable map yields an empty
    /// image; check [`LoadedImage::is_null`].
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> LoadedImage {
        let path = path.as_ref();
        let modified = self.clock.modified(path);

        if let Some(entry) = self.images.get(path) {
            if entry.last_modified >= modified {
                tracing::trace!(path = %path.display(), "image cache hit");
                return entry.clone();
            }
            tracing::debug!(path = %path.display(), "image changed on disk, reloading");
            self.remove(path);
        }

        tracing::debug!(path = %path.display(), "image cache miss");
        let image = self.read_image(path);
        let loaded = LoadedImage::new(image, modified);
        self.images.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Load the display pixmap for `path`.
    ///
    /// The pixmap records the modification time of the image it was made
    /// from, so it never disagrees with the image table about staleness.
    pub fn load_pixmap(&mut self, path: impl AsRef<Path>) -> Pixmap {
        let path = path.as_ref();

        if let Some(entry) = self.pixmaps.get(path) {
            if entry.last_modified >= self.clock.modified(path) {
                return entry.pixmap.clone();
            }
            tracing::debug!(path = %path.display(), "pixmap changed on disk, reloading");
            self.remove(path);
        }

        let loaded = LoadedPixmap::from(&self.load_image(path));
        let pixmap = loaded.pixmap.clone();
        self.pixmaps.insert(path.to_path_buf(), loaded);
        pixmap
    }

    /// Cut the sheet described by `params` into tiles, in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if the tile width or height is zero.
    pub fn cut_tiles(&mut self, params: &TilesheetParameters) -> Vec<Pixmap> {
        assert!(
            params.tile_width > 0 && params.tile_height > 0,
            "tile size must be positive, got {}x{}",
            params.tile_width,
            params.tile_height
        );

        if let Some(entry) = self.cut_tiles.get(params) {
            if entry.last_modified >= self.clock.modified(&params.file_name) {
                return entry.tiles.clone();
            }
            tracing::debug!(path = %params.file_name.display(), "tile sheet changed on disk, recutting");
            self.remove(&params.file_name);
        }

        let sheet = self.load_image(&params.file_name);
        let tiles = cut_sheet(sheet.image(), params);
        tracing::debug!(
            path = %params.file_name.display(),
            tiles = tiles.len(),
            "cut tile sheet"
        );

        self.cut_tiles.insert(
            params.clone(),
            CutTiles { tiles: tiles.clone(), last_modified: sheet.last_modified },
        );
        tiles
    }

    /// Forget everything cached for `path`, including all tiles cut from it.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        tracing::trace!(path = %path.display(), "removing cached entries");
        self.images.remove(path);
        self.pixmaps.remove(path);
        self.cut_tiles.retain(|params, _| params.file_name != path);
    }

    /// Drop every cached entry.
    pub fn clear(&mut self) {
        self.images.clear();
        self.pixmaps.clear();
        self.cut_tiles.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            images: self.images.len(),
            pixmaps: self.pixmaps.len(),
            cut_tile_sets: self.cut_tiles.len(),
        }
    }

    pub fn contains_image(&self, path: impl AsRef<Path>) -> bool {
        self.images.contains_key(path.as_ref())
    }

    pub fn contains_pixmap(&self, path: impl AsRef<Path>) -> bool {
        self.pixmaps.contains_key(path.as_ref())
    }

    pub fn contains_cut_tiles(&self, params: &TilesheetParameters) -> bool {
        self.cut_tiles.contains_key(params)
    }

    fn read_image(&mut self, path: &Path) -> RgbaImage {
        let decoded = std::fs::read(path).ok().and_then(|bytes| self.decoder.decode(&bytes));
        match decoded {
            Some(image) => image,
            None => self.render_map(path),
        }
    }

    /// Render the map at `path` as an image, refusing to re-enter a map that
    /// is already being rendered.
    fn render_map(&mut self, path: &Path) -> RgbaImage {
        if self.loading_maps.contains(path) {
            self.log.error(&format!("Recursive metatile map detected: {}", path.display()), Some(path));
            return RgbaImage::new(0, 0);
        }

        self.loading_maps.insert(path.to_path_buf());
        let image = self.render_map_unguarded(path);
        self.loading_maps.remove(path);

        image
    }

    fn render_map_unguarded(&mut self, path: &Path) -> RgbaImage {
        let map = match self.map_reader.read_map(path) {
            Ok(map) => map,
            Err(e) => {
                self.log.error(
                    &format!("Failed to read metatile map {}: {}", path.display(), e),
                    Some(path),
                );
                return RgbaImage::new(0, 0);
            }
        };

        let renderer = Rc::clone(&self.map_renderer);
        let size = renderer.map_size(&map);
        renderer.render(&map, size, RenderFlags::THUMBNAIL, self)
    }
}
