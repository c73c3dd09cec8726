//! tilecache - Image and template caching for tile map editors
//!
//! This library provides:
//! - A cache of decoded images and cut tile sheets that reloads files
//!   when they change on disk
//! - Maps used as images ("metatiles"), rendered as thumbnails
//! - A registry of object templates, reloaded when their files change
//!
//! Hosts usually create one [`session::Session`] and keep it for as long as
//! documents are open.

pub mod backend;
pub mod cli;
pub mod color;
pub mod config;
pub mod image_cache;
pub mod logging;
pub mod map;
pub mod session;
pub mod telemetry;
pub mod template;
pub mod watch;

pub use image_cache::{ImageCache, LoadedImage, Pixmap, TilesheetParameters};
pub use session::Session;
pub use template::{ObjectTemplate, TemplateId, TemplateManager};
