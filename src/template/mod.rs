//! Object templates: reusable, file-backed prototype objects
//!
//! A template file holds one [`MapObject`] and, for tile objects, a
//! reference to the tileset its `gid` belongs to. Templates are shared
//! between all documents that use them through the [`TemplateManager`].

mod format;
mod manager;

pub use format::{JsonTemplateFormat, TemplateFormat};
pub use manager::{TemplateId, TemplateManager, TilesetStatus};

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::map::MapObject;

/// Error reading or writing a template file
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid template JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("not a template file (type is '{0}')")]
    NotATemplate(String),
    #[error("template has no object to save")]
    NoObject,
    #[error("no template is loaded with this id")]
    UnknownTemplate,
}

/// The external tileset a template's tile object refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetRef {
    pub first_gid: u32,
    /// Tileset file, resolved against the template's directory
    pub source: PathBuf,
}

/// A template loaded from `file_name`.
///
/// A template without an object is a placeholder for a file that could not
/// be read; documents use it to show a broken reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTemplate {
    file_name: PathBuf,
    object: Option<MapObject>,
    tileset: Option<TilesetRef>,
}

impl ObjectTemplate {
    /// A placeholder template with no object.
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self { file_name: file_name.into(), object: None, tileset: None }
    }

    pub fn with_object(mut self, object: MapObject, tileset: Option<TilesetRef>) -> Self {
        self.object = Some(object);
        self.tileset = tileset;
        self
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn object(&self) -> Option<&MapObject> {
        self.object.as_ref()
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn tileset(&self) -> Option<&TilesetRef> {
        self.tileset.as_ref()
    }

    /// Replace the prototype object and the tileset it draws from.
    pub(crate) fn set_object(&mut self, object: Option<MapObject>, tileset: Option<TilesetRef>) {
        self.object = object;
        self.tileset = tileset;
    }
}
