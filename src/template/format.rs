//! Reading and writing template files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{ObjectTemplate, TemplateError, TilesetRef};
use crate::map::MapObject;

/// Reads and writes template files.
pub trait TemplateFormat {
    fn read(&self, path: &Path) -> Result<ObjectTemplate, TemplateError>;

    fn write(&self, template: &ObjectTemplate, path: &Path) -> Result<(), TemplateError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplateFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tileset: Option<TilesetFile>,
    object: MapObject,
}

#[derive(Debug, Serialize, Deserialize)]
struct TilesetFile {
    firstgid: u32,
    source: String,
}

/// Template files in the JSON template format (`.tj`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTemplateFormat;

impl JsonTemplateFormat {
    /// Parse template JSON; the tileset source resolves against `base_dir`.
    pub fn parse(
        contents: &str,
        file_name: &Path,
        base_dir: &Path,
    ) -> Result<ObjectTemplate, TemplateError> {
        let file: TemplateFile = serde_json::from_str(contents)?;
        if file.kind != "template" {
            return Err(TemplateError::NotATemplate(file.kind));
        }

        let tileset = file
            .tileset
            .map(|t| TilesetRef { first_gid: t.firstgid, source: base_dir.join(t.source) });

        Ok(ObjectTemplate::new(file_name).with_object(file.object, tileset))
    }

    /// Serialize a template; the tileset source is stored relative to
    /// `base_dir` when it lies below it.
    pub fn to_json(template: &ObjectTemplate, base_dir: &Path) -> Result<String, TemplateError> {
        let object = template.object().cloned().ok_or(TemplateError::NoObject)?;
        let tileset = template.tileset().map(|t| TilesetFile {
            firstgid: t.first_gid,
            source: relative_to(&t.source, base_dir).display().to_string(),
        });

        let file = TemplateFile { kind: "template".to_string(), tileset, object };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

fn relative_to(path: &Path, base_dir: &Path) -> PathBuf {
    path.strip_prefix(base_dir).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

impl TemplateFormat for JsonTemplateFormat {
    fn read(&self, path: &Path) -> Result<ObjectTemplate, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, path, parent_dir(path))
    }

    fn write(&self, template: &ObjectTemplate, path: &Path) -> Result<(), TemplateError> {
        let json = Self::to_json(template, parent_dir(path))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
