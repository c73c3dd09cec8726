//! Registry of loaded object templates
//!
//! Each template file is loaded at most once. Documents hold a
//! [`TemplateId`] rather than the template itself, so reloading a changed
//! file updates what every holder sees without anyone re-fetching.
//!
//! Unlike the image cache, templates are never checked for staleness when
//! looked up. They are refreshed only when the file watcher reports a
//! change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ObjectTemplate, TemplateError, TemplateFormat, TilesetRef};
use crate::logging::{Level, LogSink};
use crate::map::MapObject;
use crate::watch::FileWatcher;

/// Handle to a template owned by a [`TemplateManager`].
///
/// Valid for as long as the manager that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(usize);

/// Whether the tileset a template draws from can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilesetStatus {
    /// Not a tile object, or no such template
    NoTileset,
    Ok,
    /// The tileset file does not exist
    Missing(PathBuf),
}

type Listener = Box<dyn FnMut(TemplateId, &ObjectTemplate)>;

pub struct TemplateManager {
    templates: Vec<ObjectTemplate>,
    by_path: HashMap<PathBuf, TemplateId>,
    format: Rc<dyn TemplateFormat>,
    watcher: Box<dyn FileWatcher>,
    log: Rc<dyn LogSink>,
    listeners: Vec<Listener>,
}

impl TemplateManager {
    pub fn new(
        format: Rc<dyn TemplateFormat>,
        watcher: Box<dyn FileWatcher>,
        log: Rc<dyn LogSink>,
    ) -> Self {
        Self {
            templates: Vec::new(),
            by_path: HashMap::new(),
            format,
            watcher,
            log,
            listeners: Vec::new(),
        }
    }

    /// Load the template at `path`, or return the one already loaded.
    ///
    /// A file that cannot be read still gets a template, without an object,
    /// so the failure is remembered and reported the same way every time.
    pub fn load_object_template(&mut self, path: impl AsRef<Path>) -> TemplateId {
        let path = path.as_ref();
        if let Some(id) = self.find_object_template(path) {
            return id;
        }

        let template = match self.format.read(path) {
            Ok(template) => template,
            Err(e) => {
                tracing::debug!(path = %path.display(), "template failed to load: {}", e);
                ObjectTemplate::new(path)
            }
        };

        // Watch even unparsable files, so fixing them triggers a reload
        if path.exists() {
            if let Err(e) = self.watcher.add_path(path) {
                self.log.report(Level::Warning, &e.to_string(), Some(path));
            }
        }

        let id = TemplateId(self.templates.len());
        self.templates.push(template);
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    pub fn find_object_template(&self, path: impl AsRef<Path>) -> Option<TemplateId> {
        self.by_path.get(path.as_ref()).copied()
    }

    pub fn get(&self, id: TemplateId) -> Option<&ObjectTemplate> {
        self.templates.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &ObjectTemplate)> {
        self.templates.iter().enumerate().map(|(i, t)| (TemplateId(i), t))
    }

    /// Call `listener` after a template's content changed.
    ///
    /// Listeners cannot call back into the manager; they should note the
    /// id and re-read the template afterwards.
    pub fn subscribe(&mut self, listener: impl FnMut(TemplateId, &ObjectTemplate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Reload a template whose file changed on disk.
    ///
    /// On failure the last successfully loaded content is kept.
    pub fn file_changed(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        // Most likely a file that was removed and never loaded
        let Some(id) = self.find_object_template(path) else {
            return;
        };

        match self.format.read(path) {
            Ok(new_template) => {
                let template = &mut self.templates[id.0];
                template.set_object(new_template.object, new_template.tileset);
                tracing::debug!(path = %path.display(), "template reloaded");
                self.emit_changed(id);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), "template reload failed: {}", e);
                self.log
                    .error(&format!("Unable to reload template file: {}", path.display()), Some(path));
            }
        }
    }

    /// Dispatch the changes reported by the file watcher. Returns the
    /// number of changed paths.
    pub fn process_file_events(&mut self) -> usize {
        let changed = self.watcher.take_changes();
        for path in &changed {
            self.file_changed(path);
        }
        changed.len()
    }

    /// Store edits made to a template's object and write them to its file.
    ///
    /// Listeners are notified even when writing fails, since the in-memory
    /// template has changed either way. An id this manager never issued is
    /// rejected with [`TemplateError::UnknownTemplate`].
    pub fn apply_changes(
        &mut self,
        id: TemplateId,
        object: MapObject,
        tileset: Option<TilesetRef>,
    ) -> Result<(), TemplateError> {
        let Some(template) = self.templates.get_mut(id.0) else {
            return Err(TemplateError::UnknownTemplate);
        };
        template.set_object(Some(object), tileset);

        let result = self.format.write(template, template.file_name());
        if let Err(e) = &result {
            let path = template.file_name().to_path_buf();
            self.log.error(
                &format!("Unable to save template file {}: {}", path.display(), e),
                Some(&path),
            );
        }

        self.emit_changed(id);
        result
    }

    /// Save `object` as a new template file at `path` and load it.
    ///
    /// If `path` is already loaded, its template is updated in place and
    /// listeners are notified.
    pub fn save_object_template(
        &mut self,
        object: MapObject,
        tileset: Option<TilesetRef>,
        path: impl AsRef<Path>,
    ) -> Result<TemplateId, TemplateError> {
        let path = path.as_ref();
        let template = ObjectTemplate::new(path).with_object(object, tileset);
        self.format.write(&template, path)?;

        match self.find_object_template(path) {
            Some(id) => {
                self.templates[id.0].set_object(template.object, template.tileset);
                self.emit_changed(id);
                Ok(id)
            }
            None => Ok(self.load_object_template(path)),
        }
    }

    pub fn tileset_status(&self, id: TemplateId) -> TilesetStatus {
        match self.get(id).and_then(ObjectTemplate::tileset) {
            None => TilesetStatus::NoTileset,
            Some(tileset) if tileset.source.exists() => TilesetStatus::Ok,
            Some(tileset) => TilesetStatus::Missing(tileset.source.clone()),
        }
    }

    fn emit_changed(&mut self, id: TemplateId) {
        let template = &self.templates[id.0];
        for listener in &mut self.listeners {
            listener(id, template);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use crate::template::JsonTemplateFormat;
    use crate::watch::NullWatcher;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn manager(log: &Rc<MemoryLog>) -> TemplateManager {
        TemplateManager::new(Rc::new(JsonTemplateFormat), Box::new(NullWatcher), log.clone())
    }

    fn write_template(dir: &TempDir, name: &str, object_name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let json = format!(r#"{{"type": "template", "object": {{"name": "{}"}}}}"#, object_name);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_load_returns_same_id() {
        let temp = TempDir::new().unwrap();
        let path = write_template(&temp, "a.tj", "crate");
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);

        let first = templates.load_object_template(&path);
        let second = templates.load_object_template(&path);

        assert_eq!(first, second);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates.get(first).unwrap().object().unwrap().name, "crate");
    }

    #[test]
    fn test_missing_file_is_placeholder() {
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);

        let id = templates.load_object_template("/nonexistent/gone.tj");
        let template = templates.get(id).unwrap();

        assert!(!template.has_object());
        assert_eq!(template.file_name(), Path::new("/nonexistent/gone.tj"));
    }

    #[test]
    fn test_file_changed_for_unknown_path_is_noop() {
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        let notified = Rc::new(RefCell::new(0));
        let counter = notified.clone();
        templates.subscribe(move |_, _| *counter.borrow_mut() += 1);

        templates.file_changed("/nonexistent/other.tj");

        assert_eq!(*notified.borrow(), 0);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_apply_changes_writes_and_notifies() {
        let temp = TempDir::new().unwrap();
        let path = write_template(&temp, "a.tj", "before");
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        let id = templates.load_object_template(&path);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        templates.subscribe(move |id, t| {
            sink.borrow_mut().push((id, t.object().map(|o| o.name.clone())))
        });

        templates.apply_changes(id, MapObject::new("after"), None).unwrap();

        assert_eq!(*seen.borrow(), vec![(id, Some("after".to_string()))]);
        let on_disk = JsonTemplateFormat.read(&path).unwrap();
        assert_eq!(on_disk.object().unwrap().name, "after");
    }

    #[test]
    fn test_apply_changes_unknown_id() {
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        let notified = Rc::new(RefCell::new(0));
        let counter = notified.clone();
        templates.subscribe(move |_, _| *counter.borrow_mut() += 1);

        let result = templates.apply_changes(TemplateId(7), MapObject::new("x"), None);

        assert!(matches!(result, Err(TemplateError::UnknownTemplate)));
        assert_eq!(*notified.borrow(), 0);
        assert!(templates.is_empty());
    }

    #[test]
    fn test_save_object_template_loads_new_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("new.tj");
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);

        let id = templates.save_object_template(MapObject::new("lamp"), None, &path).unwrap();

        assert!(path.exists());
        assert_eq!(templates.find_object_template(&path), Some(id));
        assert_eq!(templates.get(id).unwrap().object().unwrap().name, "lamp");
    }

    #[test]
    fn test_save_object_template_over_loaded_path_updates_in_place() {
        let temp = TempDir::new().unwrap();
        let path = write_template(&temp, "a.tj", "old");
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        let id = templates.load_object_template(&path);

        let saved = templates.save_object_template(MapObject::new("new"), None, &path).unwrap();

        assert_eq!(saved, id);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates.get(id).unwrap().object().unwrap().name, "new");
    }

    #[test]
    fn test_tileset_status() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tile.tj");
        std::fs::write(
            &path,
            r#"{"type": "template", "tileset": {"firstgid": 1, "source": "props.tsj"},
                "object": {"name": "barrel", "gid": 1}}"#,
        )
        .unwrap();
        let plain = write_template(&temp, "plain.tj", "area");

        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        let tile = templates.load_object_template(&path);
        let plain = templates.load_object_template(&plain);

        assert_eq!(templates.tileset_status(plain), TilesetStatus::NoTileset);
        assert_eq!(
            templates.tileset_status(tile),
            TilesetStatus::Missing(temp.path().join("props.tsj"))
        );

        std::fs::write(temp.path().join("props.tsj"), "{}").unwrap();
        assert_eq!(templates.tileset_status(tile), TilesetStatus::Ok);
    }

    #[test]
    fn test_iter_in_load_order() {
        let temp = TempDir::new().unwrap();
        let a = write_template(&temp, "a.tj", "a");
        let b = write_template(&temp, "b.tj", "b");
        let log = Rc::new(MemoryLog::new());
        let mut templates = manager(&log);
        templates.load_object_template(&a);
        templates.load_object_template(&b);

        let names: Vec<_> =
            templates.iter().map(|(_, t)| t.object().unwrap().name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
