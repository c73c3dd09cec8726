//! Integration tests for the template manager and session lifecycle

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use tilecache::image_cache::ImageCache;
use tilecache::logging::{Level, LogSink, MemoryLog};
use tilecache::map::MapObject;
use tilecache::session::{Session, SessionError};
use tilecache::template::{
    JsonTemplateFormat, ObjectTemplate, TemplateError, TemplateFormat, TemplateId,
    TemplateManager, TilesetRef,
};
use tilecache::watch::{FileWatcher, WatchError};

// ============================================================================
// Fakes
// ============================================================================

/// JSON template format that counts reads.
#[derive(Default)]
struct CountingFormat {
    reads: Cell<usize>,
}

impl TemplateFormat for CountingFormat {
    fn read(&self, path: &Path) -> Result<ObjectTemplate, TemplateError> {
        self.reads.set(self.reads.get() + 1);
        JsonTemplateFormat.read(path)
    }

    fn write(&self, template: &ObjectTemplate, path: &Path) -> Result<(), TemplateError> {
        JsonTemplateFormat.write(template, path)
    }
}

#[derive(Default)]
struct WatchState {
    watched: Vec<PathBuf>,
    pending: Vec<PathBuf>,
}

/// Watcher whose events are injected by the test.
#[derive(Clone, Default)]
struct FakeWatcher(Rc<RefCell<WatchState>>);

impl FakeWatcher {
    fn touch(&self, path: &Path) {
        self.0.borrow_mut().pending.push(path.to_path_buf());
    }

    fn watched(&self) -> Vec<PathBuf> {
        self.0.borrow().watched.clone()
    }
}

impl FileWatcher for FakeWatcher {
    fn add_path(&mut self, path: &Path) -> Result<(), WatchError> {
        self.0.borrow_mut().watched.push(path.to_path_buf());
        Ok(())
    }

    fn remove_path(&mut self, path: &Path) {
        self.0.borrow_mut().watched.retain(|p| p != path);
    }

    fn take_changes(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.0.borrow_mut().pending)
    }
}

struct Fixture {
    dir: TempDir,
    format: Rc<CountingFormat>,
    watcher: FakeWatcher,
    log: Rc<MemoryLog>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("should create temp dir"),
            format: Rc::new(CountingFormat::default()),
            watcher: FakeWatcher::default(),
            log: Rc::new(MemoryLog::new()),
        }
    }

    fn manager(&self) -> TemplateManager {
        TemplateManager::new(self.format.clone(), Box::new(self.watcher.clone()), self.log.clone())
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("should write template");
        path
    }

    fn write_object(&self, name: &str, object_name: &str) -> PathBuf {
        self.write(
            name,
            &format!(r#"{{"type": "template", "object": {{"name": "{}", "width": 16}}}}"#, object_name),
        )
    }
}

fn record_changes(manager: &mut TemplateManager) -> Rc<RefCell<Vec<TemplateId>>> {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    manager.subscribe(move |id, _| sink.borrow_mut().push(id));
    changes
}

fn object_name(manager: &TemplateManager, id: TemplateId) -> Option<String> {
    manager.get(id)?.object().map(|o| o.name.clone())
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_loaded_template_is_watched() {
    let fx = Fixture::new();
    let path = fx.write_object("crate.tj", "crate");
    let mut manager = fx.manager();

    let id = manager.load_object_template(&path);

    assert_eq!(object_name(&manager, id).as_deref(), Some("crate"));
    assert_eq!(fx.watcher.watched(), vec![path]);
}

#[test]
fn test_broken_template_read_once() {
    let fx = Fixture::new();
    let path = fx.write("broken.tj", "{ this is not json");
    let mut manager = fx.manager();

    let first = manager.load_object_template(&path);
    let second = manager.load_object_template(&path);

    assert_eq!(first, second);
    assert_eq!(fx.format.reads.get(), 1);
    assert!(!manager.get(first).unwrap().has_object());
    // Still watched so that fixing the file reloads it
    assert_eq!(fx.watcher.watched(), vec![path]);
}

#[test]
fn test_missing_template_not_watched() {
    let fx = Fixture::new();
    let mut manager = fx.manager();

    let id = manager.load_object_template(fx.dir.path().join("missing.tj"));

    assert!(!manager.get(id).unwrap().has_object());
    assert!(fx.watcher.watched().is_empty());
}

#[test]
fn test_find_does_not_load() {
    let fx = Fixture::new();
    let path = fx.write_object("a.tj", "a");
    let mut manager = fx.manager();

    assert_eq!(manager.find_object_template(&path), None);
    let id = manager.load_object_template(&path);
    assert_eq!(manager.find_object_template(&path), Some(id));
    assert_eq!(fx.format.reads.get(), 1);
}

// ============================================================================
// Reloading
// ============================================================================

#[test]
fn test_reload_keeps_identity_and_notifies_once() {
    let fx = Fixture::new();
    let path = fx.write_object("door.tj", "door");
    let mut manager = fx.manager();
    let id = manager.load_object_template(&path);
    let changes = record_changes(&mut manager);

    fx.write_object("door.tj", "gate");
    fx.watcher.touch(&path);
    let processed = manager.process_file_events();

    assert_eq!(processed, 1);
    assert_eq!(manager.load_object_template(&path), id);
    assert_eq!(object_name(&manager, id).as_deref(), Some("gate"));
    assert_eq!(*changes.borrow(), vec![id]);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_fixed_broken_template_reloads() {
    let fx = Fixture::new();
    let path = fx.write("later.tj", "oops");
    let mut manager = fx.manager();
    let id = manager.load_object_template(&path);

    fx.write_object("later.tj", "fixed");
    manager.file_changed(&path);

    assert_eq!(object_name(&manager, id).as_deref(), Some("fixed"));
}

#[test]
fn test_failed_reload_keeps_last_good_object() {
    let fx = Fixture::new();
    let path = fx.write_object("sign.tj", "sign");
    let mut manager = fx.manager();
    let id = manager.load_object_template(&path);
    let changes = record_changes(&mut manager);

    fx.write("sign.tj", "{ truncated");
    manager.file_changed(&path);

    assert_eq!(object_name(&manager, id).as_deref(), Some("sign"));
    assert!(changes.borrow().is_empty());
    let errors = fx.log.at_level(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Unable to reload template file"));
    assert_eq!(errors[0].file.as_deref(), Some(path.as_path()));
}

#[test]
fn test_change_to_unknown_file_ignored() {
    let fx = Fixture::new();
    let mut manager = fx.manager();
    let changes = record_changes(&mut manager);

    fx.watcher.touch(&fx.dir.path().join("deleted.tj"));
    manager.process_file_events();

    assert!(changes.borrow().is_empty());
    assert_eq!(fx.format.reads.get(), 0);
    assert!(fx.log.entries().is_empty());
}

// ============================================================================
// Editing
// ============================================================================

#[test]
fn test_apply_changes_writes_file_and_notifies() {
    let fx = Fixture::new();
    let path = fx.write_object("chest.tj", "chest");
    let mut manager = fx.manager();
    let id = manager.load_object_template(&path);
    let changes = record_changes(&mut manager);

    let tileset = TilesetRef { first_gid: 1, source: fx.dir.path().join("props.tsj") };
    let edited = MapObject::new("big chest").with_size(32.0, 32.0).with_gid(4);
    manager.apply_changes(id, edited, Some(tileset.clone())).unwrap();

    assert_eq!(*changes.borrow(), vec![id]);
    let on_disk = JsonTemplateFormat.read(&path).unwrap();
    assert_eq!(on_disk.object().unwrap().name, "big chest");
    assert_eq!(on_disk.tileset(), Some(&tileset));
}

#[test]
fn test_apply_changes_write_failure_is_logged() {
    let fx = Fixture::new();
    let mut manager = fx.manager();
    let path = fx.dir.path().join("no_such_dir").join("t.tj");
    let id = manager.load_object_template(&path);
    let changes = record_changes(&mut manager);

    let result = manager.apply_changes(id, MapObject::new("x"), None);

    assert!(result.is_err());
    assert_eq!(fx.log.error_count(), 1);
    assert_eq!(*changes.borrow(), vec![id]);
    assert_eq!(object_name(&manager, id).as_deref(), Some("x"));
}

#[test]
fn test_save_then_edit_externally() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("saved.tj");
    let mut manager = fx.manager();

    let id = manager.save_object_template(MapObject::new("tree"), None, &path).unwrap();
    assert_eq!(fx.watcher.watched(), vec![path.clone()]);

    fx.write_object("saved.tj", "bush");
    fx.watcher.touch(&path);
    manager.process_file_events();

    assert_eq!(object_name(&manager, id).as_deref(), Some("bush"));
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_session_teardown_is_final() {
    let fx = Fixture::new();
    let path = fx.write_object("a.tj", "a");
    let log: Rc<dyn LogSink> = fx.log.clone();
    let format = fx.format.clone();
    let watcher = fx.watcher.clone();
    let manager_log = log.clone();
    let mut session = Session::with_parts(ImageCache::new(), log, move || {
        TemplateManager::new(format, Box::new(watcher), manager_log)
    });

    let id = session.template_manager().unwrap().load_object_template(&path);
    assert_eq!(object_name(session.template_manager().unwrap(), id).as_deref(), Some("a"));

    session.teardown_templates();
    fx.watcher.touch(&path);

    assert_eq!(session.process_file_events(), 0);
    assert!(matches!(session.template_manager(), Err(SessionError::TornDown)));
    assert_eq!(fx.format.reads.get(), 1);
}
