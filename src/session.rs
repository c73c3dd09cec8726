//! The context a host keeps for the lifetime of an editing session
//!
//! A session owns the image cache and the template manager. The manager is
//! created the first time it is asked for and can be torn down once, after
//! which it stays gone.

use std::rc::Rc;
use thiserror::Error;

use crate::config::TilecacheConfig;
use crate::image_cache::ImageCache;
use crate::logging::{Level, LogSink, TracingLog};
use crate::telemetry::ErrorCollector;
use crate::template::{JsonTemplateFormat, TemplateManager};
use crate::watch::{FileWatcher, NotifyWatcher, NullWatcher};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("the template manager has been torn down")]
    TornDown,
}

type TemplateFactory = Box<dyn FnOnce() -> TemplateManager>;

enum TemplateSlot {
    Pending(TemplateFactory),
    Live(TemplateManager),
    TornDown,
}

pub struct Session {
    images: ImageCache,
    templates: TemplateSlot,
    log: Rc<dyn LogSink>,
}

impl Session {
    /// Session with the default collaborators, configured by `config`.
    ///
    /// Errors go to `tracing` and, when enabled, to the JSONL errors file.
    pub fn new(config: &TilecacheConfig) -> Self {
        let log: Rc<dyn LogSink> = Rc::new((
            TracingLog,
            ErrorCollector::new(&config.log.errors_file, config.log.collect_errors),
        ));

        let images = ImageCache::new().with_log(log.clone());

        let watch_config = config.watch.clone();
        let manager_log = log.clone();
        let factory = move || {
            let watcher: Box<dyn FileWatcher> = if !watch_config.enabled {
                Box::new(NullWatcher)
            } else {
                match NotifyWatcher::new(&watch_config) {
                    Ok(watcher) => Box::new(watcher),
                    Err(e) => {
                        manager_log.report(Level::Warning, &e.to_string(), None);
                        Box::new(NullWatcher)
                    }
                }
            };
            TemplateManager::new(Rc::new(JsonTemplateFormat), watcher, manager_log)
        };

        Self::with_parts(images, log, factory)
    }

    /// Session built from explicit parts. `templates` runs on first access
    /// to the template manager.
    pub fn with_parts(
        images: ImageCache,
        log: Rc<dyn LogSink>,
        templates: impl FnOnce() -> TemplateManager + 'static,
    ) -> Self {
        Self { images, templates: TemplateSlot::Pending(Box::new(templates)), log }
    }

    pub fn images(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    pub fn log(&self) -> &Rc<dyn LogSink> {
        &self.log
    }

    /// The template manager, created on first use.
    pub fn template_manager(&mut self) -> Result<&mut TemplateManager, SessionError> {
        if let TemplateSlot::Pending(_) = self.templates {
            if let TemplateSlot::Pending(factory) =
                std::mem::replace(&mut self.templates, TemplateSlot::TornDown)
            {
                tracing::debug!("creating template manager");
                self.templates = TemplateSlot::Live(factory());
            }
        }

        match &mut self.templates {
            TemplateSlot::Live(manager) => Ok(manager),
            _ => Err(SessionError::TornDown),
        }
    }

    /// Release every loaded template. The manager is never created again.
    pub fn teardown_templates(&mut self) {
        if let TemplateSlot::Live(manager) = &self.templates {
            tracing::debug!(templates = manager.len(), "tearing down template manager");
        }
        self.templates = TemplateSlot::TornDown;
    }

    pub fn is_torn_down(&self) -> bool {
        matches!(self.templates, TemplateSlot::TornDown)
    }

    /// Reload templates whose files changed. Does nothing before the
    /// manager exists or after teardown.
    pub fn process_file_events(&mut self) -> usize {
        match &mut self.templates {
            TemplateSlot::Live(manager) => manager.process_file_events(),
            _ => 0,
        }
    }
}
