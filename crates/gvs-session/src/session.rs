//! The session: event handling and the main loop.

use std::sync::Arc;

use gvs_backend::Backend;
use gvs_cache::{NotificationStream, ProjectStatusCache};
use gvs_repo::RepoEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::config::SessionConfig;
use crate::event::StatusEvent;

/// Owner of the status cache and the receiving end of repository results.
///
/// A session is driven from one thread: lifecycle signals go through
/// [`handle`](Self::handle), repository results are merged by
/// [`pump`](Self::pump), [`next_result`](Self::next_result) or
/// [`run`](Self::run).
pub struct Session {
    config: SessionConfig,
    cache: ProjectStatusCache,
    results: UnboundedReceiver<RepoEvent>,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, config: SessionConfig) -> Self {
        let (tx, results) = mpsc::unbounded_channel();
        let cache = ProjectStatusCache::new(backend, tx, config.notification_capacity);
        Self {
            config,
            cache,
            results,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProjectStatusCache {
        &self.cache
    }

    /// Mutable access for queries that rebuild folder rollups.
    pub fn cache_mut(&mut self) -> &mut ProjectStatusCache {
        &mut self.cache
    }

    pub fn subscribe(&self) -> NotificationStream {
        self.cache.subscribe()
    }

    /// React to one lifecycle signal.
    pub fn handle(&mut self, event: StatusEvent) {
        debug!(event = %event, "status event");
        match event {
            StatusEvent::ProjectAdded(root) => {
                let is_current = self.cache.current_project() == Some(root.as_path());
                if self.cache.register_project(root) && is_current {
                    self.cache.check_status();
                }
            }
            StatusEvent::ProjectRemoved(root) => {
                self.cache.unregister_project(&root);
            }
            StatusEvent::CurrentProjectChanged(root) => {
                self.cache.set_current_project(root);
                self.cache.check_status();
            }
            StatusEvent::DocumentSaved(_) => {
                if self.config.refresh_on_save {
                    self.cache.check_status();
                }
            }
            StatusEvent::CurrentEditorChanged(path) => {
                self.cache.set_current_document(path.clone());
                if let Some(path) = path {
                    self.cache.request_file_diff(path);
                }
            }
            StatusEvent::DocumentClosed(path) => {
                self.cache.close_document(&path);
            }
            StatusEvent::SubtreeChanged(root) => {
                self.cache.invalidate_rollup(&root);
                self.cache.check_status();
            }
            StatusEvent::RepositoryChanged(_) => {
                self.cache.check_status();
            }
            StatusEvent::ApplicationActivated => {
                if self.config.refresh_on_activate {
                    self.cache.check_status();
                }
            }
        }
    }

    /// Merge one repository result. Returns whether cached state changed.
    pub fn apply(&mut self, result: RepoEvent) -> bool {
        self.cache.apply(result)
    }

    /// Merge every result that has already arrived, without waiting.
    ///
    /// Returns the number of results merged.
    pub fn pump(&mut self) -> usize {
        let mut merged = 0;
        while let Ok(result) = self.results.try_recv() {
            self.cache.apply(result);
            merged += 1;
        }
        merged
    }

    /// Wait for the next repository result and merge it.
    ///
    /// Returns whether cached state changed.
    pub async fn next_result(&mut self) -> bool {
        match self.results.recv().await {
            Some(result) => self.cache.apply(result),
            None => false,
        }
    }

    /// Handle lifecycle signals and merge results until `events` closes.
    pub async fn run(&mut self, mut events: UnboundedReceiver<StatusEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                Some(result) = self.results.recv() => {
                    self.cache.apply(result);
                }
            }
        }
        debug!("event stream closed, session loop finished");
    }
}
