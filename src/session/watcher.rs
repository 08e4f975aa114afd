use notify::event::{Event, EventKind};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};
use tracing::debug;

use super::SessionEvent;
use crate::error::Result;

/// Turns file-system notifications for one configuration directory into
/// [`SessionEvent`]s.
///
/// The folder holding the directory is watched as well, so a configuration
/// directory that was deleted and recreated gets watched again.
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    config_dir: PathBuf,
    armed: bool,
}

impl ConfigWatcher {
    pub fn new(config_dir: &Path) -> Result<Self> {
        let (tx, rx) = channel();
        let config = Config::default().with_poll_interval(Duration::from_secs(1));
        let mut watcher = RecommendedWatcher::new(tx, config)?;
        if let Some(folder) = config_dir.parent().filter(|p| p.is_dir()) {
            watcher.watch(folder, RecursiveMode::NonRecursive)?;
        }
        watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %config_dir.display(), "watching configuration directory");
        Ok(Self {
            watcher,
            rx,
            config_dir: config_dir.to_path_buf(),
            armed: true,
        })
    }

    /// Watches the configuration directory again if it was removed and has
    /// since been recreated.
    pub fn rearm(&mut self) {
        if self.armed || !self.config_dir.is_dir() {
            return;
        }
        let _ = self.watcher.unwatch(&self.config_dir);
        match self
            .watcher
            .watch(&self.config_dir, RecursiveMode::NonRecursive)
        {
            Ok(()) => {
                self.armed = true;
                debug!(dir = %self.config_dir.display(), "re-watching configuration directory");
            }
            Err(e) => debug!(error = %e, "configuration directory not watchable yet"),
        }
    }

    /// Blocks until the next batch of relevant events. `None` once the
    /// watcher has shut down.
    pub fn next_events(&mut self) -> Option<Vec<SessionEvent>> {
        loop {
            self.rearm();
            let first = self.rx.recv().ok()?;
            if let Some(batch) = self.collect(first) {
                return Some(batch);
            }
        }
    }

    /// Like [`ConfigWatcher::next_events`], giving up after `timeout`.
    pub fn next_events_within(&mut self, timeout: Duration) -> Option<Vec<SessionEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            self.rearm();
            let left = deadline.saturating_duration_since(Instant::now());
            let first = self.rx.recv_timeout(left).ok()?;
            if let Some(batch) = self.collect(first) {
                return Some(batch);
            }
        }
    }

    fn collect(&mut self, first: notify::Result<Event>) -> Option<Vec<SessionEvent>> {
        // Debounce: deleting a directory fires one event per file.
        std::thread::sleep(Duration::from_millis(100));
        let mut batch = Vec::new();
        for event in std::iter::once(first).chain(self.rx.try_iter()) {
            match event {
                Ok(event) => {
                    for translated in translate(&event, &self.config_dir) {
                        if !batch.contains(&translated) {
                            batch.push(translated);
                        }
                    }
                }
                Err(e) => debug!(error = %e, "watcher error"),
            }
        }
        if !self.config_dir.is_dir() {
            self.armed = false;
        }
        (!batch.is_empty()).then_some(batch)
    }
}

/// Removals of JSON documents directly inside `config_dir`.
pub fn translate(event: &Event, config_dir: &Path) -> Vec<SessionEvent> {
    if !matches!(event.kind, EventKind::Remove(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| p.parent() == Some(config_dir))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .map(|p| SessionEvent::ConfigDeleted(p.clone()))
        .collect()
}
