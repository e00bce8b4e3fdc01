use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{error, info, warn};

/// Quiet period after the first change before reloading, so a burst of
/// editor writes triggers a single reload
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Calls `on_change` whenever the config file or an endpoint directory changes.
/// Watching stops when this value is dropped.
pub struct EndpointWatcher {
    _watcher: RecommendedWatcher,
}

impl EndpointWatcher {
    pub fn new<F>(paths: Vec<PathBuf>, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        for path in &paths {
            if path.exists() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                info!("Watching endpoint path: {}", path.display());
            } else {
                warn!("Endpoint path does not exist, skipping: {}", path.display());
            }
        }

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    std::thread::sleep(DEBOUNCE);
                    // Drain whatever arrived during the quiet period
                    while rx.try_recv().is_ok() {}
                    info!("Endpoint change detected, reloading...");
                    on_change();
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(_) => break,
            }
        });

        Ok(Self { _watcher: watcher })
    }
}
