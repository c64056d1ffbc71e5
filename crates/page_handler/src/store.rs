//! Settings storage and change notification.
//!
//! A store hands out the current `HitmapSettings` and broadcasts every change
//! as an `old`/`new` pair in the order the store applied them. Values are
//! validated on the way in, so subscribers never see out-of-range settings.

use crate::config::HitmapSettings;
use anyhow::{Context as _, Result};
use core::future::Future;
use core::mem;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, broadcast};

/// Buffered changes per subscriber before it starts lagging.
const CHANGE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub old: HitmapSettings,
    pub new: HitmapSettings,
}

pub trait ConfigStore {
    /// Current settings.
    fn load(&self) -> impl Future<Output = Result<HitmapSettings>> + Send;

    /// Stream of future changes.
    fn subscribe(&self) -> broadcast::Receiver<ConfigChange>;
}

/// Swap `next` into `slot` and broadcast the change if anything differs.
fn publish(
    slot: &mut HitmapSettings,
    next: HitmapSettings,
    changes: &broadcast::Sender<ConfigChange>,
) -> Option<ConfigChange> {
    if *slot == next {
        return None;
    }
    let change = ConfigChange {
        old: mem::replace(slot, next.clone()),
        new: next,
    };
    if changes.send(change.clone()).is_err() {
        debug!("Settings changed with no subscribers");
    }
    Some(change)
}

/// In-memory settings.
#[derive(Debug)]
pub struct MemoryStore {
    settings: Mutex<HitmapSettings>,
    changes: broadcast::Sender<ConfigChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(HitmapSettings::default())
    }
}

impl MemoryStore {
    pub fn new(settings: HitmapSettings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            settings: Mutex::new(settings.validated()),
            changes,
        }
    }

    /// Replace the settings; returns the change if anything differed.
    pub async fn update(&self, settings: HitmapSettings) -> Option<ConfigChange> {
        let mut current = self.settings.lock().await;
        publish(&mut current, settings.validated(), &self.changes)
    }
}

impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<HitmapSettings> {
        Ok(self.settings.lock().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }
}

/// Settings persisted as a JSON file. A missing file means defaults.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    current: Mutex<HitmapSettings>,
    changes: broadcast::Sender<ConfigChange>,
}

impl JsonFileStore {
    /// Open the store at `path`, reading the file if it exists.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Self::read(&path).await?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path,
            current: Mutex::new(settings),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(path: &Path) -> Result<HitmapSettings> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No settings at {}; using defaults", path.display());
                return Ok(HitmapSettings::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let settings: HitmapSettings = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        Ok(settings.validated())
    }

    /// Validate, persist and publish new settings.
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    pub async fn save(&self, settings: HitmapSettings) -> Result<Option<ConfigChange>> {
        let settings = settings.validated();
        let json = serde_json::to_string_pretty(&settings)?;
        let mut current = self.current.lock().await;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(publish(&mut current, settings, &self.changes))
    }

    /// Re-read the file, publishing a change if it was edited externally.
    ///
    /// # Errors
    /// Fails if the file cannot be read or parsed; the current settings stay.
    pub async fn reload(&self) -> Result<Option<ConfigChange>> {
        let settings = Self::read(&self.path).await?;
        let mut current = self.current.lock().await;
        Ok(publish(&mut current, settings, &self.changes))
    }
}

impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<HitmapSettings> {
        Ok(self.current.lock().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }
}
