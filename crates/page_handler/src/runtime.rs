//! Async driver for a `PageContext`.

use crate::config::HitmapSettings;
use crate::events::PageEvent;
use crate::overlay::Overlay;
use crate::state::PageContext;
use crate::store::{ConfigChange, ConfigStore};
use anyhow::{Context as _, Result};
use dom::ObservedDocument;
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::Receiver;
use tokio::task;
use tokio::time::{self, Instant};

/// Drive `page` until a `Shutdown` event arrives or the event channel closes.
///
/// The loop waits on inbound events, settings changes, the earliest debounce
/// deadline and, while a pass is in flight, the next sampling slice, yielding
/// to the scheduler between slices. Events take priority over sampling so a
/// burst of mutations is absorbed before more points are sampled.
///
/// # Errors
/// Fails if the initial settings cannot be loaded from `store`.
pub async fn run<D, O, S>(
    store: &S,
    mut page: PageContext<D, O>,
    mut events: Receiver<PageEvent>,
) -> Result<PageContext<D, O>>
where
    D: ObservedDocument,
    O: Overlay,
    S: ConfigStore,
{
    let settings = store
        .load()
        .await
        .context("failed to load hitmap settings")?;
    page.replace_settings(settings);
    let mut changes = store.subscribe();
    let mut changes_open = true;
    info!("Hit-region page loop started");

    loop {
        let deadline = page.next_deadline();
        let sampling = page.is_pass_in_flight();
        tokio::select! {
            biased;
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Page event channel closed");
                    break;
                };
                if !page.handle_event(event, Instant::now()) {
                    break;
                }
            }
            change = changes.recv(), if changes_open => match change {
                Ok(change) => page.apply_config_change(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {skipped} settings changes; reloading");
                    let latest = store.load().await.unwrap_or_else(|err| {
                        warn!("Failed to reload settings: {err:#}");
                        page.settings().clone()
                    });
                    reload_settings(&mut page, latest);
                }
                Err(RecvError::Closed) => changes_open = false,
            },
            () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                page.fire_due(Instant::now());
            }
            () = task::yield_now(), if sampling => {
                page.run_chunk();
            }
        }
    }

    page.shutdown();
    info!("Hit-region page loop stopped");
    Ok(page)
}

/// Apply settings fetched out of band as if they arrived as a change.
fn reload_settings<D: ObservedDocument, O: Overlay>(
    page: &mut PageContext<D, O>,
    latest: HitmapSettings,
) {
    let old = page.settings().clone();
    if old != latest {
        page.apply_config_change(ConfigChange { old, new: latest });
    }
}
