//! Tokio event loop feeding host events and timers into the runtime

use std::time::Instant;

use tokio::sync::{broadcast, mpsc};

use crate::dom::Document;
use crate::placeholder::{PostIdentifier, PostMetadata};

use super::runtime::PlaceholderRuntime;

/// Notifications from the host page
#[derive(Debug)]
pub enum HostEvent {
    /// A post finished rendering
    Render {
        metadata: Option<PostMetadata>,
        document: Document,
    },
    /// A rendered post grew, e.g. while streaming
    Rescan { post: PostIdentifier },
    /// A control's value changed
    Input {
        post: PostIdentifier,
        key: String,
        value: String,
    },
    /// A post was torn down
    Dispose { post: PostIdentifier },
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

fn handle_event(runtime: &mut PlaceholderRuntime, event: HostEvent) {
    match event {
        HostEvent::Render { metadata, document } => {
            if let Err(e) = runtime.render(metadata, document, now()) {
                tracing::warn!(error = %e, "Failed to render post placeholders");
            }
        }
        HostEvent::Rescan { post } => {
            if let Err(e) = runtime.rescan(&post, now()) {
                tracing::warn!(post = %post, error = %e, "Failed to rescan post");
            }
        }
        HostEvent::Input { post, key, value } => {
            runtime.input(&post, &key, value, now());
        }
        HostEvent::Dispose { post } => {
            runtime.dispose(&post);
        }
    }
}

/// Drive `runtime` until the event channel closes and all queued work has
/// run, or until shutdown is signalled. Returns the runtime for inspection.
pub async fn run_event_loop(
    mut runtime: PlaceholderRuntime,
    mut events: mpsc::Receiver<HostEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> PlaceholderRuntime {
    let mut open = true;
    tracing::info!("Placeholder event loop started");

    loop {
        if !open && !runtime.has_pending() {
            break;
        }

        let deadline = runtime.next_deadline();

        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(
                    pending_tasks = runtime.has_pending(),
                    "Placeholder event loop received shutdown signal"
                );
                break;
            }
            event = events.recv(), if open => {
                match event {
                    Some(event) => handle_event(&mut runtime, event),
                    None => {
                        tracing::debug!("Host event channel closed, draining queued tasks");
                        open = false;
                    }
                }
            }
            _ = sleep_until(deadline) => {
                let ran = runtime.run_due(now());
                tracing::debug!(ran = ran, "Ran due placeholder tasks");
            }
        }
    }

    tracing::info!("Placeholder event loop stopped");
    runtime
}
