use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Route Ctrl-C to the engine's cancel token. The record in flight finishes; no
/// further records start.
pub fn install(token: Arc<AtomicBool>) {
    if let Err(err) = ctrlc::set_handler(move || {
        request_stop(&token);
    }) {
        warn!("Could not install Ctrl-C handler: {}", err);
    }
}

fn request_stop(token: &AtomicBool) -> bool {
    let first = !token.swap(true, Ordering::SeqCst);
    if first {
        warn!("Interrupt received, stopping after the current record...");
    }
    first
}
