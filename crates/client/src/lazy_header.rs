//! Lazy "Processing <file>" header for third-party warnings.
//!
//! pdf-extract and lopdf log warnings about fonts and broken xref tables
//! without saying which document they were reading. This layer prints a
//! single `INFO Processing <file>` line before the first such warning raised
//! while a file is being extracted, so the warning can be traced back to the
//! Drive file without repeating the name on every line.
//!
//! The walker calls [`set_pending`] right before extracting a file and
//! [`clear_pending`] right after. State is thread-local, which holds because
//! the importer runs on a current-thread runtime. Events from our own crates
//! (target `recipe_*`) already name the file and are ignored.

use std::cell::RefCell;

use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

struct Pending {
    file: String,
    emitted: bool,
}

thread_local! {
    static PENDING: RefCell<Option<Pending>> = const { RefCell::new(None) };
    // Guards against the info! below re-entering on_event.
    static IN_HEADER: RefCell<bool> = const { RefCell::new(false) };
}

pub fn set_pending(file: &str) {
    PENDING.with(|p| {
        *p.borrow_mut() = Some(Pending { file: file.to_owned(), emitted: false });
    });
}

pub fn clear_pending() {
    PENDING.with(|p| *p.borrow_mut() = None);
}

pub struct FileHeaderLayer;

impl<S: Subscriber> Layer<S> for FileHeaderLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !wants_header(meta.level(), meta.target()) {
            return;
        }
        if IN_HEADER.with(|h| *h.borrow()) {
            return;
        }
        if let Some(file) = take_header() {
            IN_HEADER.with(|h| *h.borrow_mut() = true);
            tracing::info!(target: "recipe_client::walk", "Processing {file}");
            IN_HEADER.with(|h| *h.borrow_mut() = false);
        }
    }
}

/// Warnings and errors from crates other than our own.
fn wants_header(level: &tracing::Level, target: &str) -> bool {
    *level <= tracing::Level::WARN && !target.starts_with("recipe_")
}

/// The pending file name, the first time it is asked for.
fn take_header() -> Option<String> {
    PENDING.with(|p| {
        let mut pending = p.borrow_mut();
        match pending.as_mut() {
            Some(hdr) if !hdr.emitted => {
                hdr.emitted = true;
                Some(hdr.file.clone())
            }
            _ => None,
        }
    })
}
