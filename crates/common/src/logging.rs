use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::Context;

/// Events from our own crates are never suppressed: skipped files and failed
/// imports must always reach the log.
const OWN_TARGET_PREFIX: &str = "recipe_";

static IGNORE_RULES: OnceLock<IgnoreRules> = OnceLock::new();

/// The `[log] ignore` patterns plus a count of what they dropped.
struct IgnoreRules {
    patterns: Vec<Regex>,
    suppressed: AtomicUsize,
}

impl IgnoreRules {
    fn compile(patterns: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: patterns.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
            suppressed: AtomicUsize::new(0),
        })
    }

    /// Decide whether one event is dropped, counting it if so.
    fn drops(&self, target: &str, message: &str) -> bool {
        if self.patterns.is_empty() || target.starts_with(OWN_TARGET_PREFIX) {
            return false;
        }
        let line = format!("{target}: {message}");
        let hit = self.patterns.iter().any(|p| p.is_match(&line));
        if hit {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }
}

/// Compile and activate the `[log] ignore` patterns.
///
/// Call once, after the subscriber is installed and before the walk starts.
/// Later calls are ignored; the first set wins.
pub fn set_ignore_patterns(patterns: &[String]) -> Result<(), regex::Error> {
    let _ = IGNORE_RULES.set(IgnoreRules::compile(patterns)?);
    Ok(())
}

/// Number of third-party events dropped so far, for the end-of-run summary.
pub fn suppressed_count() -> usize {
    IGNORE_RULES
        .get()
        .map_or(0, |r| r.suppressed.load(Ordering::Relaxed))
}

/// Per-layer filter dropping third-party events whose `"<target>: <message>"`
/// matches an ignore pattern. pdf-extract in particular is chatty about fonts
/// and glyph names on perfectly readable recipe PDFs.
///
/// ```ignore
/// tracing_subscriber::fmt::layer().with_filter(LogIgnoreFilter)
/// ```
pub struct LogIgnoreFilter;

impl<S: Subscriber> tracing_subscriber::layer::Filter<S> for LogIgnoreFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let Some(rules) = IGNORE_RULES.get() else {
            return true;
        };
        let text = EventText::of(event);
        !rules.drops(text.target(event), &text.message)
    }
}

/// The message of an event and, for events bridged from the `log` crate, the
/// real target carried in the `log.target` field.
#[derive(Default)]
struct EventText {
    message: String,
    log_target: Option<String>,
}

impl EventText {
    fn of(event: &Event<'_>) -> Self {
        let mut text = Self::default();
        event.record(&mut text);
        text
    }

    fn target<'a>(&'a self, event: &'a Event<'_>) -> &'a str {
        self.log_target
            .as_deref()
            .unwrap_or_else(|| event.metadata().target())
    }
}

impl Visit for EventText {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "log.target" => self.log_target = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "log.target" => self.log_target = Some(format!("{value:?}")),
            _ => {}
        }
    }
}
