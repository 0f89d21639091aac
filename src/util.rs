use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static PROGRESS_BAR_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn progress_bar(enabled: bool) {
    PROGRESS_BAR_ENABLED.store(enabled, Ordering::SeqCst)
}

pub(crate) fn make_progress_bar(count: usize) -> ProgressBar {
    if !PROGRESS_BAR_ENABLED.load(Ordering::SeqCst) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(count as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{wide_bar}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Diagnostics go to stderr so stdout only carries the tools' own output.
/// `RUST_LOG` overrides `default_filter`. Returns false when a subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Facet values ordered by count, highest first. Ties are broken by name so output is stable.
pub fn most_common(counts: &HashMap<String, u64>, top: usize) -> Vec<(&str, u64)> {
    let mut items = counts
        .iter()
        .map(|(key, &count)| (key.as_str(), count))
        .collect::<Vec<_>>();
    items.sort_unstable_by(|l, r| r.1.cmp(&l.1).then_with(|| l.0.cmp(r.0)));
    items.truncate(top);
    items
}
