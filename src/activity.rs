//! Claude activity monitoring over captured pane text.
//!
//! A supervisor loop ticks every second, captures each tracked pane with
//! `capture-pane -p -e` (ANSI preserved), and classifies the text as
//! active/idle by pattern matching. Claude renders a thinking indicator
//! containing an "esc to interrupt" phrase; the duration token next to it
//! is extracted when present.
//!
//! Design notes:
//! - Detection is string-pattern based only; no semantic parsing.
//! - Status-change callbacks fire from the monitor's own task, in
//!   transition order per pane. Callbacks must not block, and a panicking
//!   callback never takes the monitor down.
//! - The tracked-pane set is pushed in from discovery via `set_panes`;
//!   newly added panes are checked eagerly so the UI surfaces status
//!   without waiting for the next tick.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use regex::Regex;
use std::sync::LazyLock;
use tokio::task::JoinHandle;

use crate::executor::TmuxExecutor;

// ---------------------------------------------------------------------------
// Compiled patterns (case-sensitive, dot matches newline)
// ---------------------------------------------------------------------------

/// A pane is active iff its captured text matches this.
static ACTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\(.*?esc.*?to.*?interrupt.*?\)").unwrap());

/// Duration rendered before the "esc to interrupt" phrase, e.g. `(41s •`.
static DURATION_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\((\d+[hms](?:\d+[ms])?(?:\d+s)?)").unwrap());

/// Duration rendered after the phrase, e.g. `esc to interrupt · 45s`.
static DURATION_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)esc.*?to.*?interrupt.*?·\s*((?:\d+[hms]\s*)+)").unwrap()
});

// ---------------------------------------------------------------------------
// ActivityStatus
// ---------------------------------------------------------------------------

/// Classification result for one pane capture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityStatus {
    pub active: bool,
    /// Short human token such as `"41s"`, `"2m"`, `"1h 15m 30s"`; empty
    /// when no duration could be parsed.
    pub duration_text: String,
}

/// Classify captured pane text as active/idle and extract the duration.
pub fn classify_output(text: &str) -> ActivityStatus {
    if !ACTIVE_RE.is_match(text) {
        return ActivityStatus::default();
    }

    let duration_text = DURATION_BEFORE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .or_else(|| {
            DURATION_AFTER_RE
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .unwrap_or_default();

    ActivityStatus {
        active: true,
        duration_text,
    }
}

// ---------------------------------------------------------------------------
// ActivityMonitor
// ---------------------------------------------------------------------------

/// Callback invoked on every status change: `(pane_target, status)`.
pub type ActivityCallback = Arc<dyn Fn(&str, &ActivityStatus) + Send + Sync>;

/// Polling interval for the supervisor loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Concurrent pane-content poller.
pub struct ActivityMonitor {
    executor: Arc<dyn TmuxExecutor>,
    statuses: RwLock<HashMap<String, ActivityStatus>>,
    tracked: RwLock<Vec<String>>,
    callback: RwLock<Option<ActivityCallback>>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityMonitor {
    pub fn new(executor: Arc<dyn TmuxExecutor>) -> Self {
        Self {
            executor,
            statuses: RwLock::new(HashMap::new()),
            tracked: RwLock::new(Vec::new()),
            callback: RwLock::new(None),
            interval: POLL_INTERVAL,
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Override the polling interval (config hook; defaults to 1 s).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Install the status-change callback. A single slot: the last call wins.
    pub fn set_callback(&self, callback: ActivityCallback) {
        *self.callback.write().unwrap() = Some(callback);
    }

    /// Replace the tracked-pane set.
    ///
    /// Statuses for panes absent from the new list are dropped; panes not
    /// previously tracked are polled immediately rather than waiting for
    /// the next tick.
    pub fn set_panes(&self, targets: Vec<String>) {
        let added: Vec<String> = {
            let tracked = self.tracked.read().unwrap();
            targets
                .iter()
                .filter(|t| !tracked.contains(*t))
                .cloned()
                .collect()
        };

        {
            let mut tracked = self.tracked.write().unwrap();
            *tracked = targets.clone();
        }
        {
            let mut statuses = self.statuses.write().unwrap();
            statuses.retain(|target, _| targets.contains(target));
        }

        for target in added {
            self.poll_pane(&target);
        }
    }

    /// Current status for a pane, if tracked and polled at least once.
    pub fn status(&self, target: &str) -> Option<ActivityStatus> {
        self.statuses.read().unwrap().get(target).cloned()
    }

    /// Capture one pane and commit the classification.
    ///
    /// Capture failures are ignored: the pane may have just died and will
    /// be dropped from the tracked set on the next discovery.
    fn poll_pane(&self, target: &str) {
        let captured = match self
            .executor
            .execute(&["capture-pane", "-p", "-e", "-t", target])
        {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(_) => return,
        };

        let status = classify_output(&captured);

        let changed = {
            let mut statuses = self.statuses.write().unwrap();
            match statuses.get(target) {
                Some(prev) if *prev == status => false,
                _ => {
                    statuses.insert(target.to_string(), status.clone());
                    true
                }
            }
        };

        if changed {
            self.fire_callback(target, &status);
        }
    }

    fn fire_callback(&self, target: &str, status: &ActivityStatus) {
        let callback = self.callback.read().unwrap().clone();
        if let Some(cb) = callback {
            // A panicking callback must not take down the monitor.
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| cb(target, status)));
        }
    }

    /// Spawn the supervisor loop on the tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let targets = monitor.tracked.read().unwrap().clone();
                for target in targets {
                    if shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    monitor.poll_pane(&target);
                }
            }
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Stop the supervisor loop. No further callbacks fire after this.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;
    use rstest::rstest;

    // -- Classifier soundness ----------------------------------------------

    #[rstest]
    #[case(
        "\x1b[38;2;215;119;87m* Wondering... (41s • 5.7k tokens • esc to interrupt)\x1b[0m",
        true,
        "41s"
    )]
    #[case(
        "\x1b[38;2;215;119;87m· Investigating… \x1b[38;2;153;153;153m(0s · ⚒\x1b[39m \x1b[38;2;153;153;153m18 tokens · \x1b[1mesc \x1b[0m\x1b[38;2;153;153;153mto interrupt)",
        true,
        "0s"
    )]
    #[case("· Working… (esc to interrupt · 45s · ctrl+t to show todos)", true, "45s")]
    #[case("· Analyzing… (esc to interrupt · 2m)", true, "2m")]
    #[case("(esc to interrupt)", true, "")]
    #[case("> User prompt here", false, "")]
    #[case("* Wondering...", false, "")]
    #[case("ESC TO INTERRUPT", false, "")]
    fn test_classifier_cases(
        #[case] text: &str,
        #[case] active: bool,
        #[case] duration: &str,
    ) {
        let status = classify_output(text);
        assert_eq!(status.active, active, "active mismatch for {:?}", text);
        assert_eq!(
            status.duration_text, duration,
            "duration mismatch for {:?}",
            text
        );
    }

    #[test]
    fn test_classifier_long_duration_after_phrase() {
        let status = classify_output("(esc to interrupt · 1h 15m 30s)");
        assert!(status.active);
        assert_eq!(status.duration_text, "1h 15m 30s");
    }

    #[test]
    fn test_classifier_matches_across_lines() {
        let status = classify_output("(esc\nto\ninterrupt)");
        assert!(status.active);
    }

    #[test]
    fn test_classifier_escape_substring_counts_as_active() {
        // Known quirk: "escape to interrupt" matches within "escape".
        let status = classify_output("(escape to interrupt)");
        assert!(status.active);
    }

    // -- Monitor behavior ---------------------------------------------------

    fn capture_key(target: &str) -> String {
        format!("capture-pane -p -e -t {}", target)
    }

    #[test]
    fn test_set_panes_polls_new_panes_eagerly() {
        let mock = Arc::new(MockExecutor::new());
        mock.script(&capture_key("dev:0.0"), "* Thinking (3s • esc to interrupt)");

        let monitor = ActivityMonitor::new(mock.clone() as Arc<dyn TmuxExecutor>);
        monitor.set_panes(vec!["dev:0.0".to_string()]);

        // Checked without waiting for a tick.
        assert_eq!(mock.count_calls_with_prefix("capture-pane"), 1);
        let status = monitor.status("dev:0.0").unwrap();
        assert!(status.active);
        assert_eq!(status.duration_text, "3s");
    }

    #[test]
    fn test_set_panes_drops_removed_panes() {
        let mock = Arc::new(MockExecutor::new());
        mock.script(&capture_key("dev:0.0"), "(esc to interrupt)");
        mock.script(&capture_key("dev:0.1"), "idle");

        let monitor = ActivityMonitor::new(mock as Arc<dyn TmuxExecutor>);
        monitor.set_panes(vec!["dev:0.0".to_string(), "dev:0.1".to_string()]);
        assert!(monitor.status("dev:0.0").is_some());

        monitor.set_panes(vec!["dev:0.1".to_string()]);
        assert!(monitor.status("dev:0.0").is_none());
        assert!(monitor.status("dev:0.1").is_some());
    }

    #[test]
    fn test_callback_fires_on_change_only() {
        let mock = Arc::new(MockExecutor::new());
        mock.script(&capture_key("dev:0.0"), "(5s • esc to interrupt)");

        let monitor = ActivityMonitor::new(mock.clone() as Arc<dyn TmuxExecutor>);
        let fired = Arc::new(Mutex::new(Vec::<(String, ActivityStatus)>::new()));
        {
            let fired = Arc::clone(&fired);
            monitor.set_callback(Arc::new(move |target, status| {
                fired.lock().unwrap().push((target.to_string(), status.clone()));
            }));
        }

        monitor.set_panes(vec!["dev:0.0".to_string()]);
        // Same capture again: no transition, no callback.
        monitor.poll_pane("dev:0.0");
        // Duration advances: transition.
        mock.script(&capture_key("dev:0.0"), "(6s • esc to interrupt)");
        monitor.poll_pane("dev:0.0");
        // Goes idle: transition.
        mock.script(&capture_key("dev:0.0"), "> done");
        monitor.poll_pane("dev:0.0");

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 3);
        assert_eq!(fired[0].1.duration_text, "5s");
        assert_eq!(fired[1].1.duration_text, "6s");
        assert!(!fired[2].1.active);
    }

    #[test]
    fn test_panicking_callback_does_not_poison_monitor() {
        let mock = Arc::new(MockExecutor::new());
        mock.script(&capture_key("dev:0.0"), "(esc to interrupt)");

        let monitor = ActivityMonitor::new(mock.clone() as Arc<dyn TmuxExecutor>);
        monitor.set_callback(Arc::new(|_, _| panic!("listener bug")));
        monitor.set_panes(vec!["dev:0.0".to_string()]);

        // The monitor keeps serving queries after the callback panicked.
        assert!(monitor.status("dev:0.0").unwrap().active);
        mock.script(&capture_key("dev:0.0"), "> idle");
        monitor.poll_pane("dev:0.0");
        assert!(!monitor.status("dev:0.0").unwrap().active);
    }

    #[tokio::test]
    async fn test_ticker_polls_tracked_panes() {
        let mock = Arc::new(MockExecutor::new());
        mock.script(&capture_key("dev:0.0"), "(esc to interrupt)");

        let monitor = Arc::new(ActivityMonitor::new(mock.clone() as Arc<dyn TmuxExecutor>));
        monitor.set_panes(vec!["dev:0.0".to_string()]);
        let after_eager = mock.count_calls_with_prefix("capture-pane");

        monitor.start();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        monitor.stop();

        assert!(mock.count_calls_with_prefix("capture-pane") > after_eager);
    }
}
