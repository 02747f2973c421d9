//! Mailbox refresh cycle
//!
//! A [`RefreshTracker`] guards one account/mailbox pair:
//!
//! - at most one refresh runs at a time ([`RefreshGuard`] releases on drop)
//! - manual refreshes are debounced by a cooldown
//! - new messages are found by diffing fresh IDs against the previous load
//!
//! [`run_refresh`] drives one cycle for a quick-mail account and turns the
//! result into a user-facing [`Notice`].

mod cycle;

pub use cycle::{run_refresh, seed_account, Notice, NoticeLevel, RefreshOutcome, RefreshReport};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::api::MessageSummary;

/// Default gap between admitted manual refreshes
pub const DEFAULT_MANUAL_COOLDOWN: Duration = Duration::from_millis(2000);

/// What started a refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    /// Poll timer
    #[default]
    Auto,
    /// Refresh button
    Manual,
    /// Page became visible
    Visibility,
    /// Window regained focus
    Focus,
}

impl RefreshTrigger {
    /// Whether the user asked for this refresh
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Visibility => "visibility",
            Self::Focus => "focus",
        })
    }
}

/// Why a refresh was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Another refresh is in flight
    Busy,
    /// A manual refresh was admitted too recently
    CoolingDown {
        /// Time until the next manual refresh is admitted
        remaining: Duration,
    },
}

#[derive(Debug, Default)]
struct TrackerState {
    last_manual: Option<Instant>,
    known: HashSet<String>,
    new_messages: usize,
    last_refresh: Option<DateTime<Utc>>,
    initialized: bool,
}

/// Refresh bookkeeping for one account/mailbox pair
#[derive(Debug)]
pub struct RefreshTracker {
    in_flight: AtomicBool,
    cooldown: Duration,
    state: Mutex<TrackerState>,
}

impl Default for RefreshTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MANUAL_COOLDOWN)
    }
}

/// Holds the in-flight flag; dropping it lets the next refresh in
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    tracker: &'a RefreshTracker,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight.store(false, Ordering::Release);
        trace!("Refresh released");
    }
}

impl RefreshTracker {
    /// Tracker with the given manual cooldown
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            cooldown,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Try to start a refresh now
    ///
    /// # Errors
    ///
    /// Returns [`Refusal::Busy`] while another refresh holds the guard and
    /// [`Refusal::CoolingDown`] for a manual trigger inside the cooldown.
    pub fn begin(&self, trigger: RefreshTrigger) -> Result<RefreshGuard<'_>, Refusal> {
        self.begin_at(trigger, Instant::now())
    }

    /// [`begin`](Self::begin) with an explicit clock reading
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin).
    pub fn begin_at(&self, trigger: RefreshTrigger, now: Instant) -> Result<RefreshGuard<'_>, Refusal> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%trigger, "Refresh refused: already in flight");
            return Err(Refusal::Busy);
        }
        let guard = RefreshGuard { tracker: self };

        if trigger.is_manual() {
            let mut state = self.state.lock();
            if let Some(last) = state.last_manual {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.cooldown {
                    let remaining = self.cooldown - elapsed;
                    debug!(%trigger, ?remaining, "Refresh refused: cooling down");
                    return Err(Refusal::CoolingDown { remaining });
                }
            }
            state.last_manual = Some(now);
        }

        debug!(%trigger, "Refresh admitted");
        Ok(guard)
    }

    /// Record a fresh listing and return the messages not seen before
    ///
    /// The result keeps the order of `fresh`. The known set becomes exactly
    /// the IDs of `fresh`, so deleted messages are forgotten.
    pub fn complete(&self, fresh: &[MessageSummary]) -> Vec<MessageSummary> {
        let mut state = self.state.lock();
        let new: Vec<MessageSummary> = fresh
            .iter()
            .filter(|m| !state.known.contains(&m.id))
            .cloned()
            .collect();

        state.known = fresh.iter().map(|m| m.id.clone()).collect();
        state.new_messages += new.len();
        state.last_refresh = Some(Utc::now());
        state.initialized = true;

        debug!(fresh = fresh.len(), new = new.len(), "Refresh completed");
        new
    }

    /// Record the initial load and reset the new-message counter
    pub fn seed(&self, initial: &[MessageSummary]) {
        let mut state = self.state.lock();
        state.known = initial.iter().map(|m| m.id.clone()).collect();
        state.new_messages = 0;
        state.last_refresh = Some(Utc::now());
        state.initialized = true;
        debug!(known = initial.len(), "Refresh tracker seeded");
    }

    /// Adopt a listing the user is now looking at
    ///
    /// Unlike [`seed`](Self::seed) the new-message counter is kept, so a
    /// re-render does not hide arrivals that were not acknowledged yet.
    pub fn sync(&self, shown: &[MessageSummary]) {
        let mut state = self.state.lock();
        state.known = shown.iter().map(|m| m.id.clone()).collect();
        state.last_refresh = Some(Utc::now());
        state.initialized = true;
        debug!(known = shown.len(), "Refresh tracker synced");
    }

    /// Clear the new-message counter, e.g. after the user opened a message
    pub fn acknowledge(&self) {
        self.state.lock().new_messages = 0;
    }

    /// Whether a refresh holds the guard
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether an initial load has been recorded
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// New messages seen since the last seed or acknowledgement
    #[must_use]
    pub fn new_message_count(&self) -> usize {
        self.state.lock().new_messages
    }

    /// When the last load finished
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_refresh
    }

    /// Number of message IDs currently known
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.state.lock().known.len()
    }
}

/// Trackers keyed by account and mailbox
#[derive(Debug)]
pub struct RefreshRegistry {
    cooldown: Duration,
    trackers: Mutex<HashMap<(String, String), Arc<RefreshTracker>>>,
}

impl Default for RefreshRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MANUAL_COOLDOWN)
    }
}

impl RefreshRegistry {
    /// Registry whose trackers use `cooldown`
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// Tracker for a pair, created on first use
    #[must_use]
    pub fn tracker(&self, account_id: &str, mailbox_id: &str) -> Arc<RefreshTracker> {
        let cooldown = self.cooldown;
        Arc::clone(
            self.trackers
                .lock()
                .entry((account_id.to_string(), mailbox_id.to_string()))
                .or_insert_with(|| Arc::new(RefreshTracker::new(cooldown))),
        )
    }

    /// Drop every tracker of an account
    pub fn forget_account(&self, account_id: &str) {
        self.trackers
            .lock()
            .retain(|(account, _), _| account != account_id);
    }

    /// Drop all trackers
    pub fn clear(&self) {
        self.trackers.lock().clear();
    }

    /// Number of live trackers
    #[must_use]
    pub fn len(&self) -> usize {
        self.trackers.lock().len()
    }

    /// Whether no tracker exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trackers.lock().is_empty()
    }
}
