//! Testing utilities
//!
//! - [`MockUpstream`] - in-process smtp.dev stand-in served on an ephemeral port
//! - [`test_state`] - application state wired to a mock upstream

pub mod upstream;

pub use upstream::{MockUpstream, TEST_API_KEY};

use crate::config::TempmailConfig;
use crate::state::AppState;

/// Application state pointing at `upstream`, with persistence disabled
///
/// The store starts without an API key; call
/// [`Store::set_api_key`](crate::store::Store::set_api_key) to log in.
pub fn test_state(upstream: &MockUpstream) -> AppState {
    let mut config = TempmailConfig::default();
    config.api.base_url = upstream.base_url();
    config.store.persist = false;
    config.refresh.manual_cooldown_ms = 2000;
    AppState::with_config(config).expect("test state")
}

/// Like [`test_state`], logged in with [`TEST_API_KEY`]
pub fn logged_in_state(upstream: &MockUpstream) -> AppState {
    let state = test_state(upstream);
    state
        .store()
        .set_api_key(TEST_API_KEY)
        .expect("test key accepted");
    state
}
