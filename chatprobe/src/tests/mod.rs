mod fake_app;
mod prompt_tests;
mod selector_tests;

use crate::config::Timings;
use std::time::Duration;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Real-world delays, shortened; tests run on paused time anyway
pub fn fast_timings() -> Timings {
    Timings {
        focus_settle: Duration::from_millis(50),
        tap_settle: Duration::from_millis(50),
        send_settle: Duration::from_millis(300),
        inter_prompt: Duration::from_millis(100),
        locate_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(250),
        response_timeout: Duration::from_secs(2),
    }
}
