use std::sync::Once;

use chrono::{DateTime, Utc};
use tracing_subscriber::EnvFilter;

use crate::time_grid::{TimeGrid, TimeOfDay};

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness writer. Honors
/// `RUST_LOG`, defaults to `debug` for the clinic crates.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,doctor_cell=debug,appointment_cell=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Absolute instant of local `date` + `time` on the default clinic grid.
///
/// Panics on malformed input; test fixtures only.
pub fn local_instant(date: &str, time: &str) -> DateTime<Utc> {
    let grid = TimeGrid::default();
    let day = grid.civil_date(date).expect("fixture date must be YYYY-MM-DD");
    let time = TimeOfDay::parse(time).expect("fixture time must be HH:mm");
    grid.at(&day, time)
}
