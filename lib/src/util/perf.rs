use std::fmt;
use std::time::{Duration, Instant};

/// Measures wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct PerfTimer {
    start: Instant,
}

impl PerfTimer {
    pub fn new() -> Self {
        PerfTimer { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The elapsed time, formatted for humans.
    pub fn time_since(&self) -> String {
        format_duration(self.elapsed())
    }
}

impl Default for PerfTimer {
    fn default() -> Self {
        PerfTimer::new()
    }
}

impl fmt::Display for PerfTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.time_since())
    }
}

pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    match micros {
        0..=999 => format!("{micros}µs"),
        1_000..=999_999 => format!("{}ms", micros / 1_000),
        _ => format!("{:.2}s", duration.as_secs_f64()),
    }
}
