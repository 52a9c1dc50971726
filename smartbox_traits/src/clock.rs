use chrono::{DateTime, Duration, Utc};

/// Wall-clock abstraction for the engine.
///
/// The engine reasons about calendar days (holiday periods, day-over-day
/// consumption), so this trait deals in `chrono::DateTime<Utc>` rather than a
/// monotonic instant.
pub trait WallClock {
    fn now(&self) -> DateTime<Utc>;

    /// Today's UTC calendar date.
    fn today(&self) -> chrono::NaiveDate {
        self.now().date_naive()
    }
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl WallClock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time can be set and advanced manually.
///
/// now() = the last value given to `set`, plus any `advance` calls since.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::Mutex::new(now)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += d;
        }
    }

    /// Jump the clock to an absolute time.
    pub fn set(&self, t: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = t;
        }
    }
}

impl WallClock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_else(|_| Utc::now())
    }
}
