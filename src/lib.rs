pub mod error;
pub mod config;
pub mod telemetry;
pub mod shape;
pub mod cache;
pub mod executor;
pub mod service;

pub use cache::{CacheKey, DateRange, NoopCache, QueryCache, ResultCache};
pub use error::{AppError, AppResult};
pub use service::{ChartPayload, ChartRequest, ChartService, FetchMode};
pub use shape::{shape, shape_with_hints, ChartDataConfig, ChartKind, DataKeys, ShapeHints};

// Test-only printing helper: expands to tprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
