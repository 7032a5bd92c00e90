pub mod error;
pub mod config;
pub mod context;
pub mod system_paths;
pub mod extensions;
pub mod scripts;
pub mod store;
pub mod loader;
pub mod download;
pub mod pipeline;
pub mod catalog;
pub mod rebuild;
pub mod cli;

pub use catalog::Catalog;
pub use config::Config;
pub use context::{SessionContext, Verbosity};
pub use error::{F1dbError, F1dbResult};
pub use pipeline::Pipeline;
pub use store::Store;

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
