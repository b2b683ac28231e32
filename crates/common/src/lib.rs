pub mod api;
pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
