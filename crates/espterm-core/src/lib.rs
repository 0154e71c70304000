//! # espterm-core - Core Types
//!
//! Foundation crate for espterm. Provides the marker scanner, byte escaping,
//! error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (thiserror, tracing, dirs).
//!
//! ## Public API
//!
//! ### Marker Scanning (`scanner`)
//! - [`PatternScanner`] - Incremental matcher that survives chunk boundaries
//! - [`ScanResult`] - Result of feeding a chunk to the scanner
//! - [`MARKER`] - The exception-decoder cut line printed by ESP firmware
//!
//! ### Byte Escaping (`escape`)
//! - [`write_escaped()`] - Render non-printable bytes as `[XX]`
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use espterm_core::prelude::*;
//! ```

pub mod error;
pub mod escape;
pub mod logging;
pub mod scanner;

/// Prelude for common imports used throughout all espterm crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use escape::{is_displayable, write_escaped};
pub use scanner::{PatternScanner, ScanResult, MARKER};
