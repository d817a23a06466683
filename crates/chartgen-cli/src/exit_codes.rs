//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - manifest could not be read or decoded
pub const INPUT_ERROR: i32 = 2;

/// Config error - invalid generator configuration
pub const CONFIG_ERROR: i32 = 3;

/// Extraction error - a strategy failed or external files conflict
pub const EXTRACTION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Strict mode found resources no strategy handles
pub const UNHANDLED_RESOURCES: i32 = 6;
