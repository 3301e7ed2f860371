//! Error types for cache construction and mutation.

use thiserror::Error;

/// Errors reported synchronously by the call that violated a contract.
///
/// Both variants describe programmer errors: they are never retried internally
/// and the cache is left untouched when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
	/// A configuration value or a computed weight is out of range.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// The builder was asked to build before a required option was set.
	#[error("illegal state: {0}")]
	IllegalState(&'static str),
}

/// Convenience result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
