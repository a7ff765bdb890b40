//! Result type alias for the decomposer
//!
//! Uses [`DecomposerError`] as the error type.

use super::errors::DecomposerError;

/// Result type alias for decomposer operations
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::domain::result::Result;
/// use nocturne_decomposer::domain::errors::DecomposerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(DecomposerError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, DecomposerError>;
