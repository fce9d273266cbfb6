//! Shared application state type.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// An Arc-wrapped [`AxumContext`]; handlers only read from it.
pub type AppState = Arc<AxumContext>;
