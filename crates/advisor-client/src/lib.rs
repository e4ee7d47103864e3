//! Client-side state for the product advisor: search results with filtered and
//! sorted views, and persisted UI preferences.

pub mod api;
pub mod error;
pub mod persistence;
pub mod search_store;
pub mod ui_store;
