/// State management module
///
/// This module handles all application state, including:
/// - Database connections and queries (library.rs)
/// - Shared data structures (data.rs)
/// - The catalog's event table (events.rs)

pub mod data;
pub mod events;
pub mod library;
