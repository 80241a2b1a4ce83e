/// Shared formatting helpers (durations, outcome lines).
pub mod formatting;
/// Pure parser helpers.
pub mod parse;
/// Shared time helpers.
pub mod time;
