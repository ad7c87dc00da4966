/// Chess domain types.
pub mod chess;
/// The rules of chess as consumed by game sessions.
pub mod rules;
/// Crowd-voted game sessions.
pub mod session;
