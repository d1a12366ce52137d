// --- File: crates/roombook_gcal/src/lib.rs ---
// Declare modules within this crate
pub mod auth;
pub mod directory;
pub mod doc;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_test;
pub mod routes;
pub mod service;
