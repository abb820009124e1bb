//! HTTP facade over the tracker engine.

pub mod api;
pub mod state;
