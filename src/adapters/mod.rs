//! Adapter implementations for port traits.
//!
//! - `live/`: real network implementation
//! - `recording/`: record exchanges to cassettes
//! - `replaying/`: replay exchanges from cassettes

pub mod live;
pub mod recording;
pub mod replaying;
#[cfg(test)]
pub mod scripted;
