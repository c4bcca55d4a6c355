//! Device integration and state-fan-out engine for a headless music-control
//! server: discovery, per-device protocol adapters (streamer, media server,
//! amplifier), the playlist/queue reconciler, and the central Hub that
//! composes their state and broadcasts typed update messages.

pub mod amplifier;
pub mod discovery;
pub mod errors;
pub mod favorites;
pub mod hub;
pub mod links;
pub mod lyrics;
pub mod mediaserver;
pub mod model;
pub mod playlists;
mod reconnect;
pub mod streamer;

pub use errors::{Result, VibinError};
pub use hub::Hub;
