// src/audio/mod.rs
pub mod player;
pub mod resampling;

pub use player::{DevicePlayer, PlaybackOutcome, PlaybackSlot, Player};
