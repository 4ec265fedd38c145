pub mod color;
pub mod config;
pub mod palette;
pub mod platform;
pub mod protocol;
pub mod snapshot;
pub mod state;
