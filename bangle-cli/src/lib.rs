//! Bangle application composition
//!
//! Wires the shared slices into a window store and a worker ("naukar")
//! store, joins them with a sync channel, and adds the slices that only
//! make sense next to a host page.

pub mod commands;
pub mod config;
pub mod constants;
pub mod contexts;
pub mod slices;

pub use config::{AppConfig, AppEnv, ConfigError};
pub use contexts::{
    create_window_store, naukar_slices, spawn_naukar, window_slices, ContextError, NaukarHandle,
    NaukarOptions, WindowParts,
};
