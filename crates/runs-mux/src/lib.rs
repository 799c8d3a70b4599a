//! Session supervisor implementations
//!
//! This crate provides concrete implementations of the SessionSupervisor
//! trait. tmux is the only backend.

pub mod tmux;

pub use tmux::TmuxSupervisor;
