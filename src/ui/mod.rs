//! Terminal User Interface module.
//!
//! This module provides the TUI for the feed client, including:
//! - Main event loop (`run`)
//! - Keyboard dispatch through the keybinding registry
//! - Rendering of the feed sidebar, entry panel, status bar and help
//! - [`TerminalSurface`], the row-based surface the list view draws on
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Layout and render dispatch
//! - `entries` - Entry panel widget
//! - `feeds` - Feed sidebar widget
//! - `status` - Status bar widget
//! - `help` - Help overlay
//! - `surface` - Entry layout and scrolling

mod entries;
mod feeds;
mod help;
mod input;
mod loop_runner;
mod render;
mod status;
mod surface;

// Re-export the public API
pub use loop_runner::{run, Action};
pub use surface::TerminalSurface;
