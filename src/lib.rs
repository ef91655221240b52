//! Terminal client for yarr feed readers.
//!
//! - [`api`]: typed client for the server's JSON API
//! - [`view`]: the infinitely scrolling entry list, independent of the terminal
//! - [`ui`] and [`app`]: the ratatui host that drives the view
//! - [`config`]: the optional config file

pub mod api;
pub mod app;
pub mod config;
pub mod keybindings;
pub mod ui;
pub mod util;
pub mod view;
