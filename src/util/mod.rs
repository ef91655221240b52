//! Utility functions shared by the API client, the list view and the terminal host.
//!
//! - **HTML**: turning server-rendered entry fragments into title, body text and permalink
//! - **Links**: checking entry links before they are handed to the browser
//! - **Text processing**: Unicode-aware width calculation, truncation and wrapping
//! - **Tasks**: panic capture for spawned request tasks
//!
//! # Examples
//!
//! ```
//! use feedview::util::{display_width, render_entry, truncate_to_width};
//!
//! let entry = render_entry(r#"<h2><a class="yarr-link" href="https://example.com/">Hello</a></h2>"#);
//! assert_eq!(entry.title, "Hello");
//!
//! assert_eq!(display_width("Hello 世界"), 10);
//! assert_eq!(truncate_to_width("Long article title", 10), "Long ar...");
//! ```

mod html;
mod link;
mod task;
mod text;

pub use html::{decode_entities, render_entry, RenderedEntry};
pub use link::{validate_link, LinkError};
pub use task::catch_task_panic;
pub use text::{display_width, strip_control_chars, truncate_to_width, wrap_line, wrapped_height};
