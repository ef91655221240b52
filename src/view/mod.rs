//! The entry list: infinite scroll, current-entry tracking and state changes.
//!
//! [`ListView`] ties together:
//!
//! - **Queue**: ids of the view not fetched yet ([`PkQueue`])
//! - **Entries**: loaded entries and their laid-out positions ([`EntryCollection`])
//! - **Loader**: in-flight flag and load generation ([`LoadCoordinator`])
//! - **Selection**: the current and open entry ([`Selection`])
//! - **Status**: transient messages ([`StatusLine`])
//!
//! Drawing and measuring are left to a [`Surface`]; the terminal host provides
//! one and tests use fakes. Unread counts live in a [`FeedIndex`] owned by
//! the application and passed in when events are handled.

mod entries;
mod feeds;
mod list;
mod loader;
mod queue;
mod selection;
mod status;
mod surface;

pub use entries::{Entry, EntryCollection};
pub use feeds::{Feed, FeedIndex};
pub use list::{FollowUp, ListView, ViewEvent, ViewOptions};
pub use loader::{list_fill_count, viewport_gap, LoadCoordinator};
pub use queue::PkQueue;
pub use selection::{near_end, next_index, previous_index, Selection};
pub use status::{StatusKind, StatusLine};
pub use surface::{DisplayMode, Geometry, Surface};
