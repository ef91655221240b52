//! Client for the yarr JSON API.
//!
//! The server renders entries to HTML and owns ordering, filtering and
//! persisted state. This module provides:
//!
//! - **Types**: identifiers, entry state, wire payloads and [`ApiError`]
//! - **Client**: the [`EntryApi`] trait consumed by the list view, and
//!   [`HttpApi`], its reqwest implementation
//!
//! Endpoints live under the configured API root:
//!
//! | Endpoint     | Purpose                                      |
//! |--------------|----------------------------------------------|
//! | `entry/get`  | rendered entries for a list of pks           |
//! | `entry/set`  | change state, returns fresh feed unread counts |
//! | `feed/pks`   | ordered entry pks for a feed/state/order view |
//! | `feed/get`   | feed titles and counts                       |

mod client;
mod types;

pub use client::{EntryApi, HttpApi};
pub use types::{
    join_pks, ApiError, EntryPayload, EntryPk, EntryState, FeedInfo, FeedPk, FeedPks, Order,
    StateChange,
};
