//! QuickExplain: select text, get a short explanation in a tooltip anchored
//! to the selection.
//!
//! The content side ([`content`]) and the background ([`background`]) share
//! nothing but the message channel in [`messaging`]. The page, the selection
//! and the preference store are reached through the capability traits in
//! [`selection`] and [`prefs`].

pub mod background;
pub mod config;
pub mod content;
pub mod input;
pub mod messaging;
pub mod models;
pub mod network;
pub mod page;
pub mod popup;
pub mod prefs;
pub mod selection;
pub mod theme;
pub mod tooltip;
pub mod ui;
pub mod utils;
