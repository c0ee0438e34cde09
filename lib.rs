/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Dashboard shell: tabs, clipboard, drag-and-drop, persistence, and
//! cross-tab sync over the `dashshell-core` content tree.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod diagnostics;
pub mod dnd;
pub mod persistence;
pub mod selection;
pub mod sync;
pub mod tabs;

pub use app::{DashboardApp, DashboardIntent, MetadataPatch, PlacedItem, ViewLayout};
pub use config::DashboardConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
