//! # TW - Tasks with Weather
//!
//! A personal task list with filtered views and live weather for outdoor plans,
//! driven from a line console or a retro terminal user interface (TUI).
//!
//! ## Key Features
//!
//! - **Active/Completed Lists**: every task lives in exactly one of the two; completing
//!   a task moves it, reopening moves it back
//! - **Filtered Views**: My Day, Today, Important, Completed and Assigned to me, with
//!   case-insensitive search and date/priority/status/name sorting
//! - **Outdoor Weather**: tasks tagged as outdoor show current conditions for their
//!   location, refreshed after 30 minutes and isolated per task
//! - **Memory Only**: nothing is written to disk; logging out forgets everything
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the TUI
//! OPENWEATHER_API_KEY=... tw ui
//!
//! # Or drive the console
//! tw shell --user ada
//! tw> add "Picnic" --due saturday --outdoor Paris
//! tw> list --sort priority
//!
//! # One-off lookup
//! tw weather "Paris,FR"
//! ```
//!
//! ## Layout
//!
//! - [`store`] owns the two task collections and applies [`store::TaskAction`]s
//! - [`query`] derives the visible list, counts and progress from a store
//! - [`weather`] fetches and caches conditions per task on a tokio runtime
//! - [`session`] ties identity, tasks and weather together in [`session::AppState`]
//! - [`cmd`] and [`tui`] are the two front ends

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fields;
pub mod logging;
pub mod query;
pub mod session;
pub mod store;
pub mod task;
pub mod util;
pub mod weather;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}
