//! Ratatui front-end: one tab per entity, popups for forms, confirmations and
//! pickers, plus shortcuts for snapshot save/load and backups.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
