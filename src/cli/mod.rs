//! Admin command line surface.

pub mod catalog;
pub mod setup;
pub mod ui;
