pub mod setup;
pub mod tables;
pub mod ui;
