pub mod app;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod output;
pub mod png;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod table;
pub mod tui;
