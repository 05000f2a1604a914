/// Application.
pub mod app;
/// Command-line arguments
pub mod args;
/// Nodes, jobs and their numbering
pub mod cluster;
/// Configuration file
pub mod config;
/// Results of a refresh cycle
pub mod dashboard;
/// Errors that abort a refresh cycle
pub mod error;
/// Terminal events handler
pub mod event;
/// Event handler.
pub mod handler;
/// Log file
pub mod logging;
/// Core occupancy matrices
pub mod occupancy;
/// Querying of batch systems
pub mod scheduler;
/// Terminal user interface
pub mod tui;
/// Widget renderer
pub mod ui;
/// Account tokens and colors
pub mod users;
pub mod utilities;
/// Custom widgets
pub mod widgets;
