pub mod config;
pub mod grab;
pub mod watch;

// Re-export all handlers
pub use config::handle_config;
pub use grab::handle_grab;
pub use watch::handle_watch;
