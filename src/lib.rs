// Library surface for the binary, headless runs and integration tests.
pub mod animation;
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod ui;
