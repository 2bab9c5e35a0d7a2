//! IlmOS - a terminal reader for a guided Islamic-studies curriculum
//!
//! IlmOS walks a learner through the sections of a curriculum text,
//! remembers where they stopped and keeps that position in sync with a
//! hosted backend, falling back to a local cache when offline.

pub mod app;
pub mod config;
pub mod curriculum;
pub mod dashboard;
pub mod reader;
pub mod sync;

pub use app::App;
pub use config::Config;
pub use curriculum::Curriculum;
