//! Reading position and progress

pub mod cursor;
pub mod progress;

pub use cursor::{NavigationError, Position, RestorePolicy, Restored};
