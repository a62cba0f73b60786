//! Handler and sink implementations

pub mod console;
pub mod encoding;
pub mod handler;
pub mod rotating_file;
pub mod rotation;

pub use console::{ConsoleSink, ConsoleStream};
pub use encoding::Encoding;
pub use handler::Handler;
pub use rotating_file::{FileMode, RotatingFileSink};
pub use rotation::{backup_path, should_rotate, RotationPolicy};

pub use crate::core::Sink;
