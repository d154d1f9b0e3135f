#![allow(clippy::module_inception)]
pub mod application;
pub mod flash;

// Re-export key components to form the application's public API.
pub use application::{display_error, Application, ApplicationBuilder, ErrorHook};
pub use flash::{Flash, FlashKind, FLASH_SESSION_KEY};
