// src/lib.rs

pub mod application;
pub mod components;
pub mod core;
pub mod model;
pub mod service;

pub use crate::application::{Application, ApplicationBuilder, Flash, FlashKind};
pub use crate::core::{AppError, AppResult, Config};
pub use crate::service::{Capability, Container, ProviderRegistry};
