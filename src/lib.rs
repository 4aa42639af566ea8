#![doc = include_str!("../README.md")]

pub use crate::config::*;
pub use crate::error::Error;
pub use crate::logger::*;
pub use crate::types::*;

pub mod config;
pub mod error;
pub mod logger;
pub mod types;
