#![forbid(unsafe_code)]

mod document;
mod engine;
mod error;
mod store;

pub use document::*;
pub use engine::*;
pub use error::*;
pub use store::*;
