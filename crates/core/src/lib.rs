pub mod app;
pub mod cache;
pub mod color;
pub mod error;
pub mod hasher;
pub mod hashval;
pub mod pool;
pub mod scanner;

pub use error::{Error, Result};
pub use hashval::HashVal;
