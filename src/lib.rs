pub mod error;
pub mod message;
pub mod util;

pub mod algolia;
pub mod daylogs;

#[cfg(test)]
mod test_server;

pub use error::{Error, Result};
