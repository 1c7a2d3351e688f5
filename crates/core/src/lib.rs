pub mod application;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
