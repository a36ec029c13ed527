pub mod config;
pub mod core;
pub mod logging;
pub mod pipeline;
pub mod services;

#[cfg(test)]
pub mod test_utils;
