// Library surface for integration tests.

pub mod candles;
pub mod config;
pub mod gate;
pub mod indicators;
pub mod news;
pub mod notify;
pub mod outcome;
pub mod session;
pub mod signal;
pub mod stream;
pub mod types;
