//! Sealkit common – shared logging facade.

pub mod logging;

pub use logging::{Component, Logger};
