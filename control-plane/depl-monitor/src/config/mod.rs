pub mod types;

pub use types::ControllerConfig;
