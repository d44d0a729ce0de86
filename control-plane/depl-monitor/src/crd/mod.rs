pub mod mon_depl;

pub use mon_depl::{MonConfigs, MonDepl, MonDeplSpec, MonDeplStatus};
