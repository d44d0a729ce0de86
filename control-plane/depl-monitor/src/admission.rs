//! Admission-time hooks for MonDepl.
//!
//! Served by an external webhook; the reconciler assumes they already ran
//! before an object was persisted.

use tracing::info;

use crate::crd::MonDepl;

pub const DEFAULT_REASON: &str = "love";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("rejected: {0}")]
    Rejected(String),
}

pub trait Defaulter {
    fn apply_defaults(&mut self);
}

pub trait Validator {
    fn validate_create(&self) -> Result<(), AdmissionError>;
    fn validate_update(&self, old: &Self) -> Result<(), AdmissionError>;
    fn validate_delete(&self) -> Result<(), AdmissionError>;
}

impl Defaulter for MonDepl {
    fn apply_defaults(&mut self) {
        info!("admission: defaulting MonDepl");
        if self.spec.reason.is_empty() {
            self.spec.reason = DEFAULT_REASON.to_string();
        }
    }
}

// Extension points; every operation is admitted for now.
impl Validator for MonDepl {
    fn validate_create(&self) -> Result<(), AdmissionError> {
        info!("admission: validating create");
        Ok(())
    }

    fn validate_update(&self, _old: &Self) -> Result<(), AdmissionError> {
        info!("admission: validating update");
        Ok(())
    }

    fn validate_delete(&self) -> Result<(), AdmissionError> {
        info!("admission: validating delete");
        Ok(())
    }
}
