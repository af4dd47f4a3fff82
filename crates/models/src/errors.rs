use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<ModelError> for common::ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => common::ServiceError::Validation(msg),
        }
    }
}

pub(crate) fn require(cond: bool, msg: &str) -> Result<(), ModelError> {
    if cond {
        Ok(())
    } else {
        Err(ModelError::Validation(msg.to_string()))
    }
}

pub(crate) fn non_empty(value: &str, field: &str) -> Result<(), ModelError> {
    require(!value.trim().is_empty(), &format!("{} is required", field))
}

pub(crate) fn positive(value: f64, field: &str) -> Result<(), ModelError> {
    require(value.is_finite() && value > 0.0, &format!("{} must be positive", field))
}
