#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Build a [`CoreError::Validation`] from a `validator` error set.
    ///
    /// Only the offending field names are reported, sorted so the message is
    /// stable across runs.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();
        CoreError::Validation(format!("invalid or missing fields: {}", fields.join(", ")))
    }
}
