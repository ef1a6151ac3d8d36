use thiserror::Error;

/// Failure taxonomy for the merchandising engines.
///
/// `InsufficientData` is deliberately absent: an empty sales history is a
/// recognized state handled by the forecast shortcut, never a failure
/// surfaced to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("seller {seller_id} does not own {entity} {id}")]
    NotAuthorized { entity: &'static str, id: String, seller_id: String },
    #[error("model gateway unavailable: {0}")]
    ModelUnavailable(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl EngineError {
    /// Operator-safe message. The underlying cause is logged server-side;
    /// callers only ever see these.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested record could not be found.",
            Self::NotAuthorized { .. } => "You do not have access to this record.",
            Self::ModelUnavailable(_) => {
                "The AI service is not configured. Contact your administrator."
            }
            Self::Generation(_) => {
                "The AI service could not complete this request. Please try again."
            }
            Self::Validation(_) => {
                "The AI response could not be validated. Please retry the generation."
            }
            Self::Persistence(_) => "The service is temporarily unavailable. Please retry shortly.",
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn not_authorized(
        entity: &'static str,
        id: impl Into<String>,
        seller_id: impl Into<String>,
    ) -> Self {
        Self::NotAuthorized { entity, id: id.into(), seller_id: seller_id.into() }
    }
}
