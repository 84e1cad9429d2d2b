//! Error type of the catalog layer.

use std::sync::Arc;

use thiserror::Error;

use nomenclab_core::{EntityId, RemoteError};

/// Errors produced by catalog operations.
///
/// Remote failures are carried behind an `Arc` because a single failed
/// fetch may be delivered to every caller attached to the same in-flight
/// request.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// A remote call failed; see [`RemoteError`] for the taxonomy.
    #[error("{0}")]
    Remote(Arc<RemoteError>),

    /// A derived-cache lookup missed: the loaded catalog references no
    /// such entity.
    #[error("{entity} {id} not found in the loaded catalog")]
    NotFound { entity: &'static str, id: EntityId },
}

impl CatalogError {
    /// One user-displayable message per error family.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Remote(err) => err.user_message(),
            Self::NotFound { .. } => "The requested record no longer exists.",
        }
    }
}

impl From<RemoteError> for CatalogError {
    fn from(err: RemoteError) -> Self {
        Self::Remote(Arc::new(err))
    }
}

impl From<Arc<RemoteError>> for CatalogError {
    fn from(err: Arc<RemoteError>) -> Self {
        Self::Remote(err)
    }
}

/// Convenience result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_user_message_passes_through() {
        let err: CatalogError = RemoteError::network("down").into();
        assert_eq!(
            err.user_message(),
            RemoteError::network("down").user_message()
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = CatalogError::NotFound {
            entity: "Determination",
            id: 9,
        };
        assert_eq!(err.to_string(), "Determination 9 not found in the loaded catalog");
    }
}
