use thiserror::Error;

/// Failures a caller is expected to tell apart from ordinary transport errors.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<CatalogError>()`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Empty response from server")]
    EmptyResponse,
    #[error("Upstream returned {status} for {url}: {body}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },
}

pub fn is_empty_response(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::EmptyResponse)
    )
}
