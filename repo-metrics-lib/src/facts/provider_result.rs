use compact_str::CompactString;
use std::sync::Arc;

/// Outcome of collecting one repository.
#[derive(Debug, Clone)]
pub enum ProviderResult<T> {
    /// The repository was fetched.
    Found(T),

    /// The repository could not be fetched (unknown, private, or otherwise rejected upstream).
    Unavailable(CompactString),

    /// Collection failed below HTTP, or was cancelled.
    Error(Arc<ohno::AppError>),
}

impl<T> ProviderResult<T> {
    /// Why no data is available, or `None` for `Found`.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Found(_) => None,
            Self::Unavailable(reason) => Some(reason.to_string()),
            Self::Error(e) => Some(format!("{e:#}")),
        }
    }
}
