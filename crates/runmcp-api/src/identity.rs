//! Request identity.
//!
//! The client carries a default identity; a task-scoped override installed
//! with [`with_identity`] takes precedence for every request issued inside
//! the scope. The scope does not cross `tokio::spawn` boundaries — a spawned
//! task sees the client default unless it installs its own scope.

use std::future::Future;

/// Optional identity attached to outbound requests.
///
/// When `anonymous` is set, neither UUID is ever transmitted regardless of
/// what else is present.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Organization UUID, operator-provided.
    pub org_uuid: Option<String>,

    /// Host UUID, generated on first run and persisted.
    pub host_uuid: Option<String>,

    /// Suppress both UUID headers.
    pub anonymous: bool,
}

impl Identity {
    /// An identity that transmits nothing.
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Self::default()
        }
    }
}

tokio::task_local! {
    static SCOPED_IDENTITY: Identity;
}

/// Run `fut` with `identity` overriding the client default for every request
/// issued within it.
pub async fn with_identity<F>(identity: Identity, fut: F) -> F::Output
where
    F: Future,
{
    SCOPED_IDENTITY.scope(identity, fut).await
}

/// The identity scoped to the current task, if any.
pub fn scoped_identity() -> Option<Identity> {
    SCOPED_IDENTITY.try_with(Clone::clone).ok()
}
