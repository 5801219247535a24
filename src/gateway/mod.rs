//! Remote store access: the REST endpoints that own contacts and tags.
//!
//! [`RemoteStore`] is the seam the rest of the crate talks to. [`HttpGateway`]
//! speaks to the real server; [`InMemoryStore`] applies the same rules in
//! process so the controller can be exercised without a network.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::model::{Contact, ContactDraft, Tag, TagDraft, TagId};

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{InMemoryStore, StoreCall, StoreOperation};

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    CapacityExceeded,
    DuplicateName,
    NotFound,
    Validation,
    Server,
}

/// A failed store call. The message is the server's text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    CapacityExceeded(String),
    #[error("{0}")]
    DuplicateName(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Server(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            GatewayError::DuplicateName(_) => ErrorKind::DuplicateName,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::Server(_) => ErrorKind::Server,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayError::CapacityExceeded(message)
            | GatewayError::DuplicateName(message)
            | GatewayError::NotFound(message)
            | GatewayError::Validation(message)
            | GatewayError::Server(message) => message,
        }
    }

    /// Classifies a non-success response. The server reports limits and
    /// collisions in its error text, so the body is consulted before the status.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        } else {
            trimmed.to_owned()
        };
        let lowered = message.to_lowercase();
        if lowered.contains("maximum of") {
            return GatewayError::CapacityExceeded(message);
        }
        if status == StatusCode::CONFLICT || lowered.contains("already exists") {
            return GatewayError::DuplicateName(message);
        }
        match status {
            StatusCode::NOT_FOUND => GatewayError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                GatewayError::Validation(message)
            }
            _ => GatewayError::Server(message),
        }
    }
}

/// The eight REST operations the client consumes. Implementations do not
/// retry and have no side effects beyond the call itself.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_contacts(&self) -> GatewayResult<Vec<Contact>>;
    async fn create_contact(&self, draft: &ContactDraft) -> GatewayResult<()>;
    /// Updates date and tag of the contact named `draft.name`.
    async fn edit_contact(&self, draft: &ContactDraft) -> GatewayResult<()>;
    async fn delete_contact(&self, name: &str) -> GatewayResult<()>;
    async fn list_tags(&self) -> GatewayResult<Vec<Tag>>;
    async fn create_tag(&self, draft: &TagDraft) -> GatewayResult<()>;
    async fn edit_tag(&self, id: TagId, draft: &TagDraft) -> GatewayResult<()>;
    async fn delete_tag(&self, id: TagId) -> GatewayResult<()>;
}
