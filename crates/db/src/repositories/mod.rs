use async_trait::async_trait;
use thiserror::Error;

use coverdesk_core::audit::AuditEntry;
use coverdesk_core::domain::discount::DiscountCode;
use coverdesk_core::domain::quote::{Quote, QuoteId};
use coverdesk_core::domain::renewal::RenewalPolicy;

pub mod audit;
pub mod cache;
pub mod discount;
pub mod memory;
pub mod quote;
pub mod renewal;

pub use audit::SqlAuditLogRepository;
pub use cache::{CachedQuoteRepository, Freshness, QuoteListing};
pub use discount::SqlDiscountCodeRepository;
pub use memory::{
    InMemoryAuditLogRepository, InMemoryDiscountCodeRepository, InMemoryQuoteRepository,
    InMemoryRenewalPolicyRepository,
};
pub use quote::SqlQuoteRepository;
pub use renewal::SqlRenewalPolicyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("quote `{quote_id}` not found")]
    Missing { quote_id: String },
    #[error("quote `{quote_id}` version mismatch (expected {expected})")]
    Conflict { quote_id: String, expected: u64 },
}

/// Quote documents. Writes are versioned: `update_guarded` persists only if
/// the stored version still equals `expected_version`, so concurrent editors
/// cannot silently overwrite each other.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;

    /// All quotes, newest first by creation time.
    async fn list_all(&self) -> Result<Vec<Quote>, RepositoryError>;

    async fn insert(&self, quote: Quote) -> Result<(), RepositoryError>;

    async fn update_guarded(
        &self,
        quote: Quote,
        expected_version: u64,
    ) -> Result<(), RepositoryError>;
}

/// Append-only audit trail, stored apart from the quote documents. Reads
/// come back newest first; a failed read is an error, never a synthetic
/// placeholder entry.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError>;
    async fn list_for_quote(&self, quote_id: &QuoteId) -> Result<Vec<AuditEntry>, RepositoryError>;
}

#[async_trait]
pub trait RenewalPolicyRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<RenewalPolicy>, RepositoryError>;
    async fn save(&self, policy: RenewalPolicy) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DiscountCodeRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError>;
    async fn list_for_staff(
        &self,
        staff_id: &str,
        year: i32,
    ) -> Result<Vec<DiscountCode>, RepositoryError>;
    async fn save(&self, code: DiscountCode) -> Result<(), RepositoryError>;
}
