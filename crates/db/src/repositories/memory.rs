use std::collections::HashMap;

use tokio::sync::RwLock;

use coverdesk_core::audit::AuditEntry;
use coverdesk_core::domain::discount::DiscountCode;
use coverdesk_core::domain::quote::{Quote, QuoteId};
use coverdesk_core::domain::renewal::RenewalPolicy;

use super::{
    AuditLogRepository, DiscountCodeRepository, QuoteRepository, RenewalPolicyRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut listed: Vec<Quote> = quotes.values().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0)));
        Ok(listed)
    }

    async fn insert(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }

    async fn update_guarded(
        &self,
        quote: Quote,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        match quotes.get(&quote.id.0) {
            None => Err(RepositoryError::Missing { quote_id: quote.id.0.clone() }),
            Some(stored) if stored.version != expected_version => Err(RepositoryError::Conflict {
                quote_id: quote.id.0.clone(),
                expected: expected_version,
            }),
            Some(_) => {
                quotes.insert(quote.id.0.clone(), quote);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLogRepository {
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn list_for_quote(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut scoped: Vec<AuditEntry> =
            entries.iter().filter(|entry| &entry.quote_id == quote_id).cloned().collect();
        scoped.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(scoped)
    }
}

#[derive(Default)]
pub struct InMemoryRenewalPolicyRepository {
    policies: RwLock<HashMap<String, RenewalPolicy>>,
}

#[async_trait::async_trait]
impl RenewalPolicyRepository for InMemoryRenewalPolicyRepository {
    async fn list_all(&self) -> Result<Vec<RenewalPolicy>, RepositoryError> {
        let policies = self.policies.read().await;
        let mut listed: Vec<RenewalPolicy> = policies.values().cloned().collect();
        listed.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date));
        Ok(listed)
    }

    async fn save(&self, policy: RenewalPolicy) -> Result<(), RepositoryError> {
        let mut policies = self.policies.write().await;
        policies.insert(policy.policy_number.clone(), policy);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDiscountCodeRepository {
    codes: RwLock<HashMap<String, DiscountCode>>,
}

#[async_trait::async_trait]
impl DiscountCodeRepository for InMemoryDiscountCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let codes = self.codes.read().await;
        Ok(codes.get(code).cloned())
    }

    async fn list_for_staff(
        &self,
        staff_id: &str,
        year: i32,
    ) -> Result<Vec<DiscountCode>, RepositoryError> {
        let codes = self.codes.read().await;
        let mut listed: Vec<DiscountCode> = codes
            .values()
            .filter(|code| code.staff_id == staff_id && code.year == year)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.percent.cmp(&a.percent).then_with(|| a.code.cmp(&b.code)));
        Ok(listed)
    }

    async fn save(&self, code: DiscountCode) -> Result<(), RepositoryError> {
        let mut codes = self.codes.write().await;
        codes.insert(code.code.clone(), code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use coverdesk_core::domain::quote::QuoteId;

    use super::InMemoryQuoteRepository;
    use crate::repositories::quote::tests::sample_quote;
    use crate::repositories::{QuoteRepository, RepositoryError};

    #[tokio::test]
    async fn in_memory_quote_repo_round_trip() {
        let repo = InMemoryQuoteRepository::default();
        let quote = sample_quote("QT-M1");

        repo.insert(quote.clone()).await.expect("insert");
        let found = repo.find_by_id(&quote.id).await.expect("find");

        assert_eq!(found, Some(quote));
    }

    #[tokio::test]
    async fn update_guarded_enforces_versions_like_the_sql_repository() {
        let repo = InMemoryQuoteRepository::default();
        let quote = sample_quote("QT-M2");
        repo.insert(quote.clone()).await.expect("insert");

        let mut winner = quote.clone();
        winner.version = 2;
        repo.update_guarded(winner, 1).await.expect("winner");

        let mut loser = quote.clone();
        loser.version = 2;
        let conflict = repo.update_guarded(loser, 1).await.expect_err("loser");
        assert!(matches!(conflict, RepositoryError::Conflict { .. }));

        let missing = repo
            .update_guarded(sample_quote("QT-M3"), 1)
            .await
            .expect_err("unknown quote");
        assert!(matches!(missing, RepositoryError::Missing { .. }));

        let stored = repo
            .find_by_id(&QuoteId("QT-M2".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(stored.version, 2);
    }
}
