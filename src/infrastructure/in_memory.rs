use crate::domain::ports::{PartnerProvider, UserProvider};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory user-side provider with per-key idempotency.
///
/// Duplicate invocations under an already-handled key report success without
/// re-applying their effect. One-shot failures can be injected per key with
/// [`fail_next`](Self::fail_next), which is how tests exercise the engine's
/// error classification. `Clone` shares the underlying book.
#[derive(Default, Clone)]
pub struct InMemoryUserProvider {
    book: Arc<RwLock<UserBook>>,
}

#[derive(Default)]
struct UserBook {
    balance: i64,
    authorized_balance: u64,
    handled: HashSet<String>,
    failures: HashMap<String, ProviderError>,
}

impl InMemoryUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `error` to be returned by the next call under `key`.
    pub async fn fail_next(&self, key: &str, error: ProviderError) {
        let mut book = self.book.write().await;
        book.failures.insert(key.to_string(), error);
    }

    /// Net settled balance charged to the user.
    pub async fn balance(&self) -> i64 {
        self.book.read().await.balance
    }

    /// Outstanding authorized (held, uncaptured) balance.
    pub async fn authorized_balance(&self) -> u64 {
        self.book.read().await.authorized_balance
    }

    async fn handle(
        &self,
        key: &str,
        apply: impl FnOnce(&mut UserBook) -> Result<(), ProviderError>,
    ) -> Result<(), ProviderError> {
        let mut book = self.book.write().await;
        if let Some(err) = book.failures.remove(key) {
            return Err(err);
        }
        if book.handled.contains(key) {
            return Ok(());
        }
        apply(&mut book)?;
        book.handled.insert(key.to_string());
        Ok(())
    }
}

#[async_trait]
impl UserProvider for InMemoryUserProvider {
    async fn authorize(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| {
            book.authorized_balance += amount;
            Ok(())
        })
        .await
    }

    async fn capture(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| {
            if book.authorized_balance < amount {
                return Err(ProviderError::new("cannot capture more than authorized"));
            }
            book.authorized_balance -= amount;
            book.balance += amount as i64;
            Ok(())
        })
        .await
    }

    async fn release(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| {
            if book.authorized_balance < amount {
                return Err(ProviderError::new("cannot release more than authorized"));
            }
            book.authorized_balance -= amount;
            Ok(())
        })
        .await
    }

    async fn capture_release(
        &self,
        capture_key: &str,
        capture_amount: u64,
        release_key: &str,
        release_amount: u64,
    ) -> (Result<(), ProviderError>, Result<(), ProviderError>) {
        (
            self.capture(capture_key, capture_amount).await,
            self.release(release_key, release_amount).await,
        )
    }

    async fn charge(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| {
            book.balance += amount as i64;
            Ok(())
        })
        .await
    }

    async fn refund(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| {
            book.balance -= amount as i64;
            Ok(())
        })
        .await
    }
}

/// In-memory partner-side provider, symmetric to [`InMemoryUserProvider`].
#[derive(Default, Clone)]
pub struct InMemoryPartnerProvider {
    book: Arc<RwLock<PartnerBook>>,
}

#[derive(Default)]
struct PartnerBook {
    balance: i64,
    handled: HashSet<String>,
    failures: HashMap<String, ProviderError>,
}

impl InMemoryPartnerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `error` to be returned by the next call under `key`.
    pub async fn fail_next(&self, key: &str, error: ProviderError) {
        let mut book = self.book.write().await;
        book.failures.insert(key.to_string(), error);
    }

    /// Net balance transferred to the partner.
    pub async fn balance(&self) -> i64 {
        self.book.read().await.balance
    }

    async fn handle(
        &self,
        key: &str,
        apply: impl FnOnce(&mut PartnerBook),
    ) -> Result<(), ProviderError> {
        let mut book = self.book.write().await;
        if let Some(err) = book.failures.remove(key) {
            return Err(err);
        }
        if book.handled.insert(key.to_string()) {
            apply(&mut book);
        }
        Ok(())
    }
}

#[async_trait]
impl PartnerProvider for InMemoryPartnerProvider {
    async fn deposit(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| book.balance += amount as i64)
            .await
    }

    async fn withdraw(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError> {
        self.handle(idempotency_key, |book| book.balance -= amount as i64)
            .await
    }
}
