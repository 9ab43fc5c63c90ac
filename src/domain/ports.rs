use crate::error::ProviderError;
use async_trait::async_trait;

#[async_trait]
/// Capability set over a user's funding source.
///
/// Every method takes the idempotency key under which the provider must
/// collapse duplicate invocations, and must be safe against concurrent calls.
pub trait UserProvider: Send + Sync {
    /// Places a hold of `amount` on the funding source.
    async fn authorize(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;

    /// Converts `amount` of an existing hold into a settled charge.
    ///
    /// Must fail if the provider's authorized balance is below `amount`.
    async fn capture(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;

    /// Voids `amount` of an existing hold. Same pre-condition as `capture`.
    async fn release(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;

    /// Performs a capture and a release in one provider interaction.
    ///
    /// Some providers release the entire remainder of an authorization upon
    /// capture; a caller that needs a partial capture must tell the provider
    /// how much to release in the same call. The two sub-operations succeed
    /// or fail independently, each under its own idempotency key, and each
    /// side effect is applied iff its result is `Ok`.
    async fn capture_release(
        &self,
        capture_key: &str,
        capture_amount: u64,
        release_key: &str,
        release_amount: u64,
    ) -> (Result<(), ProviderError>, Result<(), ProviderError>);

    /// Charges the user immediately, without a prior hold.
    async fn charge(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;

    /// Reverses a prior charge.
    async fn refund(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;
}

#[async_trait]
/// Capability set over the partner-side balance.
pub trait PartnerProvider: Send + Sync {
    /// Transfers `amount` into the partner-side balance.
    async fn deposit(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;

    /// Transfers `amount` out of the partner-side balance.
    async fn withdraw(&self, idempotency_key: &str, amount: u64) -> Result<(), ProviderError>;
}
