use chrono::{Duration, Utc};
use payrec::application::engine::ReconciliationEngine;
use payrec::domain::state::{ActualState, DesiredState, PaymentStatus};
use payrec::infrastructure::in_memory::{InMemoryPartnerProvider, InMemoryUserProvider};
use uuid::Uuid;

pub type Engine = ReconciliationEngine<InMemoryUserProvider, InMemoryPartnerProvider>;

/// An engine over fresh in-memory providers, plus handles to the providers
/// (for failure injection and balance checks) and a desired-state template
/// matching the engine's relationship.
pub struct Fixture {
    pub engine: Engine,
    pub user: InMemoryUserProvider,
    pub partner: InMemoryPartnerProvider,
    pub desired: DesiredState,
}

pub fn fixture() -> Fixture {
    fixture_with(|_| {})
}

/// Like [`fixture`], with the observed state adjusted by `tweak` before the
/// engine takes ownership of it.
pub fn fixture_with(tweak: impl FnOnce(&mut ActualState)) -> Fixture {
    let user = InMemoryUserProvider::new();
    let partner = InMemoryPartnerProvider::new();

    let mut current = ActualState {
        record: DesiredState {
            id: Uuid::new_v4(),
            external_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            date: Utc::now() - Duration::minutes(10),
            bucket: "test".to_string(),
            amount: 0,
            authorized_amount: 0,
            partner_amount: 0,
        },
        status: PaymentStatus::Complete,
    };
    tweak(&mut current);

    let desired = DesiredState {
        id: Uuid::new_v4(),
        external_id: current.record.external_id,
        user_id: current.record.user_id,
        partner_id: current.record.partner_id,
        date: Utc::now(),
        bucket: current.record.bucket.clone(),
        amount: 0,
        authorized_amount: 0,
        partner_amount: 0,
    };

    Fixture {
        engine: ReconciliationEngine::new(current, user.clone(), partner.clone()),
        user,
        partner,
        desired,
    }
}
