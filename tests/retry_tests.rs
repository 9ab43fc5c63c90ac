mod common;

use common::{fixture, fixture_with};
use payrec::domain::command::CommandStatus;
use payrec::error::ProviderError;

#[tokio::test]
async fn test_retryable_error_is_not_failure() {
    let f = fixture();
    let cmd = f.desired.charge(1000);
    let key = cmd.idempotency_key();

    f.user
        .fail_next(&key, ProviderError::retryable("Internal Server Error"))
        .await;
    let (cmds, errs) = f.engine.run(vec![cmd]).await;
    assert_eq!(errs.len(), 1);
    assert_eq!(cmds[0].status, CommandStatus::Error);
    assert_eq!(cmds[0].error, "Internal Server Error");
    assert_eq!(cmds[0].attempts, 1);
    assert_eq!(f.engine.current_state().await.record.amount, 0);

    // Same command object resubmitted, same idempotency key, fails again.
    f.user
        .fail_next(&key, ProviderError::retryable("Internal Server Error"))
        .await;
    let (cmds, errs) = f.engine.run(cmds).await;
    assert_eq!(errs.len(), 1);
    assert_eq!(cmds[0].status, CommandStatus::Error);
    assert_eq!(cmds[0].attempts, 2);
    assert_eq!(f.engine.current_state().await.record.amount, 0);

    // Third attempt goes through.
    let (cmds, errs) = f.engine.run(cmds).await;
    assert!(errs.is_empty());
    assert_eq!(cmds[0].status, CommandStatus::Complete);
    assert!(cmds[0].error.is_empty());
    assert_eq!(cmds[0].attempts, 3);
    assert_eq!(f.engine.current_state().await.record.amount, 1000);
    assert_eq!(f.user.balance().await, 1000);
}

#[tokio::test]
async fn test_terminal_error_is_failure() {
    let f = fixture();
    let cmd = f.desired.charge(1000);

    f.user
        .fail_next(&cmd.idempotency_key(), ProviderError::new("card declined"))
        .await;
    let (cmds, errs) = f.engine.run(vec![cmd]).await;
    assert_eq!(errs.len(), 1);
    assert_eq!(cmds[0].status, CommandStatus::Failed);
    assert_eq!(cmds[0].error, "card declined");
    assert_eq!(f.engine.current_state().await.record.amount, 0);
}

#[tokio::test]
async fn test_retryable_marker_found_through_nested_sources() {
    let f = fixture();
    let cmd = f.desired.charge(1000);

    let upstream = ProviderError::retryable("upstream timed out");
    f.user
        .fail_next(
            &cmd.idempotency_key(),
            ProviderError::with_source("gateway unavailable", upstream),
        )
        .await;
    let (cmds, _) = f.engine.run(vec![cmd]).await;
    assert_eq!(cmds[0].status, CommandStatus::Error);
    assert_eq!(cmds[0].error, "gateway unavailable");
}

#[tokio::test]
async fn test_errors_aggregate_across_workers() {
    let f = fixture_with(|state| state.record.amount = 500);
    let charge = f.desired.charge(1000);
    let refund = f.desired.refund(500);
    let deposit = f.desired.deposit(250);

    f.user
        .fail_next(&charge.idempotency_key(), ProviderError::new("declined"))
        .await;
    f.user
        .fail_next(&refund.idempotency_key(), ProviderError::retryable("flaky"))
        .await;

    let (cmds, errs) = f.engine.run(vec![charge, refund, deposit]).await;
    assert_eq!(errs.len(), 2);
    let messages: Vec<String> = errs.iter().map(|err| err.to_string()).collect();
    assert!(messages.contains(&"declined".to_string()));
    assert!(messages.contains(&"flaky".to_string()));

    assert_eq!(cmds[0].status, CommandStatus::Failed);
    assert_eq!(cmds[1].status, CommandStatus::Error);
    assert_eq!(cmds[2].status, CommandStatus::Complete);
    assert!(cmds.iter().all(|cmd| cmd.attempts == 1));

    // Only the deposit landed.
    let state = f.engine.current_state().await;
    assert_eq!(state.record.amount, 500);
    assert_eq!(state.record.partner_amount, 250);
}

#[tokio::test]
async fn test_attempt_clears_stale_error_on_success() {
    let f = fixture();
    let cmd = f.desired.charge(1000);

    f.user
        .fail_next(&cmd.idempotency_key(), ProviderError::retryable("flaky"))
        .await;
    let (cmds, _) = f.engine.run(vec![cmd]).await;
    assert_eq!(cmds[0].error, "flaky");

    let (cmds, _) = f.engine.run(cmds).await;
    assert_eq!(cmds[0].status, CommandStatus::Complete);
    assert!(cmds[0].error.is_empty());
}

#[tokio::test]
async fn test_provider_absorbs_duplicate_submission() {
    let f = fixture();
    let cmd = f.desired.charge(1000);

    let (mut cmds, errs) = f.engine.run(vec![cmd]).await;
    assert!(errs.is_empty());
    assert_eq!(f.user.balance().await, 1000);

    // Re-submitting the completed command re-invokes the provider with the
    // same key; the provider reports success without charging again.
    cmds[0].status = CommandStatus::Pending;
    let (cmds, errs) = f.engine.run(cmds).await;
    assert!(errs.is_empty());
    assert_eq!(cmds[0].status, CommandStatus::Complete);
    assert_eq!(cmds[0].attempts, 2);
    assert_eq!(f.user.balance().await, 1000);
}
