use super::command::PaymentCommand;
use super::state::{ActualState, DesiredState};
use crate::error::{PaymentError, Result};
use chrono::Utc;

/// Plans the commands that transform `current` into `desired`.
///
/// Pure: reads both states, produces an ordered command list, touches
/// nothing. Pre-conditions are checked in a fixed order and the first
/// failure aborts planning without a partial plan.
///
/// When new charges are owed while authorizations are being net-released,
/// the plan captures from the expiring authorization instead of issuing a
/// fresh charge, so money already held is used first. Commands are emitted
/// capture first, then the authorization adjustment, then the residual
/// charge or refund, then the partner movement; callers rely on this order.
pub fn generate_resolution(
    current: &ActualState,
    desired: &DesiredState,
) -> Result<Vec<PaymentCommand>> {
    let observed = &current.record;

    if desired.bucket != observed.bucket {
        return Err(PaymentError::DifferentBucket);
    }
    if desired.user_id != observed.user_id {
        return Err(PaymentError::DifferentUser);
    }
    if desired.partner_id != observed.partner_id {
        return Err(PaymentError::DifferentPartner);
    }
    if desired.date > Utc::now() {
        return Err(PaymentError::DateInFuture);
    }
    if desired.date < observed.date {
        return Err(PaymentError::LaterStateApplied);
    }
    // An authorized amount above i64::MAX almost certainly wrapped around
    // from a negative computation upstream.
    if observed.authorized_amount > i64::MAX as u64 || desired.authorized_amount > i64::MAX as u64 {
        return Err(PaymentError::Underflow);
    }

    let mut charge_amount = i128::from(desired.amount) - i128::from(observed.amount);
    let mut authorize_amount =
        i128::from(desired.authorized_amount) - i128::from(observed.authorized_amount);
    let mut capture_amount: i128 = 0;

    if charge_amount > 0 && authorize_amount < 0 {
        // Money is being released while new charges are owed; capture the
        // overlap instead of charging.
        if -authorize_amount > charge_amount {
            authorize_amount += charge_amount;
            capture_amount = charge_amount;
            charge_amount = 0;
        } else {
            charge_amount += authorize_amount;
            capture_amount = -authorize_amount;
            authorize_amount = 0;
        }
    }

    let mut cmds = Vec::new();

    if capture_amount > 0 {
        cmds.push(desired.capture(capture_amount as u64));
    }

    if authorize_amount < 0 {
        cmds.push(desired.release((-authorize_amount) as u64));
    } else if authorize_amount > 0 {
        cmds.push(desired.authorize(authorize_amount as u64));
    }

    if charge_amount > 0 {
        cmds.push(desired.charge(charge_amount as u64));
    } else if charge_amount < 0 {
        cmds.push(desired.refund((-charge_amount) as u64));
    }

    let partner_amount = i128::from(desired.partner_amount) - i128::from(observed.partner_amount);
    if partner_amount > 0 {
        cmds.push(desired.deposit(partner_amount as u64));
    } else if partner_amount < 0 {
        cmds.push(desired.withdraw((-partner_amount) as u64));
    }

    Ok(cmds)
}
