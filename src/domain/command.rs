use super::state::DesiredState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The payment operation a command asks a provider to perform.
///
/// Commands carry unsigned magnitudes; the action encodes the direction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    /// Place a hold on the user's funding source.
    Authorize,
    /// Convert an existing hold into a settled charge.
    Capture,
    /// Void a hold, returning the held funds.
    Release,
    /// Charge the user immediately.
    Charge,
    /// Reverse a prior charge.
    Refund,
    /// Transfer into the partner-side balance.
    Deposit,
    /// Transfer out of the partner-side balance.
    Withdraw,
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Authorize => "authorize",
            Self::Capture => "capture",
            Self::Release => "release",
            Self::Charge => "charge",
            Self::Refund => "refund",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        };
        f.write_str(tag)
    }
}

/// Execution status of a command.
///
/// `Pending` is the only legal input status for execution. `Error` is
/// retryable and the command may be re-submitted unchanged; `Failed` is
/// terminal at the engine layer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Complete,
    Error,
    Failed,
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Failed => "failed",
        };
        f.write_str(tag)
    }
}

/// A planned or executing payment operation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentCommand {
    /// Unique id; its string form doubles as the provider idempotency key
    /// and is stable across retries.
    pub id: Uuid,
    /// The declaration this command was planned from.
    pub desired_state_id: Uuid,
    pub action: CommandAction,
    pub amount: u64,
    /// Number of times execution was attempted, regardless of outcome.
    pub attempts: u32,
    pub status: CommandStatus,
    /// Last failure message; empty unless status is `Error` or `Failed`.
    pub error: String,
}

impl PaymentCommand {
    /// The canonical idempotency key passed verbatim to providers.
    pub fn idempotency_key(&self) -> String {
        self.id.to_string()
    }

    /// Applies this command's balance movement to `state`, as if the provider
    /// had confirmed it.
    pub fn apply_to(&self, state: &mut DesiredState) {
        match self.action {
            CommandAction::Authorize => state.authorized_amount += self.amount,
            CommandAction::Capture => {
                state.authorized_amount -= self.amount;
                state.amount += self.amount as i64;
            }
            CommandAction::Release => state.authorized_amount -= self.amount,
            CommandAction::Charge => state.amount += self.amount as i64,
            CommandAction::Refund => state.amount -= self.amount as i64,
            CommandAction::Deposit => state.partner_amount += self.amount as i64,
            CommandAction::Withdraw => state.partner_amount -= self.amount as i64,
        }
    }
}

impl DesiredState {
    fn command(&self, action: CommandAction, amount: u64) -> PaymentCommand {
        PaymentCommand {
            id: Uuid::new_v4(),
            desired_state_id: self.id,
            action,
            amount,
            attempts: 0,
            status: CommandStatus::Pending,
            error: String::new(),
        }
    }

    pub fn authorize(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Authorize, amount)
    }

    pub fn capture(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Capture, amount)
    }

    pub fn release(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Release, amount)
    }

    pub fn charge(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Charge, amount)
    }

    pub fn refund(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Refund, amount)
    }

    pub fn deposit(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Deposit, amount)
    }

    pub fn withdraw(&self, amount: u64) -> PaymentCommand {
        self.command(CommandAction::Withdraw, amount)
    }
}
