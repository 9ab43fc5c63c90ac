use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an observed payment state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Complete,
    Error,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(tag)
    }
}

/// Declarative target for a payment relationship at a point in time.
///
/// All monetary fields are integer minor units. `amount` and `partner_amount`
/// are signed (negative means the user was credited / the partner owes);
/// `authorized_amount` is unsigned because an authorization cannot be
/// negative.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DesiredState {
    /// Unique identifier of this declaration.
    pub id: Uuid,
    pub external_id: Uuid,
    pub user_id: Uuid,
    pub partner_id: Uuid,
    /// The instant at which this declaration is claimed to be true.
    pub date: DateTime<Utc>,
    /// Partition tag identifying a class of payment relationships.
    pub bucket: String,
    /// Net amount the user should have been charged.
    pub amount: i64,
    /// Amount that should currently be authorized but not yet captured.
    pub authorized_amount: u64,
    /// Net amount transferred to the partner.
    pub partner_amount: i64,
}

/// An observed payment state: a declaration plus the lifecycle status of the
/// observation. The `date` of the record is the instant as of which the
/// observation is valid.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ActualState {
    pub record: DesiredState,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Complete).unwrap(),
            "\"complete\""
        );
        let status: PaymentStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, PaymentStatus::Pending);
    }

    #[test]
    fn test_actual_state_round_trips_as_json() {
        let state = ActualState {
            record: DesiredState {
                id: Uuid::new_v4(),
                external_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                partner_id: Uuid::new_v4(),
                date: Utc::now(),
                bucket: "test".to_string(),
                amount: -250,
                authorized_amount: 1000,
                partner_amount: 75,
            },
            status: PaymentStatus::Complete,
        };

        let json = serde_json::to_string(&state).unwrap();
        let parsed: ActualState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
