use crate::domain::state::DesiredState;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

/// One CSV row declaring a desired state. The declaration id may be omitted,
/// in which case a fresh one is generated; balance columns default to zero.
#[derive(Debug, Deserialize)]
struct DesiredStateRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    external_id: Uuid,
    user_id: Uuid,
    partner_id: Uuid,
    date: DateTime<Utc>,
    bucket: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    authorized_amount: u64,
    #[serde(default)]
    partner_amount: i64,
}

impl From<DesiredStateRecord> for DesiredState {
    fn from(record: DesiredStateRecord) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id,
            user_id: record.user_id,
            partner_id: record.partner_id,
            date: record.date,
            bucket: record.bucket,
            amount: record.amount,
            authorized_amount: record.authorized_amount,
            partner_amount: record.partner_amount,
        }
    }
}

/// Reads desired-state declarations from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<DesiredState>`,
/// trimming whitespace and tolerating flexible record lengths.
pub struct DesiredStateReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> DesiredStateReader<R> {
    /// Creates a new `DesiredStateReader` from any `Read` source.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes declarations.
    pub fn declarations(self) -> impl Iterator<Item = Result<DesiredState>> {
        self.reader
            .into_deserialize::<DesiredStateRecord>()
            .map(|result| result.map(DesiredState::from).map_err(PaymentError::from))
    }
}
