use crate::domain::command::PaymentCommand;
use crate::domain::state::ActualState;
use crate::error::Result;
use std::io::Write;

/// Writes reconciliation results as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(target),
        }
    }

    /// Writes the observed state as a header plus one record.
    pub fn write_state(&mut self, state: &ActualState) -> Result<()> {
        self.writer.write_record([
            "external_id",
            "bucket",
            "amount",
            "authorized_amount",
            "partner_amount",
            "status",
        ])?;
        self.writer.write_record([
            state.record.external_id.to_string(),
            state.record.bucket.clone(),
            state.record.amount.to_string(),
            state.record.authorized_amount.to_string(),
            state.record.partner_amount.to_string(),
            state.status.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one record per executed command.
    pub fn write_commands(&mut self, cmds: &[PaymentCommand]) -> Result<()> {
        self.writer
            .write_record(["id", "action", "amount", "attempts", "status", "error"])?;
        for cmd in cmds {
            self.writer.write_record([
                cmd.id.to_string(),
                cmd.action.to_string(),
                cmd.amount.to_string(),
                cmd.attempts.to_string(),
                cmd.status.to_string(),
                cmd.error.clone(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
