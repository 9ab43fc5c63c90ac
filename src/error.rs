use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug, Diagnostic)]
pub enum PaymentError {
    #[error("underflow detected")]
    #[diagnostic(
        code(payment::underflow),
        help("an authorized amount above i64::MAX indicates a wrapped computation")
    )]
    Underflow,

    #[error("cannot resolve payment states for different buckets")]
    #[diagnostic(code(payment::different_bucket))]
    DifferentBucket,

    #[error("cannot resolve payment states for different users")]
    #[diagnostic(code(payment::different_user))]
    DifferentUser,

    #[error("cannot resolve payment states for different partners")]
    #[diagnostic(code(payment::different_partner))]
    DifferentPartner,

    #[error("date of desired state is in the future")]
    #[diagnostic(code(payment::date_in_future))]
    DateInFuture,

    #[error("desired state date is not the most current")]
    #[diagnostic(code(payment::later_state_applied))]
    LaterStateApplied,

    #[error(transparent)]
    #[diagnostic(code(payment::provider_error))]
    Provider(#[from] ProviderError),

    #[error("worker task failed")]
    #[diagnostic(code(payment::task_error))]
    Task(#[from] tokio::task::JoinError),

    #[error("CSV processing error")]
    #[diagnostic(code(payment::csv_error), help("Ensure the CSV format is correct"))]
    Csv(#[from] csv::Error),

    #[error("I/O error")]
    #[diagnostic(code(payment::io_error))]
    Io(#[from] std::io::Error),
}

/// Marker wrapped by provider failures that are safe to re-submit with the
/// same idempotency key.
#[derive(Error, Debug)]
#[error("retryable")]
pub struct Retryable;

/// A failure reported by a payment provider.
///
/// Providers wrap transient upstream failures around [`Retryable`]; the engine
/// detects the marker anywhere in the source chain rather than matching on
/// message text.
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A transient failure; the command may be re-submitted unchanged.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(Retryable)),
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True if [`Retryable`] appears anywhere in this error's source chain.
    pub fn is_retryable(&self) -> bool {
        let mut current: Option<&(dyn std::error::Error + 'static)> = self
            .source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static));
        while let Some(err) = current {
            if err.downcast_ref::<Retryable>().is_some() {
                return true;
            }
            current = err.source();
        }
        false
    }
}
