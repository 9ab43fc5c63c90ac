use crate::domain::command::{CommandAction, CommandStatus, PaymentCommand};
use crate::domain::ports::{PartnerProvider, UserProvider};
use crate::domain::resolver;
use crate::domain::state::{ActualState, DesiredState};
use crate::error::{PaymentError, ProviderError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Indices of the one capture and one release command dispatched through a
/// single `capture_release` provider call.
#[derive(Debug, Clone, Copy)]
struct FusionPair {
    capture: usize,
    release: usize,
}

impl FusionPair {
    /// Arms fusion iff the batch contains at least one capture and at least
    /// one release; the first of each is paired.
    fn scan(cmds: &[PaymentCommand]) -> Option<Self> {
        let capture = cmds
            .iter()
            .position(|cmd| cmd.action == CommandAction::Capture)?;
        let release = cmds
            .iter()
            .position(|cmd| cmd.action == CommandAction::Release)?;
        Some(Self { capture, release })
    }
}

/// Executes reconciliation plans against a pair of payment providers while
/// tracking the observed state of one payment relationship.
///
/// The engine owns the observed [`ActualState`] exclusively; it mutates it
/// only under a write lock and only for commands the provider confirmed.
/// Readers get owned snapshots via [`current_state`](Self::current_state).
pub struct ReconciliationEngine<U, P> {
    user: Arc<U>,
    partner: Arc<P>,
    state: Arc<RwLock<ActualState>>,
    // Relationship identifiers never change after construction.
    user_id: Uuid,
    partner_id: Uuid,
    external_id: Uuid,
    bucket: String,
}

impl<U, P> ReconciliationEngine<U, P>
where
    U: UserProvider + 'static,
    P: PartnerProvider + 'static,
{
    pub fn new(current: ActualState, user: U, partner: P) -> Self {
        Self {
            user_id: current.record.user_id,
            partner_id: current.record.partner_id,
            external_id: current.record.external_id,
            bucket: current.record.bucket.clone(),
            user: Arc::new(user),
            partner: Arc::new(partner),
            state: Arc::new(RwLock::new(current)),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn partner_id(&self) -> Uuid {
        self.partner_id
    }

    pub fn external_id(&self) -> Uuid {
        self.external_id
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns an owned snapshot of the observed state.
    pub async fn current_state(&self) -> ActualState {
        self.state.read().await.clone()
    }

    /// Plans the commands that would bring the observed state to `desired`.
    ///
    /// Pure with respect to the engine: reads a snapshot, mutates nothing.
    pub async fn generate_resolution(&self, desired: &DesiredState) -> Result<Vec<PaymentCommand>> {
        let snapshot = self.state.read().await;
        resolver::generate_resolution(&snapshot, desired)
    }

    /// Dispatches every command in `cmds` against the providers, one worker
    /// per command, all concurrent, all joined before returning.
    ///
    /// Each command's `attempts` is incremented exactly once and its status
    /// leaves `Pending` for `Complete`, `Error` (retryable) or `Failed`
    /// (terminal). Commands keep their input indices in the returned vector.
    /// The observed state is only mutated for confirmed commands, under the
    /// write lock, with no lock held across a provider call.
    ///
    /// If the batch contains both a capture and a release, the first of each
    /// is fused into a single `capture_release` provider call; see
    /// [`UserProvider::capture_release`].
    ///
    /// Not reentrant: callers must not overlap two `run` calls on one engine.
    pub async fn run(&self, cmds: Vec<PaymentCommand>) -> (Vec<PaymentCommand>, Vec<PaymentError>) {
        let fusion = FusionPair::scan(&cmds);
        let count = cmds.len();
        tracing::debug!(commands = count, fused = fusion.is_some(), "dispatching batch");

        let cmds = Arc::new(Mutex::new(cmds));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let worker = CommandWorker {
                index,
                fusion,
                user: Arc::clone(&self.user),
                partner: Arc::clone(&self.partner),
                state: Arc::clone(&self.state),
                cmds: Arc::clone(&cmds),
                errors: Arc::clone(&errors),
            };
            workers.push(tokio::spawn(worker.run()));
        }
        for handle in workers {
            if let Err(err) = handle.await {
                errors.lock().await.push(PaymentError::Task(err));
            }
        }

        let cmds = std::mem::take(&mut *cmds.lock().await);
        let errors = std::mem::take(&mut *errors.lock().await);
        (cmds, errors)
    }
}

/// One worker per command in a `run` batch.
struct CommandWorker<U, P> {
    index: usize,
    fusion: Option<FusionPair>,
    user: Arc<U>,
    partner: Arc<P>,
    state: Arc<RwLock<ActualState>>,
    cmds: Arc<Mutex<Vec<PaymentCommand>>>,
    errors: Arc<Mutex<Vec<PaymentError>>>,
}

impl<U, P> CommandWorker<U, P>
where
    U: UserProvider,
    P: PartnerProvider,
{
    async fn run(self) {
        let action = {
            let mut cmds = self.cmds.lock().await;
            let cmd = &mut cmds[self.index];
            cmd.attempts += 1;
            cmd.action
        };

        match self.fusion {
            Some(fusion) if fusion.capture == self.index => self.run_fused(fusion).await,
            Some(fusion) if fusion.release == self.index => {
                // The capture worker dispatches the pair and writes both
                // outcomes; this worker only accounts for the attempt.
            }
            Some(_) if matches!(action, CommandAction::Capture | CommandAction::Release) => {
                // Fusion is armed but this command is not part of the chosen
                // pair; it stays untouched for a later batch.
                tracing::debug!(index = self.index, "extra capture/release left out of fused batch");
            }
            _ => self.run_solo(action).await,
        }
    }

    async fn run_solo(&self, action: CommandAction) {
        let cmd = {
            let mut cmds = self.cmds.lock().await;
            let cmd = &mut cmds[self.index];
            cmd.error.clear();
            cmd.clone()
        };
        let key = cmd.idempotency_key();

        let result = match action {
            CommandAction::Authorize => self.user.authorize(&key, cmd.amount).await,
            CommandAction::Capture => self.user.capture(&key, cmd.amount).await,
            CommandAction::Release => self.user.release(&key, cmd.amount).await,
            CommandAction::Charge => self.user.charge(&key, cmd.amount).await,
            CommandAction::Refund => self.user.refund(&key, cmd.amount).await,
            CommandAction::Deposit => self.partner.deposit(&key, cmd.amount).await,
            CommandAction::Withdraw => self.partner.withdraw(&key, cmd.amount).await,
        };

        if result.is_ok() {
            let mut state = self.state.write().await;
            cmd.apply_to(&mut state.record);
        }
        self.finish(self.index, result).await;
    }

    async fn run_fused(&self, fusion: FusionPair) {
        let (capture, release) = {
            let mut cmds = self.cmds.lock().await;
            cmds[fusion.capture].error.clear();
            cmds[fusion.release].error.clear();
            (cmds[fusion.capture].clone(), cmds[fusion.release].clone())
        };

        // The provider learns both intents at once; each sub-operation keeps
        // the idempotency key of its original command.
        let (capture_result, release_result) = self
            .user
            .capture_release(
                &capture.idempotency_key(),
                capture.amount,
                &release.idempotency_key(),
                release.amount,
            )
            .await;

        if capture_result.is_ok() {
            let mut state = self.state.write().await;
            capture.apply_to(&mut state.record);
        }
        if release_result.is_ok() {
            let mut state = self.state.write().await;
            release.apply_to(&mut state.record);
        }
        self.finish(fusion.capture, capture_result).await;
        self.finish(fusion.release, release_result).await;
    }

    async fn finish(&self, index: usize, result: std::result::Result<(), ProviderError>) {
        match result {
            Ok(()) => {
                let mut cmds = self.cmds.lock().await;
                let cmd = &mut cmds[index];
                cmd.status = CommandStatus::Complete;
                cmd.error.clear();
            }
            Err(err) => {
                let retryable = err.is_retryable();
                {
                    let mut cmds = self.cmds.lock().await;
                    let cmd = &mut cmds[index];
                    cmd.status = if retryable {
                        CommandStatus::Error
                    } else {
                        CommandStatus::Failed
                    };
                    cmd.error = err.to_string();
                    tracing::warn!(
                        command = %cmd.id,
                        action = ?cmd.action,
                        retryable,
                        "provider call failed: {err}"
                    );
                }
                self.errors.lock().await.push(PaymentError::Provider(err));
            }
        }
    }
}
