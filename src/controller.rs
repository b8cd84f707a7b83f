//! Credit-gated generation flow.
//!
//! `submit` takes the current [`ControllerState`] and returns the next one;
//! nothing is mutated in place. The order of steps is fixed: credit gate,
//! credential gate, image call, debit, change notification, history append.
//! Anything failing after the credit gate leaves the account and the history
//! untouched.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    credentials::{CredentialProvider, SelectionOutcome},
    error::{Result, StudioError, GENERIC_FAILURE_MESSAGE},
    events::{AccountChanged, AccountEvents},
    gemini::ImageClient,
    models::{Account, GenerationRequest, GenerationResult, HistoryEntry, NewHistoryEntry},
    storage::{AccountStore, HistoryStore, StorageManager},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Idle,
    /// Waiting on the credential gate.
    Checking,
    /// Image request in flight.
    Generating,
    Success(GenerationResult),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    pub account: Option<Account>,
    pub status: GenerationStatus,
    pub error: Option<String>,
    pub busy: bool,
}

impl ControllerState {
    pub fn idle(account: Option<Account>) -> Self {
        Self {
            account,
            status: GenerationStatus::Idle,
            error: None,
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn balance(&self) -> Option<u64> {
        self.account.as_ref().map(|account| account.credit_balance)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match &self.status {
            GenerationStatus::Success(result) => Some(result),
            _ => None,
        }
    }

    fn rejected(&self, error: &StudioError) -> Self {
        Self {
            error: Some(error.user_message()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    pub account: Account,
    /// `None` if the image was paid for but the history write failed.
    pub history_entry: Option<HistoryEntry>,
}

pub struct GenerationController {
    image_client: ImageClient,
    credentials: Arc<dyn CredentialProvider>,
    accounts: Arc<dyn AccountStore>,
    history: Arc<dyn HistoryStore>,
    events: AccountEvents,
    cost: u64,
}

impl GenerationController {
    pub fn new(
        image_client: ImageClient,
        credentials: Arc<dyn CredentialProvider>,
        storage: &StorageManager,
        events: AccountEvents,
        cost: u64,
    ) -> Self {
        Self {
            image_client,
            credentials,
            accounts: storage.accounts(),
            history: storage.history(),
            events,
            cost,
        }
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn events(&self) -> &AccountEvents {
        &self.events
    }

    pub async fn mount(&self, account_id: &str) -> Result<ControllerState> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| StudioError::AccountNotFound(account_id.to_string()))?;
        log::info!(
            "Mounted account {} with {} credits",
            account.id,
            account.credit_balance
        );
        Ok(ControllerState::idle(Some(account)))
    }

    /// Re-reads the account, e.g. after an [`AccountChanged`] event.
    pub async fn refresh(&self, state: &ControllerState) -> Result<ControllerState> {
        let account = match &state.account {
            Some(account) => self.accounts.get(&account.id).await?,
            None => None,
        };
        Ok(ControllerState {
            account,
            ..state.clone()
        })
    }

    pub async fn history(&self, account_id: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        self.history.list(account_id, limit).await
    }

    pub async fn submit(&self, state: &ControllerState, request: GenerationRequest) -> ControllerState {
        self.submit_observed(state, request, |_| {}).await
    }

    /// Like [`submit`](Self::submit), reporting each in-flight state to `observer`.
    pub async fn submit_observed<F>(
        &self,
        state: &ControllerState,
        request: GenerationRequest,
        mut observer: F,
    ) -> ControllerState
    where
        F: FnMut(&ControllerState) + Send,
    {
        if state.is_busy() {
            return state.rejected(&StudioError::Busy);
        }
        if let Err(e) = request.validate() {
            return state.rejected(&e);
        }
        let account = match &state.account {
            Some(account) => account.clone(),
            None => return state.rejected(&StudioError::AccountNotFound("no account loaded".into())),
        };
        if let Err(e) = self.check_credits(&account) {
            log::warn!("{}", e);
            return state.rejected(&e);
        }

        let in_flight = |status: GenerationStatus| ControllerState {
            account: Some(account.clone()),
            status,
            error: None,
            busy: true,
        };

        observer(&in_flight(GenerationStatus::Checking));
        let outcome = self
            .run(&account, &request, &mut |status: GenerationStatus| {
                observer(&in_flight(status))
            })
            .await;

        match outcome {
            Ok(outcome) => ControllerState {
                account: Some(outcome.account),
                status: GenerationStatus::Success(outcome.result),
                error: None,
                busy: false,
            },
            Err(e) => {
                log::error!("Generation failed for account {}: {}", account.id, e);
                // The held balance may be stale; show what the store has now.
                let reread = self.accounts.get(&account.id).await;
                let account = match reread {
                    Ok(Some(current)) => current,
                    Ok(None) => account,
                    Err(read_err) => {
                        log::warn!("Could not re-read account {}: {}", account.id, read_err);
                        account
                    }
                };
                ControllerState {
                    account: Some(account),
                    status: GenerationStatus::Failed,
                    error: Some(GENERIC_FAILURE_MESSAGE.to_string()),
                    busy: false,
                }
            }
        }
    }

    /// Full flow against the stored account, for callers that want typed errors.
    pub async fn generate(&self, account_id: &str, request: GenerationRequest) -> Result<GenerationOutcome> {
        request.validate()?;
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| StudioError::AccountNotFound(account_id.to_string()))?;
        self.check_credits(&account)?;
        self.run(&account, &request, &mut |_: GenerationStatus| {})
            .await
    }

    fn check_credits(&self, account: &Account) -> Result<()> {
        if account.can_afford(self.cost) {
            Ok(())
        } else {
            Err(StudioError::InsufficientCredits {
                required: self.cost,
                available: account.credit_balance,
            })
        }
    }

    async fn run(
        &self,
        account: &Account,
        request: &GenerationRequest,
        on_status: &mut (dyn FnMut(GenerationStatus) + Send),
    ) -> Result<GenerationOutcome> {
        self.ensure_credential().await?;

        on_status(GenerationStatus::Generating);
        let api_key = self.credentials.api_key();
        let result = self
            .image_client
            .generate(request, api_key.as_deref())
            .await?;

        let updated = self.accounts.debit(&account.id, self.cost).await?;
        log::info!(
            "Debited {} credits from {}, {} remaining",
            self.cost,
            updated.id,
            updated.credit_balance
        );
        self.events.publish(AccountChanged {
            account_id: updated.id.clone(),
            credit_balance: updated.credit_balance,
            at: Utc::now(),
        });

        let history_entry = match self
            .history
            .append(NewHistoryEntry {
                account_id: updated.id.clone(),
                prompt: request.prompt.clone(),
                image_reference: result.image_reference.clone(),
                model_identifier: self.image_client.model().to_string(),
                resolution: request.resolution,
            })
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::error!("Failed to record history for {}: {}", updated.id, e);
                None
            }
        };

        Ok(GenerationOutcome {
            result,
            account: updated,
            history_entry,
        })
    }

    async fn ensure_credential(&self) -> Result<()> {
        if self.credentials.has_credential().await? {
            return Ok(());
        }

        log::info!("No API key selected, starting key selection");
        let mut outcome = self.credentials.select_credential().await?;
        if outcome == SelectionOutcome::EntityNotFound {
            log::warn!("Selected key was not found, retrying selection");
            outcome = self.credentials.select_credential().await?;
        }

        match outcome {
            SelectionOutcome::Selected => Ok(()),
            SelectionOutcome::EntityNotFound => Err(StudioError::CredentialMissing(
                "selected API key was not found".into(),
            )),
            SelectionOutcome::Cancelled => Err(StudioError::CredentialMissing(
                "API key selection was cancelled".into(),
            )),
        }
    }
}
