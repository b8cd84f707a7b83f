//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    credentials::{CredentialProvider, SelectionOutcome},
    error::{Result, StudioError},
    gemini::ImageService,
    models::{Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part},
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub model: String,
    pub request: GenerateContentRequest,
}

enum Reply {
    Response(GenerateContentResponse),
    Failure(StudioError),
}

pub struct ScriptedImageService {
    reply: Mutex<Reply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedImageService {
    pub fn responding(response: GenerateContentResponse) -> Self {
        Self {
            reply: Mutex::new(Reply::Response(response)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self::responding(GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".into()),
                    parts,
                }),
                finish_reason: Some("STOP".into()),
            }],
        })
    }

    pub fn with_image(payload: &str) -> Self {
        Self::with_parts(vec![Part::image("image/png", payload)])
    }

    pub fn failing(error: StudioError) -> Self {
        Self {
            reply: Mutex::new(Reply::Failure(error)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn clone_error(error: &StudioError) -> StudioError {
    match error {
        StudioError::UpstreamError { status, message } => StudioError::upstream(*status, message.clone()),
        StudioError::NoImageInResponse => StudioError::NoImageInResponse,
        other => StudioError::upstream(None, other.to_string()),
    }
}

#[async_trait]
impl ImageService for ScriptedImageService {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            api_key: api_key.to_string(),
            model: model.to_string(),
            request: request.clone(),
        });
        match &*self.reply.lock().unwrap() {
            Reply::Response(response) => Ok(response.clone()),
            Reply::Failure(error) => Err(clone_error(error)),
        }
    }
}

/// `has_credential` answers from `present`; selection pops scripted outcomes.
pub struct ScriptedCredentials {
    present: Mutex<bool>,
    outcomes: Mutex<VecDeque<SelectionOutcome>>,
    selections: Mutex<usize>,
    has_checks: Mutex<usize>,
}

impl ScriptedCredentials {
    pub fn present() -> Self {
        Self::new(true, vec![])
    }

    pub fn new(present: bool, outcomes: Vec<SelectionOutcome>) -> Self {
        Self {
            present: Mutex::new(present),
            outcomes: Mutex::new(outcomes.into()),
            selections: Mutex::new(0),
            has_checks: Mutex::new(0),
        }
    }

    pub fn selections(&self) -> usize {
        *self.selections.lock().unwrap()
    }

    pub fn has_checks(&self) -> usize {
        *self.has_checks.lock().unwrap()
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    async fn has_credential(&self) -> Result<bool> {
        *self.has_checks.lock().unwrap() += 1;
        Ok(*self.present.lock().unwrap())
    }

    async fn select_credential(&self) -> Result<SelectionOutcome> {
        *self.selections.lock().unwrap() += 1;
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SelectionOutcome::Cancelled);
        if outcome == SelectionOutcome::Selected {
            *self.present.lock().unwrap() = true;
        }
        Ok(outcome)
    }

    fn api_key(&self) -> Option<String> {
        if *self.present.lock().unwrap() {
            Some("test-key".to_string())
        } else {
            None
        }
    }
}
