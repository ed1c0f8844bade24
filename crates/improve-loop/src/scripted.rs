//! In-memory collaborators for demos and tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::model::{GeneratedFile, PromptRecord};
use crate::ports::{CredentialStore, GenerationError, GenerationService, HostView, PromptSurface};

/// Canned change requests, popped in order; `Err` entries reproduce service
/// failures. Runs dry with [`GenerationError::Exhausted`].
pub struct ScriptedGenerationService {
    script: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedGenerationService {
    pub fn new(requests: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            script: Mutex::new(requests.into_iter().map(|r| Ok(r.into())).collect()),
        }
    }

    pub fn from_script(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    /// Append a failing entry to the script.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Err(message.into()));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerationService {
    async fn next_change(
        &self,
        _files: &[GeneratedFile],
        _history: &[PromptRecord],
    ) -> Result<String, GenerationError> {
        match self.script.lock().pop_front() {
            Some(Ok(request)) => Ok(request),
            Some(Err(message)) => Err(GenerationError::Service(message)),
            None => Err(GenerationError::Exhausted),
        }
    }
}

/// Concurrent in-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, service: impl Into<String>, secret: impl Into<String>) {
        self.keys.insert(service.into(), secret.into());
    }

    pub fn remove(&self, service: &str) {
        self.keys.remove(service);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn present(&self, service: &str) -> bool {
        self.keys.contains_key(service)
    }
}

/// Records everything the loop does to the host surface.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    state: Mutex<SurfaceState>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    prompt: String,
    submissions: Vec<String>,
    views: Vec<HostView>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently sitting unsubmitted in the prompt field.
    pub fn prompt(&self) -> String {
        self.state.lock().prompt.clone()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().submissions.clone()
    }

    pub fn views(&self) -> Vec<HostView> {
        self.state.lock().views.clone()
    }
}

#[async_trait]
impl PromptSurface for RecordingSurface {
    async fn switch_view(&self, view: HostView) {
        self.state.lock().views.push(view);
    }

    async fn append_char(&self, ch: char) {
        self.state.lock().prompt.push(ch);
    }

    async fn submit(&self) {
        let mut state = self.state.lock();
        let prompt = std::mem::take(&mut state.prompt);
        state.submissions.push(prompt);
    }
}
