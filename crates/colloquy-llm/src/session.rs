use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{ChatError, Result};
use crate::extract::Fragment;
use crate::request::GenerationOptions;
use crate::traits::{ChatBackend, FragmentStream};
use crate::transcript::Transcript;
use crate::types::{Role, Turn};

/// Where the most recent exchange stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

/// Drives request/response exchanges against one transcript
///
/// Exchanges take `&mut self`, so at most one is in flight per transcript.
/// A completed exchange commits the user turn and one assistant turn. A
/// failed or cancelled exchange commits nothing: the transcript is left as
/// it was before the call, even if fragments were already emitted.
pub struct Session<B> {
    backend: B,
    transcript: Transcript,
    options: GenerationOptions,
    diagnostics: Arc<dyn Diagnostics>,
    state: ExchangeState,
}

impl<B: ChatBackend> Session<B> {
    pub fn new(backend: B, options: GenerationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            backend,
            transcript: Transcript::new(),
            options,
            diagnostics: Arc::new(TracingDiagnostics),
            state: ExchangeState::Idle,
        })
    }

    /// Start from an existing transcript (restored history, seeded prompt)
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send `prompt` as a user turn and stream the reply
    ///
    /// `on_fragment` sees every fragment as soon as it is decoded. Returns
    /// the full reply, which is also committed as an assistant turn.
    pub async fn send_prompt<F>(&mut self, prompt: impl Into<String>, on_fragment: F) -> Result<String>
    where
        F: FnMut(&Fragment),
    {
        self.send_prompt_with_cancel(prompt, &CancellationToken::new(), on_fragment)
            .await
    }

    /// Like [`Session::send_prompt`], abandoning the exchange once `cancel` fires
    ///
    /// Cancellation drops the response stream, which closes the connection,
    /// and returns `ChatError::Cancelled`.
    pub async fn send_prompt_with_cancel<F>(
        &mut self,
        prompt: impl Into<String>,
        cancel: &CancellationToken,
        mut on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&Fragment),
    {
        let checkpoint = self.transcript.len();
        self.transition(ExchangeState::Requesting);
        self.transcript.append(Role::User, prompt);

        match self.run_exchange(cancel, &mut on_fragment).await {
            Ok(reply) => {
                // Return what was committed, after turn sanitizing
                let turn = Turn::assistant(reply);
                let committed = turn.content().to_string();
                self.transcript.append(turn.role(), turn.content());
                self.transition(ExchangeState::Completed);
                Ok(committed)
            }
            Err(e) => {
                self.transcript.truncate(checkpoint);
                if let ChatError::RemoteError { status, body } = &e {
                    self.diagnostics.remote_error(*status, body);
                }
                self.diagnostics.exchange_failed(&e);
                self.transition(ExchangeState::Failed);
                Err(e)
            }
        }
    }

    async fn run_exchange<F>(&mut self, cancel: &CancellationToken, on_fragment: &mut F) -> Result<String>
    where
        F: FnMut(&Fragment),
    {
        let request = self.options.build_request(&self.transcript)?;

        let mut fragments: FragmentStream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            result = self.backend.stream_reply(&request) => result?,
        };
        self.transition(ExchangeState::Streaming);

        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    on_fragment(&fragment);
                    reply.push_str(fragment.as_str());
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        Ok(reply)
    }

    fn transition(&mut self, next: ExchangeState) {
        tracing::debug!(from = ?self.state, to = ?next, "Exchange state change");
        self.state = next;
    }
}
