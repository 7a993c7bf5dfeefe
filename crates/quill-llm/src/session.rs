use futures::StreamExt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::assembler::assemble_messages;
use crate::error::{ChatError, Result, StreamFailure};
use crate::streaming::{accumulate, StreamEvent};
use crate::traits::{ChatClient, ChatRequest, ReplyMode, RequestParams};
use crate::types::ChatMessage;

/// Callbacks into the host application's chat view
pub trait ChatHost: Send {
    /// Append a completed message to the conversation history
    fn append_message(&mut self, message: ChatMessage);

    /// Replace the "currently streaming" display; an empty string clears it
    fn update_partial(&mut self, text: &str);

    /// Show a short notice to the user
    fn notify(&mut self, notice: &str);
}

/// Final text of a request, before it is handed to the host
struct Reply {
    text: String,
    stopped: bool,
}

/// Request manager for one chat view.
///
/// Each call to [`ChatSession::send`] appends exactly one AI message to the
/// host on success. Failures and stopped buffered requests append nothing.
/// Only one request may be in flight at a time; [`ChatSession::stop`] ends
/// it early.
pub struct ChatSession<C> {
    client: C,
    in_flight: Mutex<Option<CancellationToken>>,
}

/// Clears the in-flight slot when a request resolves, however it resolves
struct InFlight<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.slot).take();
    }
}

fn lock(slot: &Mutex<Option<CancellationToken>>) -> MutexGuard<'_, Option<CancellationToken>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: ChatClient> ChatSession<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            in_flight: Mutex::new(None),
        }
    }

    /// Whether a request is currently running
    pub fn is_busy(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Ask the in-flight request to stop.
    ///
    /// A streamed reply stops before the next event is handled and keeps the
    /// text received so far. A buffered request is abandoned and appends
    /// nothing. Returns false (and does nothing) when no request is running,
    /// so a stray stop never carries over into the next request.
    pub fn stop(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some(token) => {
                info!("stop requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Send `new_message` with `history` and deliver the reply to `host`.
    ///
    /// Resolves to the reply text, or `None` when the request was stopped.
    /// A stopped streamed reply still appends its partial text; a stopped
    /// buffered request appends nothing.
    pub async fn send<H>(
        &self,
        history: &[ChatMessage],
        new_message: &ChatMessage,
        params: &RequestParams,
        mode: ReplyMode,
        host: &mut H,
    ) -> Result<Option<String>>
    where
        H: ChatHost + ?Sized,
    {
        self.send_with_cancel(history, new_message, params, mode, host, CancellationToken::new())
            .await
    }

    /// Like [`ChatSession::send`], observing a caller-owned cancellation token
    pub async fn send_with_cancel<H>(
        &self,
        history: &[ChatMessage],
        new_message: &ChatMessage,
        params: &RequestParams,
        mode: ReplyMode,
        host: &mut H,
        cancel: CancellationToken,
    ) -> Result<Option<String>>
    where
        H: ChatHost + ?Sized,
    {
        let _in_flight = match self.begin(cancel.clone()) {
            Ok(guard) => guard,
            Err(e) => {
                host.notify(&e.user_notice());
                return Err(e);
            }
        };

        let messages = assemble_messages(history, new_message, params.system_prompt.as_deref());
        let request = params.to_request(messages);
        debug!(?mode, model = %request.model, "dispatching chat request");

        let outcome = match mode {
            ReplyMode::Buffered => self.reply_buffered(request, cancel).await,
            ReplyMode::Streaming => self.reply_streaming(request, host, cancel).await.map(Some),
        };

        match outcome {
            Ok(None) => Ok(None),
            Ok(Some(reply)) => {
                host.append_message(ChatMessage::ai(reply.text.clone()));
                host.update_partial("");
                Ok((!reply.stopped).then_some(reply.text))
            }
            Err(e) => {
                error!(
                    error = %e,
                    status = ?e.status(),
                    body = e.raw_body().unwrap_or_default(),
                    "chat request failed"
                );
                host.notify(&e.user_notice());
                Err(e)
            }
        }
    }

    fn begin(&self, cancel: CancellationToken) -> Result<InFlight<'_>> {
        let mut slot = lock(&self.in_flight);
        if slot.is_some() {
            return Err(ChatError::Busy);
        }
        *slot = Some(cancel);
        Ok(InFlight {
            slot: &self.in_flight,
        })
    }

    /// `None` when the request was abandoned by a stop
    async fn reply_buffered(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<Option<Reply>> {
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("buffered request abandoned by stop");
                return Ok(None);
            }
            text = self.client.chat(request) => text?,
        };
        Ok(Some(Reply {
            text,
            stopped: false,
        }))
    }

    async fn reply_streaming<H>(
        &self,
        request: ChatRequest,
        host: &mut H,
        cancel: CancellationToken,
    ) -> Result<Reply>
    where
        H: ChatHost + ?Sized,
    {
        let frames = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("stop requested before the stream opened");
                return Ok(Reply { text: String::new(), stopped: true });
            }
            frames = self.client.chat_stream(request) => frames?,
        };

        let mut events = accumulate(frames, cancel);
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Partial { text } => host.update_partial(&text),
                StreamEvent::Completed { text, stopped } => return Ok(Reply { text, stopped }),
            }
        }

        Err(ChatError::Stream(StreamFailure::connection(
            "stream ended without a final reply",
        )))
    }
}
