use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use bytes::{Buf, Bytes, BytesMut};
use ctrlwire_frame::{decode_message, extract_frame, split_combined, Frame, Message, Verb};
use ctrlwire_transport::{ReadMode, TcpSession, Transport, TransportError};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, MismatchField, Result};

const READ_CHUNK_SIZE: usize = 4 * 1024;
const DRAIN_CHUNK_SIZE: usize = 1024;
/// Timed-out transaction ids remembered so their late replies can be dropped.
const MAX_ABANDONED: usize = 16;

/// Callback invoked for every notification, in arrival order.
pub type NotificationHandler = Box<dyn FnMut(&Message) + Send>;

/// Lifecycle of one command inside [`CtrlClient::send_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandState {
    Idle,
    Sent,
    Awaiting,
    Completed,
    Failed,
}

struct PendingCommand {
    command: Message,
    state: CommandState,
}

impl PendingCommand {
    fn advance(&mut self, next: CommandState) {
        trace!(id = %self.command.id, from = ?self.state, to = ?next, "command state");
        self.state = next;
    }
}

/// A verified reply to a GET or SET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// The reply payload exactly as received, without the length prefix.
    pub raw: Bytes,
    pub message: Message,
}

impl CommandReply {
    pub fn id(&self) -> &str {
        &self.message.id
    }

    pub fn verb(&self) -> Verb {
        self.message.verb
    }

    pub fn variable(&self) -> &str {
        &self.message.variable
    }

    pub fn value(&self) -> Option<&str> {
        self.message.value.as_deref()
    }
}

/// Client for one control connection.
///
/// Exactly one command is in flight at a time; `send_command` takes `&mut
/// self`, so sharing a client between threads requires wrapping it in a
/// mutex. Bytes of a partially received frame are kept between calls.
pub struct CtrlClient<T: Transport = TcpSession> {
    transport: T,
    buf: BytesMut,
    config: ClientConfig,
    next_id: u32,
    abandoned: VecDeque<String>,
    on_notification: Option<NotificationHandler>,
}

impl<T: Transport> CtrlClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
            next_id: 1,
            abandoned: VecDeque::new(),
            on_notification: None,
        }
    }

    /// Route notifications to `handler` in addition to logging them.
    pub fn with_notification_handler(
        mut self,
        handler: impl FnMut(&Message) + Send + 'static,
    ) -> Self {
        self.on_notification = Some(Box::new(handler));
        self
    }

    /// Read a variable.
    pub fn get(&mut self, variable: &str) -> Result<CommandReply> {
        self.send_command(variable, None)
    }

    /// Write a variable.
    pub fn set(&mut self, variable: &str, value: &str) -> Result<CommandReply> {
        self.send_command(variable, Some(value))
    }

    /// Run one command: SET when `value` is given, GET otherwise.
    ///
    /// Queued notifications are drained first, then the command is written
    /// and frames are read until the reply arrives. The reply is checked
    /// against the command before it is returned. Nothing is retried.
    pub fn send_command(&mut self, variable: &str, value: Option<&str>) -> Result<CommandReply> {
        info!(variable, value, "sending command");
        self.drain_notifications()?;

        let verb = if value.is_some() { Verb::Set } else { Verb::Get };
        let id = self.allocate_id();
        let mut pending = PendingCommand {
            command: Message::new(id, verb, variable, value),
            state: CommandState::Idle,
        };

        let result = self.run_command(&mut pending);
        match &result {
            Ok(reply) => {
                debug!(id = %reply.id(), verb = %reply.verb(), "command completed");
                pending.advance(CommandState::Completed);
            }
            Err(err) => {
                if pending.state == CommandState::Awaiting && err.is_timeout() {
                    self.remember_abandoned(pending.command.id.clone());
                }
                warn!(id = %pending.command.id, variable, error = %err, "command failed");
                pending.advance(CommandState::Failed);
            }
        }
        result
    }

    fn run_command(&mut self, pending: &mut PendingCommand) -> Result<CommandReply> {
        let wire = pending.command.encode()?;
        self.transport.write_all(&wire)?;
        pending.advance(CommandState::Sent);

        pending.advance(CommandState::Awaiting);
        let (raw, reply) = self.await_reply(&pending.command)?;
        verify_reply(&pending.command, &reply)?;

        Ok(CommandReply {
            raw,
            message: reply,
        })
    }

    fn await_reply(&mut self, command: &Message) -> Result<(Bytes, Message)> {
        let deadline = self.deadline();
        loop {
            let frame = self.next_frame(deadline)?;
            let message = match decode_message(&frame.payload) {
                Ok(message) => message,
                Err(source) => {
                    let payload = String::from_utf8_lossy(&frame.payload).into_owned();
                    if leading_token(&frame.payload) == command.id.as_bytes() {
                        return Err(ClientError::Protocol { payload, source });
                    }
                    warn!(payload = %payload, error = %source, "dropping malformed frame");
                    continue;
                }
            };

            if message.is_notification() {
                self.notify(&message);
                continue;
            }
            if !message.verb.is_reply() {
                warn!(%message, "ignoring unexpected non-reply message");
                continue;
            }
            if message.id != command.id {
                if self.forget_abandoned(&message.id) {
                    warn!(%message, "discarding late reply to an abandoned command");
                } else {
                    warn!(
                        %message,
                        pending = %command.id,
                        "discarding reply to another transaction"
                    );
                }
                continue;
            }

            return Ok((frame.payload, message));
        }
    }

    /// Consume notifications already queued on the connection without
    /// blocking.
    ///
    /// At most `max_drain_bytes` are read. Every complete frame found is
    /// handled as a notification; stray non-TRAP frames are logged and
    /// dropped. A trailing partial frame is kept for the next read.
    pub fn drain_notifications(&mut self) -> Result<Vec<Message>> {
        let mut drained = 0usize;
        while drained < self.config.max_drain_bytes {
            let want = DRAIN_CHUNK_SIZE.min(self.config.max_drain_bytes - drained);
            let chunk = self.transport.read_available(want, ReadMode::NonBlocking)?;
            if chunk.is_empty() {
                break;
            }
            drained += chunk.len();
            self.buf.extend_from_slice(&chunk);
        }

        if self.buf.is_empty() {
            return Ok(Vec::new());
        }

        let mut notifications = Vec::new();
        let mut stray = Vec::new();
        let consumed = {
            let mut tail: &[u8] = &self.buf;
            while let Some((head, rest)) = split_combined(tail) {
                match decode_message(head) {
                    Ok(message) if message.is_notification() => notifications.push(message),
                    Ok(message) => stray.push(message),
                    Err(err) => warn!(
                        payload = %String::from_utf8_lossy(head),
                        error = %err,
                        "dropping malformed frame while draining"
                    ),
                }
                tail = rest;
            }
            self.buf.len() - tail.len()
        };
        self.buf.advance(consumed);

        if !self.buf.is_empty() {
            debug!(pending = self.buf.len(), "keeping partial frame for next read");
        }
        for message in &stray {
            self.forget_abandoned(&message.id);
            warn!(%message, "discarding stray message found while draining");
        }
        for message in &notifications {
            self.notify(message);
        }
        Ok(notifications)
    }

    /// Block until the next notification arrives.
    ///
    /// The reply timeout bounds the wait. Any other messages received in the
    /// meantime are logged and dropped.
    pub fn recv_notification(&mut self) -> Result<Message> {
        let deadline = self.deadline();
        loop {
            let frame = self.next_frame(deadline)?;
            match decode_message(&frame.payload) {
                Ok(message) if message.is_notification() => {
                    self.notify(&message);
                    return Ok(message);
                }
                Ok(message) => {
                    self.forget_abandoned(&message.id);
                    warn!(%message, "ignoring message while waiting for a notification");
                }
                Err(err) => warn!(
                    payload = %String::from_utf8_lossy(&frame.payload),
                    error = %err,
                    "dropping malformed frame"
                ),
            }
        }
    }

    /// Close the connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.buf.clear();
        self.transport.close();
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consume the client and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.reply_timeout.map(|timeout| Instant::now() + timeout)
    }

    fn next_frame(&mut self, deadline: Option<Instant>) -> Result<Frame> {
        loop {
            if let Some(frame) = extract_frame(&mut self.buf) {
                debug!(len = frame.payload.len(), "received frame");
                return Ok(frame);
            }

            let timeout = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
            let chunk = match self
                .transport
                .read_available(READ_CHUNK_SIZE, ReadMode::Blocking { timeout })
            {
                Ok(chunk) => chunk,
                Err(TransportError::Timeout { .. }) => {
                    return Err(ClientError::Timeout(
                        self.config.reply_timeout.unwrap_or_default(),
                    ))
                }
                Err(err) => return Err(err.into()),
            };
            self.buf.extend_from_slice(&chunk);
        }
    }

    fn notify(&mut self, message: &Message) {
        info!(
            id = %message.id,
            variable = %message.variable,
            value = message.value.as_deref().unwrap_or(""),
            "received notification"
        );
        if let Some(handler) = self.on_notification.as_mut() {
            handler(message);
        }
    }

    fn allocate_id(&mut self) -> String {
        let id = self.next_id;
        // 0 is left to unsolicited messages.
        self.next_id = match id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id.to_string()
    }

    fn remember_abandoned(&mut self, id: String) {
        if self.abandoned.len() == MAX_ABANDONED {
            self.abandoned.pop_front();
        }
        self.abandoned.push_back(id);
    }

    fn forget_abandoned(&mut self, id: &str) -> bool {
        match self.abandoned.iter().position(|abandoned| abandoned == id) {
            Some(index) => {
                self.abandoned.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for CtrlClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtrlClient")
            .field("transport", &self.transport)
            .field("buffered", &self.buf.len())
            .field("next_id", &self.next_id)
            .field("abandoned", &self.abandoned)
            .field("notification_handler", &self.on_notification.is_some())
            .finish()
    }
}

/// Check a reply against the command it answers.
fn verify_reply(command: &Message, reply: &Message) -> Result<()> {
    if reply.id != command.id {
        return Err(mismatch(MismatchField::TransactionId, &command.id, &reply.id));
    }

    if let Some(reason) = reply.error_reason() {
        return Err(ClientError::Rejected {
            variable: command.variable.clone(),
            reason: reason.to_string(),
        });
    }

    if let Some(expected) = command.verb.expected_reply() {
        if reply.verb != expected {
            return Err(mismatch(
                MismatchField::Verb,
                expected.as_str(),
                reply.verb.as_str(),
            ));
        }
    }

    if reply.variable != command.variable {
        return Err(mismatch(
            MismatchField::Variable,
            &command.variable,
            &reply.variable,
        ));
    }

    if let (Some(sent), Some(echoed)) = (command.value.as_deref(), reply.value.as_deref()) {
        if sent != echoed {
            return Err(mismatch(MismatchField::Value, sent, echoed));
        }
    }

    Ok(())
}

fn mismatch(field: MismatchField, expected: &str, actual: &str) -> ClientError {
    ClientError::Mismatch {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn leading_token(payload: &[u8]) -> &[u8] {
    payload.split(|b| *b == b' ').next().unwrap_or_default()
}
