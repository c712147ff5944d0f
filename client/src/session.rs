//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The protocol session: login handshake, datagram subscriptions and
//! message dispatch over one server connection.

use crate::command::format_command;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::listener::{DatagramEvent, DatagramListener, LineListener, ListenerRegistry};
use crate::subscriptions::{RequestOutcome, SubscriptionState};
use caissa_icscodec::{Datagram, IcsCodec, IcsEvent, IcsMessage, dg};
use futures::{SinkExt, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::sync::{Mutex, Notify};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

/// Where the session stands in the login procedure.
///
/// `LoggedIn` is the terminal success state; `LoginFailed` and
/// `Disconnected` are terminal failure states after which the
/// connection is unusable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoginState {
    /// No connection has been driven yet.
    NotConnected,
    /// A stream is attached; the handshake is being sent.
    Connected,
    /// Credentials are out; waiting for the server's verdict.
    AwaitingLoginResult,
    /// The server confirmed our identity.
    LoggedIn,
    /// The server rejected the login; the reason is queryable.
    LoginFailed,
    /// The connection ended.
    Disconnected,
}

impl std::fmt::Display for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginState::NotConnected => write!(f, "NotConnected"),
            LoginState::Connected => write!(f, "Connected"),
            LoginState::AwaitingLoginResult => write!(f, "AwaitingLoginResult"),
            LoginState::LoggedIn => write!(f, "LoggedIn"),
            LoginState::LoginFailed => write!(f, "LoginFailed"),
            LoginState::Disconnected => write!(f, "Disconnected"),
        }
    }
}

type SessionWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, IcsCodec>;

/// Everything mutated by more than one caller lives here, behind one
/// lock, so that each operation (including its command emission) is a
/// single critical section.
struct SessionState {
    login: LoginState,
    username: Option<String>,
    failure_reason: Option<String>,
    level1: u8,
    style: u8,
    interface: String,
    subscriptions: SubscriptionState,
    rating_categories: HashMap<i32, String>,
    wild_variants: HashMap<i32, String>,
    on_login_queue: VecDeque<String>,
    listeners: ListenerRegistry,
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        SessionState {
            login: LoginState::NotConnected,
            username: None,
            failure_reason: None,
            level1: config.level1,
            style: config.style,
            interface: config.interface.clone(),
            subscriptions: SubscriptionState::new(),
            rating_categories: HashMap::new(),
            wild_variants: HashMap::new(),
            on_login_queue: VecDeque::new(),
            listeners: ListenerRegistry::default(),
        }
    }
}

struct SessionInner {
    config: SessionConfig,
    state: Mutex<SessionState>,
    writer: Mutex<Option<SessionWriter>>,
    shutdown: Notify,
}

/// A session with a chessclub.com server.
///
/// The session is a cloneable handle. Give [`IcsSession::run`] an
/// already-connected byte stream (this layer never dials sockets) and
/// it drives the login handshake and the read loop until the
/// connection ends; every other method may be called concurrently from
/// other tasks.
#[derive(Clone)]
pub struct IcsSession {
    inner: Arc<SessionInner>,
}

/// A dispatchable unit: packets flatten to their leaves, in order,
/// carrying the outermost packet's tag.
enum Leaf {
    Line(String),
    Datagram(Datagram),
}

fn flatten(message: IcsMessage, tag: Option<String>, out: &mut Vec<(Leaf, Option<String>)>) {
    match message {
        IcsMessage::Line(text) => out.push((Leaf::Line(text), tag)),
        IcsMessage::Datagram(datagram) => out.push((Leaf::Datagram(datagram), tag)),
        IcsMessage::Packet(packet) => {
            // Only the outermost packet's tag is authoritative; inner
            // tags are ignored.
            let tag = tag.or_else(|| packet.client_tag().map(String::from));
            for item in packet.into_items() {
                flatten(item, tag.clone(), out);
            }
        }
    }
}

/// Resolves when the login deadline passes, or never when no deadline
/// applies.
async fn login_deadline_elapsed(awaiting: bool, deadline: Option<tokio::time::Instant>) {
    match (awaiting, deadline) {
        (true, Some(deadline)) => tokio::time::sleep_until(deadline).await,
        _ => std::future::pending().await,
    }
}

impl IcsSession {
    /// Creates a session with the given configuration. Nothing happens
    /// on the wire until [`IcsSession::run`] receives a stream.
    pub fn new(config: SessionConfig) -> Self {
        IcsSession {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new(&config)),
                config,
                writer: Mutex::new(None),
                shutdown: Notify::new(),
            }),
        }
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Drives the connection: sends the handshake, then decodes and
    /// dispatches messages until logout, end of stream, a fatal error
    /// or a local [`IcsSession::disconnect`].
    ///
    /// Returns `Ok(())` for a clean end of session — including a
    /// rejected login, which is a state, not an error.
    pub async fn run<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        {
            let mut state = self.inner.state.lock().await;
            match state.login {
                LoginState::NotConnected | LoginState::Disconnected => {}
                _ => return Err(SessionError::AlreadyConnected),
            }
            state.login = LoginState::Connected;
        }

        let (read_half, write_half) = tokio::io::split(stream);
        let mut framed: FramedRead<ReadHalf<S>, IcsCodec> =
            FramedRead::new(read_half, IcsCodec::new());
        {
            let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);
            *self.inner.writer.lock().await = Some(FramedWrite::new(boxed, IcsCodec::new()));
        }

        let result = self.drive(&mut framed).await;

        *self.inner.writer.lock().await = None;
        {
            let mut state = self.inner.state.lock().await;
            // Keep LoginFailed observable; everything else ends in
            // Disconnected.
            if state.login != LoginState::LoginFailed {
                state.login = LoginState::Disconnected;
            }
        }
        info!("session ended");
        result
    }

    async fn drive<S>(&self, framed: &mut FramedRead<ReadHalf<S>, IcsCodec>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        self.send_handshake().await?;

        let deadline = self
            .inner
            .config
            .login_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        loop {
            let awaiting = {
                let state = self.inner.state.lock().await;
                state.login == LoginState::AwaitingLoginResult
            };

            let next = tokio::select! {
                _ = self.inner.shutdown.notified() => {
                    debug!("local disconnect requested");
                    return Ok(());
                }
                _ = login_deadline_elapsed(awaiting, deadline) => {
                    let mut state = self.inner.state.lock().await;
                    if state.login == LoginState::AwaitingLoginResult {
                        state.login = LoginState::LoginFailed;
                        state.failure_reason =
                            Some("No login response from the server".to_string());
                    }
                    return Err(SessionError::LoginTimeout);
                }
                next = framed.next() => next,
            };

            match next {
                Some(Ok(IcsEvent::Message(message))) => self.handle_message(message).await?,
                Some(Ok(IcsEvent::Logout)) => {
                    info!("server sent clean logout");
                    return Ok(());
                }
                Some(Err(err)) => {
                    warn!(error = %err, "stream decoding failed");
                    return Err(err.into());
                }
                None => {
                    info!("server closed the connection");
                    return Ok(());
                }
            }
        }
    }

    /// Sends the connect-time lines: the level1 mode, the accumulated
    /// level2 settings and the login credentials.
    async fn send_handshake(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let level1_line = format!("level1={}", state.level1);
        self.write_line(&level1_line, true).await?;

        let settings_line = state.subscriptions.settings_line();
        self.write_line(&settings_line, true).await?;
        state.subscriptions.mark_handshake_sent();

        let config = &self.inner.config;
        if config.password.is_empty() {
            self.write_line(&config.username, true).await?;
        } else {
            let login_line = format!("{} {}", config.username, config.password);
            // Never log the password.
            self.write_line(&login_line, false).await?;
        }

        state.login = LoginState::AwaitingLoginResult;
        Ok(())
    }

    /// Dispatches one decoded message: the session inspects datagrams
    /// first, then registered listeners are notified, in arrival order.
    async fn handle_message(&self, message: IcsMessage) -> Result<()> {
        let mut leaves = Vec::new();
        flatten(message, None, &mut leaves);

        for (leaf, tag) in leaves {
            match leaf {
                Leaf::Line(text) => {
                    trace!(line = %text, "received line");
                    let listeners = {
                        let state = self.inner.state.lock().await;
                        state.listeners.line_listeners()
                    };
                    for listener in listeners {
                        listener.line_received(&text, tag.as_deref()).await;
                    }
                }
                Leaf::Datagram(datagram) => {
                    trace!(datagram = %datagram, "received datagram");
                    self.intercept(&datagram).await?;
                    let listeners = {
                        let state = self.inner.state.lock().await;
                        state.listeners.datagram_listeners(datagram.id())
                    };
                    if !listeners.is_empty() {
                        let event = DatagramEvent::new(datagram, tag);
                        for listener in listeners {
                            listener.datagram_received(&event).await;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Session-level interception of datagrams the state machine
    /// depends on. Runs before listener notification.
    async fn intercept(&self, datagram: &Datagram) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        match datagram.id() {
            // Identity confirmation decides the login; whichever of
            // WHO_AM_I / LOGIN_FAILED arrives first wins, the other is
            // ignored.
            dg::WHO_AM_I if state.login == LoginState::AwaitingLoginResult => {
                let username = datagram.string_at(0).to_string();
                info!(username = %username, "login succeeded");
                state.username = Some(username);
                state.login = LoginState::LoggedIn;
                self.post_login(&mut state).await?;
            }
            dg::LOGIN_FAILED if state.login == LoginState::AwaitingLoginResult => {
                let reason = datagram.string_at(1).to_string();
                warn!(reason = %reason, "login failed");
                state.failure_reason = Some(reason);
                state.login = LoginState::LoginFailed;
            }
            dg::RATING_TYPE_KEY => {
                state
                    .rating_categories
                    .insert(datagram.int_at(0), datagram.string_at(1).to_string());
            }
            dg::WILD_KEY => {
                state
                    .wild_variants
                    .insert(datagram.int_at(0), datagram.string_at(1).to_string());
            }
            dg::SET2 => {
                let id = datagram.int_at(0);
                if (0..dg::DG_TABLE_SIZE as i32).contains(&id) {
                    state.subscriptions.apply_ack(id as u16, datagram.bool_at(1));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Runs once, right after the identity confirmation: reconciles
    /// subscription changes made while logging in, applies the fixed
    /// post-login settings and flushes the queued commands in order.
    async fn post_login(&self, state: &mut SessionState) -> Result<()> {
        for (id, wanted) in state.subscriptions.pending_changes() {
            let command = format!("set-2 {} {}", id, if wanted { "1" } else { "0" });
            let line = format_command(&command, true, None, state.level1)?;
            self.write_line(&line, true).await?;
        }

        let fixed = [
            "set-quietly prompt 0".to_string(),
            "set-quietly highlight 0".to_string(),
            format!("set-quietly style {}", state.style),
            format!("set-quietly interface {}", state.interface),
        ];
        for command in fixed {
            let line = format_command(&command, true, None, state.level1)?;
            self.write_line(&line, true).await?;
        }

        while let Some(queued) = state.on_login_queue.pop_front() {
            self.write_line(&queued, true).await?;
        }
        Ok(())
    }

    /// Writes one already-formatted line to the server. The writer lock
    /// serializes concurrent senders so lines never interleave.
    async fn write_line(&self, line: &str, log: bool) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        let Some(framed) = writer.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        if log {
            debug!(command = %line, "sending command");
        }
        framed.send(line).await?;
        Ok(())
    }

    /// Sends a command to the server.
    ///
    /// With `when_logged_in` set and login not yet decided, the command
    /// is queued and flushed (in submission order) right after login
    /// succeeds. `avoid_aliasing` guards the command against
    /// server-side alias expansion; `tag` attaches a correlation tag so
    /// the response packet can be matched back (requires a level1 mode
    /// with tagging).
    pub async fn send_command(
        &self,
        command: &str,
        when_logged_in: bool,
        avoid_aliasing: bool,
        tag: Option<&str>,
    ) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let line = format_command(command, avoid_aliasing, tag, state.level1)?;
        if state.login == LoginState::LoggedIn || !when_logged_in {
            self.write_line(&line, true).await
        } else {
            state.on_login_queue.push_back(line);
            Ok(())
        }
    }

    /// Sends the `exit` command, asking the server for a clean logout.
    pub async fn exit(&self) -> Result<()> {
        self.send_command("exit", true, true, None).await
    }

    /// Unblocks the read loop and ends the session locally.
    pub fn disconnect(&self) {
        self.inner.shutdown.notify_one();
    }

    /// Requests a datagram on or off.
    ///
    /// Prefer registering a [`DatagramListener`] — this is the
    /// low-level mechanism under it. Returns `Ok(false)` when the
    /// change is refused because the datagram is essential.
    pub async fn set_datagram_state(&self, id: u16, wanted: bool) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        self.apply_dg_request(&mut state, id, wanted).await
    }

    async fn apply_dg_request(
        &self,
        state: &mut SessionState,
        id: u16,
        wanted: bool,
    ) -> Result<bool> {
        match state.subscriptions.request(id, wanted) {
            RequestOutcome::Rejected => Ok(false),
            RequestOutcome::Batched => Ok(true),
            RequestOutcome::NeedsCommand => {
                if state.login == LoginState::LoggedIn {
                    let command = format!("set-2 {} {}", id, if wanted { "1" } else { "0" });
                    let line = format_command(&command, true, None, state.level1)?;
                    self.write_line(&line, true).await?;
                }
                // Between handshake and login the change is deferred;
                // post_login reconciles it.
                Ok(true)
            }
        }
    }

    /// Re-sends `set-2` for a datagram that is already on. Some
    /// datagrams only resend their full state on a fresh `set-2`
    /// (NOTIFY_ARRIVED for example), so this forces a refresh.
    pub async fn refresh_datagram(&self, id: u16, tag: Option<&str>) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if !state.subscriptions.is_acknowledged(id) {
            return Err(SessionError::DatagramNotOn(id));
        }
        if state.login != LoginState::LoggedIn {
            return Err(SessionError::NotConnected);
        }
        let line = format_command(&format!("set-2 {} 1", id), true, tag, state.level1)?;
        drop(state);
        self.write_line(&line, true).await
    }

    /// Registers a listener for a datagram id. The first listener for
    /// an id turns that datagram on with the server.
    pub async fn add_datagram_listener(
        &self,
        id: u16,
        listener: Arc<dyn DatagramListener>,
    ) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.listeners.add_datagram(id, listener) {
            self.apply_dg_request(&mut state, id, true).await?;
        }
        Ok(())
    }

    /// Removes a datagram listener. Removing the last listener for an
    /// id turns the datagram off again, unless it is essential.
    pub async fn remove_datagram_listener(
        &self,
        id: u16,
        listener: &Arc<dyn DatagramListener>,
    ) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.listeners.remove_datagram(id, listener) {
            self.apply_dg_request(&mut state, id, false).await?;
        }
        Ok(())
    }

    /// Registers a listener for plain text lines.
    pub async fn add_line_listener(&self, listener: Arc<dyn LineListener>) {
        let mut state = self.inner.state.lock().await;
        state.listeners.add_line(listener);
    }

    /// Removes a line listener.
    pub async fn remove_line_listener(&self, listener: &Arc<dyn LineListener>) {
        let mut state = self.inner.state.lock().await;
        state.listeners.remove_line(listener);
    }

    /// Current login state.
    pub async fn login_state(&self) -> LoginState {
        self.inner.state.lock().await.login
    }

    /// The canonical username the server confirmed at login. `None`
    /// until login succeeds.
    pub async fn username(&self) -> Option<String> {
        self.inner.state.lock().await.username.clone()
    }

    /// The server's reason for a rejected login, once the session is
    /// in the `LoginFailed` state.
    pub async fn login_failure_reason(&self) -> Option<String> {
        self.inner.state.lock().await.failure_reason.clone()
    }

    /// Whether the server currently has the given datagram turned on.
    /// Reflects acknowledgments, not in-flight requests.
    pub async fn is_dg_on(&self, id: u16) -> bool {
        self.inner.state.lock().await.subscriptions.is_acknowledged(id)
    }

    /// The name of a rating category, as announced by the server during
    /// login. `None` until the announcement arrives.
    pub async fn rating_category_name(&self, index: i32) -> Option<String> {
        self.inner.state.lock().await.rating_categories.get(&index).cloned()
    }

    /// The name of a wild variant, as announced by the server during
    /// login. `None` until the announcement arrives.
    pub async fn wild_variant_name(&self, number: i32) -> Option<String> {
        self.inner.state.lock().await.wild_variants.get(&number).cloned()
    }

    /// The current level1 mode.
    pub async fn level1(&self) -> u8 {
        self.inner.state.lock().await.level1
    }

    /// Sets the level1 mode. Modes with the second lowest bit set (the
    /// `^Y<`/`^Y>` delimiters) are not supported by the decoder.
    pub async fn set_level1(&self, level1: u8) -> Result<()> {
        if level1 & 0b10 != 0 {
            return Err(SessionError::UnsupportedLevel1(level1));
        }
        let mut state = self.inner.state.lock().await;
        state.level1 = level1;
        if state.login == LoginState::LoggedIn {
            let line = format_command(&format!("set level1 {}", level1), true, None, level1)?;
            self.write_line(&line, true).await?;
        }
        Ok(())
    }

    /// Sets the board sending style; applied immediately when logged
    /// in, otherwise at the next login.
    pub async fn set_style(&self, style: u8) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.style = style;
        if state.login == LoginState::LoggedIn {
            let line =
                format_command(&format!("set-quietly style {}", style), true, None, state.level1)?;
            self.write_line(&line, true).await?;
        }
        Ok(())
    }

    /// Sets the interface-identifier string sent at login. Only valid
    /// before login completes.
    pub async fn set_interface(&self, interface: impl Into<String>) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.login == LoginState::LoggedIn {
            return Err(SessionError::AlreadyLoggedIn);
        }
        state.interface = interface.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caissa_icscodec::{DgField, Packet};

    fn datagram(id: u16, fields: Vec<DgField>) -> IcsMessage {
        IcsMessage::Datagram(Datagram::new(id, fields))
    }

    #[test]
    fn flatten_preserves_item_order_and_outermost_tag() {
        let inner = Packet::new(
            101,
            "Morphy",
            Some("inner".into()),
            vec![datagram(0, vec![
                DgField::Str("Morphy".into()),
                DgField::Str("GM".into()),
            ])],
        );
        let outer = Packet::new(
            100,
            "Morphy",
            Some("outer".into()),
            vec![
                IcsMessage::Packet(inner),
                IcsMessage::Line("sibling".into()),
            ],
        );

        let mut leaves = Vec::new();
        flatten(IcsMessage::Packet(outer), None, &mut leaves);

        assert_eq!(leaves.len(), 2);
        let (first, first_tag) = &leaves[0];
        assert!(matches!(first, Leaf::Datagram(_)));
        assert_eq!(first_tag.as_deref(), Some("outer"));
        let (second, second_tag) = &leaves[1];
        match second {
            Leaf::Line(text) => assert_eq!(text, "sibling"),
            Leaf::Datagram(_) => panic!("expected line"),
        }
        assert_eq!(second_tag.as_deref(), Some("outer"));
    }

    #[test]
    fn flatten_keeps_untagged_messages_untagged() {
        let mut leaves = Vec::new();
        flatten(IcsMessage::Line("plain".into()), None, &mut leaves);
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].1.is_none());
    }
}
