//! Twitch chat over IRC-on-WebSocket.
//!
//! Login flow: `CAP REQ` for tags, `PASS oauth:<token>`, `NICK <bot>`; the
//! server's `001` welcome marks the session ready. Keepalive `PING`s are
//! answered inline. Token acquisition and refresh are the caller's problem.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::irc::IrcMessage;
use super::{
    ChatConnection, ChatError, ChatEvent, ChatReplier, CommandInvocation, ReplyTarget,
    parse_command,
};

pub const TWITCH_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub url: String,
    /// Chat OAuth token, with or without the `oauth:` prefix.
    pub token: String,
    pub bot_name: String,
    pub command_prefix: String,
}

impl TwitchConfig {
    pub fn new(token: String, bot_name: String) -> Self {
        Self {
            url: TWITCH_IRC_URL.to_string(),
            token,
            bot_name,
            command_prefix: "!".to_string(),
        }
    }

    fn pass_line(&self) -> String {
        if self.token.starts_with("oauth:") {
            format!("PASS {}", self.token)
        } else {
            format!("PASS oauth:{}", self.token)
        }
    }
}

/// Write half, shared between the event loop (PONG, JOIN) and command tasks.
struct TwitchWriter {
    sink: Mutex<SplitSink<WsStream, Message>>,
}

impl TwitchWriter {
    async fn send_line(&self, line: String) -> Result<(), ChatError> {
        tracing::trace!(line = %line, "IRC >");
        self.sink
            .lock()
            .await
            .send(Message::Text(line))
            .await
            .map_err(|e| ChatError::Send(e.to_string()))
    }
}

#[async_trait]
impl ChatReplier for TwitchWriter {
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), ChatError> {
        self.send_line(reply_line(target, text)).await
    }
}

pub struct TwitchChat {
    read: SplitStream<WsStream>,
    writer: Arc<TwitchWriter>,
    pending: VecDeque<String>,
    command_prefix: String,
}

impl TwitchChat {
    pub async fn connect(config: TwitchConfig) -> Result<Self, ChatError> {
        tracing::info!(url = %config.url, bot = %config.bot_name, "Connecting to Twitch chat");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(config.url.as_str())
            .await
            .map_err(|e| ChatError::Connect(e.to_string()))?;
        let (write, read) = ws_stream.split();

        let chat = Self {
            read,
            writer: Arc::new(TwitchWriter {
                sink: Mutex::new(write),
            }),
            pending: VecDeque::new(),
            command_prefix: config.command_prefix.clone(),
        };

        chat.writer
            .send_line("CAP REQ :twitch.tv/tags twitch.tv/commands".to_string())
            .await?;
        chat.writer.send_line(config.pass_line()).await?;
        chat.writer
            .send_line(format!("NICK {}", config.bot_name.to_lowercase()))
            .await?;

        Ok(chat)
    }

    /// Translate one server line. PINGs are answered here.
    async fn handle_line(&self, line: &str) -> Result<Option<ChatEvent>, ChatError> {
        let Some(msg) = IrcMessage::parse(line) else {
            return Ok(None);
        };

        match msg.command.as_str() {
            "PING" => {
                let token = msg.trailing().unwrap_or("tmi.twitch.tv");
                self.writer.send_line(format!("PONG :{token}")).await?;
                Ok(None)
            }
            "001" => {
                tracing::info!("Twitch chat login accepted");
                Ok(Some(ChatEvent::Ready))
            }
            "NOTICE" => {
                let text = msg.trailing().unwrap_or_default();
                if text.contains("Login authentication failed")
                    || text.contains("Improperly formatted auth")
                {
                    return Err(ChatError::Connect(text.to_string()));
                }
                tracing::info!(notice = %text, "Twitch notice");
                Ok(None)
            }
            "RECONNECT" => {
                tracing::warn!("Twitch requested a reconnect");
                Err(ChatError::Closed)
            }
            "PRIVMSG" => Ok(command_event(&msg, &self.command_prefix).map(ChatEvent::Command)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ChatConnection for TwitchChat {
    async fn next_event(&mut self) -> Result<Option<ChatEvent>, ChatError> {
        loop {
            // Pop only once a line is fully handled, so a cancelled PONG
            // send is retried on the next call.
            while let Some(line) = self.pending.front().cloned() {
                let event = self.handle_line(&line).await;
                self.pending.pop_front();
                if let Some(event) = event? {
                    return Ok(Some(event));
                }
            }

            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    for line in text.split("\r\n").filter(|l| !l.is_empty()) {
                        tracing::trace!(line = %line, "IRC <");
                        self.pending.push_back(line.to_string());
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Twitch chat closed the connection");
                    return Ok(None);
                }
                Some(Ok(_)) => {} // Binary, ping/pong frames
                Some(Err(e)) => return Err(ChatError::Protocol(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn join(&mut self, channel: &str) -> Result<(), ChatError> {
        tracing::info!(channel, "Joining channel");
        self.writer
            .send_line(format!("JOIN #{}", normalize_channel(channel)))
            .await
    }

    fn replier(&self) -> Arc<dyn ChatReplier> {
        Arc::clone(&self.writer) as Arc<dyn ChatReplier>
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        let mut sink = self.writer.sink.lock().await;
        sink.close().await.map_err(|e| ChatError::Send(e.to_string()))
    }
}

fn normalize_channel(channel: &str) -> String {
    channel.trim_start_matches('#').to_lowercase()
}

fn command_event(msg: &IrcMessage, prefix: &str) -> Option<CommandInvocation> {
    let channel = msg.param(0)?;
    let text = msg.trailing()?;
    let (command, argument_text) = parse_command(text, prefix)?;

    let user_name = msg
        .tag("display-name")
        .filter(|name| !name.is_empty())
        .or_else(|| msg.nick())?
        .to_string();

    Some(CommandInvocation {
        command: command.to_string(),
        user_name,
        argument_text: argument_text.to_string(),
        target: ReplyTarget {
            channel: normalize_channel(channel),
            message_id: msg.tag("id").map(str::to_string),
        },
    })
}

fn reply_line(target: &ReplyTarget, text: &str) -> String {
    let text: String = text
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    match &target.message_id {
        Some(id) => format!(
            "@reply-parent-msg-id={} PRIVMSG #{} :{}",
            id, target.channel, text
        ),
        None => format!("PRIVMSG #{} :{}", target.channel, text),
    }
}
