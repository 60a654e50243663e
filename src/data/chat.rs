use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::data::scope::Scope;
use crate::data::types::ChatMessage;

/// Per-market chat endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch(&self, market_id: &str) -> Result<Vec<ChatMessage>>;

    async fn post(&self, market_id: &str, address: &str, message: &str) -> Result<ChatMessage>;
}

pub struct ChatClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatListResponse {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatPostBody<'a> {
    address: &'a str,
    message: &'a str,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chat_url(&self, market_id: &str) -> String {
        format!("{}/api/market/{}/chat", self.base_url, market_id)
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn fetch(&self, market_id: &str) -> Result<Vec<ChatMessage>> {
        let response: ChatListResponse = self.client
            .get(self.chat_url(market_id))
            .header("Cache-Control", "no-store")
            .send()
            .await
            .context("Failed to fetch chat messages")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse chat messages")?;

        Ok(response.messages)
    }

    async fn post(&self, market_id: &str, address: &str, message: &str) -> Result<ChatMessage> {
        let saved: ChatMessage = self.client
            .post(self.chat_url(market_id))
            .json(&ChatPostBody { address, message })
            .send()
            .await
            .context("Failed to send chat message")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse saved chat message")?;

        Ok(saved)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Connect a wallet to send messages")]
    NoWallet,

    #[error("Chat request failed: {0}")]
    Remote(#[from] anyhow::Error),
}

/// Messages of one market in arrival order, deduplicated by identity.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server id when present, otherwise author + time + text.
    fn key(message: &ChatMessage) -> String {
        match &message.id {
            Some(id) => format!("id:{}", id),
            None => format!(
                "{}|{}|{}",
                message.address,
                message.timestamp.to_rfc3339(),
                message.message
            ),
        }
    }

    /// Append messages not seen before; returns how many were new.
    pub fn merge<I: IntoIterator<Item = ChatMessage>>(&mut self, incoming: I) -> usize {
        let mut added = 0;
        for message in incoming {
            if self.seen.insert(Self::key(&message)) {
                self.messages.push(message);
                added += 1;
            }
        }
        added
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Chat panel bound to one market at a time.
///
/// Polling starts immediately and repeats on `interval`. Switching market or
/// dropping the session cancels the poller; fetches that land afterwards are
/// discarded.
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    interval: Duration,
    market_id: String,
    log: Arc<Mutex<ChatLog>>,
    scope: Scope,
    poller: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Must be called from within a tokio runtime.
    pub fn start(api: Arc<dyn ChatApi>, market_id: &str, interval: Duration) -> Self {
        let mut session = Self {
            api,
            interval,
            market_id: market_id.to_string(),
            log: Arc::new(Mutex::new(ChatLog::new())),
            scope: Scope::new(),
            poller: None,
        };
        session.spawn_poller();
        session
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    fn spawn_poller(&mut self) {
        let api = self.api.clone();
        let log = self.log.clone();
        let scope = self.scope.clone();
        let market_id = self.market_id.clone();
        let period = self.interval;

        self.poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = refresh_into(&*api, &scope, &log, &market_id).await {
                            warn!("Failed to fetch chat messages for {}: {:#}", market_id, e);
                        }
                    }
                }
            }
            debug!("Chat poller for {} stopped", market_id);
        }));
    }

    /// Fetch once outside the polling schedule.
    pub async fn refresh(&self) -> Result<usize> {
        refresh_into(&*self.api, &self.scope, &self.log, &self.market_id).await
    }

    /// Post a message. Blank text or a missing address never reaches the network.
    pub async fn send(&self, address: Option<&str>, text: &str) -> Result<ChatMessage, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let address = match address {
            Some(a) if !a.is_empty() => a,
            _ => return Err(ChatError::NoWallet),
        };

        let saved = self.api.post(&self.market_id, address, trimmed).await?;

        if !self.scope.is_cancelled() {
            self.log.lock().await.merge(std::iter::once(saved.clone()));
        }
        Ok(saved)
    }

    /// Rebind to another market: the old poller and its in-flight fetches are dropped.
    pub fn switch_market(&mut self, market_id: &str) {
        if market_id == self.market_id {
            return;
        }
        self.stop();

        info!("Chat switched from {} to {}", self.market_id, market_id);
        self.market_id = market_id.to_string();
        self.log = Arc::new(Mutex::new(ChatLog::new()));
        self.scope = Scope::new();
        self.spawn_poller();
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.log.lock().await.messages().to_vec()
    }

    fn stop(&mut self) {
        self.scope.cancel();
        self.poller.take();
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refresh_into(
    api: &dyn ChatApi,
    scope: &Scope,
    log: &Mutex<ChatLog>,
    market_id: &str,
) -> Result<usize> {
    match scope.guard(api.fetch(market_id)).await {
        Some(result) => {
            let messages = result?;
            let added = log.lock().await.merge(messages);
            if added > 0 {
                debug!("{} new chat messages for {}", added, market_id);
            }
            Ok(added)
        }
        None => Ok(0),
    }
}
