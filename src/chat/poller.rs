//! Background polling of a community's moderator chat.
//!
//! The poller is a spawned tokio task owned through a [`ChatPollerHandle`].
//! It never has more than one request in flight: each fetch is awaited
//! before the next sleep starts. Failures back off exponentially up to
//! [`PollConfig::max_backoff`]; the first success returns to the base
//! interval.

use crate::api::types::ChatMessage;
use crate::chat::ChatSource;
use crate::comments::types::CommunityId;
use crate::config::ClientConfig;
use crate::retry::Backoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Poller settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay between polls while the backend answers.
    pub interval: Duration,
    /// Longest delay after repeated failures.
    pub max_backoff: Duration,
    /// Random extra delay on failures, as a fraction of the delay.
    pub jitter: f64,
    /// Capacity of the delivery channel.
    pub channel_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for PollConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.chat_poll_interval,
            max_backoff: config.chat_max_backoff,
            jitter: 0.1,
            channel_capacity: 64,
        }
    }
}

/// Owner of a running poller.
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct ChatPollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChatPollerHandle {
    /// Asks the poller to stop. An in-flight request is abandoned.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Returns true once the poller task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the poller and waits for the task to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!(error = %e, "chat poller task ended abnormally");
        }
    }
}

/// Starts polling `community` for new chat messages.
///
/// Messages arrive on the returned receiver in id order, each at most once.
/// The poller exits when stopped, when its handle is dropped, or when the
/// receiver is dropped.
pub fn spawn_chat_poller<C: ChatSource>(
    source: Arc<C>,
    community: CommunityId,
    config: PollConfig,
) -> (ChatPollerHandle, mpsc::Receiver<ChatMessage>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);

    info!(
        community = %community,
        interval_secs = config.interval.as_secs(),
        "starting chat poller"
    );

    let task = tokio::spawn(run_poller(source, community, config, tx, stop_rx));
    (ChatPollerHandle { stop_tx, task }, rx)
}

async fn run_poller<C: ChatSource>(
    source: Arc<C>,
    community: CommunityId,
    config: PollConfig,
    tx: mpsc::Sender<ChatMessage>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(config.interval, config.max_backoff).with_jitter(config.jitter);
    let mut last_seen: Option<u64> = None;

    'poll: loop {
        // A dropped handle also resolves `changed()`
        let fetched = tokio::select! {
            _ = stop_rx.changed() => break,
            result = source.chat_messages(community, last_seen) => result,
        };

        let delay = match fetched {
            Ok(mut messages) => {
                backoff.reset();
                messages.sort_by_key(|m| m.id);

                let mut delivered = 0usize;
                for message in messages {
                    if last_seen.is_some_and(|last| message.id <= last) {
                        continue;
                    }
                    last_seen = Some(message.id);
                    // A full channel must not keep the poller from stopping
                    let sent = tokio::select! {
                        _ = stop_rx.changed() => break 'poll,
                        sent = tx.send(message) => sent,
                    };
                    if sent.is_err() {
                        debug!(community = %community, "chat receiver dropped");
                        return;
                    }
                    delivered += 1;
                }
                if delivered > 0 {
                    debug!(community = %community, delivered, "delivered chat messages");
                }
                config.interval
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    community = %community,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "chat poll failed"
                );
                delay
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop_rx.changed() => break,
            _ = tx.closed() => {
                debug!(community = %community, "chat receiver dropped");
                return;
            }
        }
    }

    info!(community = %community, "chat poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnoniumError, Result};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    type Scripted = Result<Vec<ChatMessage>>;

    /// Chat source replaying scripted responses, then empty pages.
    struct ScriptedChat {
        responses: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<(Instant, Option<u64>)>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Instant, Option<u64>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChatSource for ScriptedChat {
        async fn chat_messages(&self, _community: CommunityId, after: Option<u64>) -> Result<Vec<ChatMessage>> {
            self.calls.lock().unwrap().push((Instant::now(), after));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn message(id: u64) -> ChatMessage {
        ChatMessage {
            id,
            author: Some("mod".to_string()),
            body: format!("message {}", id),
            created_at: None,
        }
    }

    fn config() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            jitter: 0.0,
            channel_capacity: 16,
        }
    }

    async fn wait_for_calls(source: &ScriptedChat, count: usize) {
        for _ in 0..1000 {
            if source.calls().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        panic!("poller made only {} calls", source.calls().len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_and_after_cursor() {
        let source = ScriptedChat::new(vec![
            Ok(vec![message(2), message(1)]),
            Ok(vec![message(2), message(3), message(3)]),
        ]);
        let (handle, mut rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(rx.recv().await.unwrap().id);
        }
        assert_eq!(ids, vec![1, 2, 3]);

        wait_for_calls(&source, 3).await;
        let afters: Vec<_> = source.calls().iter().map(|(_, after)| *after).collect();
        assert_eq!(&afters[..3], &[None, Some(2), Some(3)]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_on_failure_and_reset() {
        let source = ScriptedChat::new(vec![
            Err(AnoniumError::api(503, "down")),
            Err(AnoniumError::api(503, "down")),
            Err(AnoniumError::api(503, "down")),
            Ok(vec![message(1)]),
        ]);
        let (handle, _rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());

        wait_for_calls(&source, 5).await;
        handle.shutdown().await;

        let calls = source.calls();
        let gaps: Vec<u64> = calls
            .windows(2)
            .take(4)
            .map(|w| (w[1].0 - w[0].0).as_secs())
            .collect();
        assert_eq!(gaps, vec![5, 10, 20, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_capped() {
        let failures = (0..8).map(|_| Err(AnoniumError::api(500, "boom"))).collect();
        let source = ScriptedChat::new(failures);
        let (handle, _rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());

        wait_for_calls(&source, 8).await;
        handle.shutdown().await;

        let calls = source.calls();
        let longest = calls
            .windows(2)
            .map(|w| w[1].0 - w[0].0)
            .max()
            .unwrap();
        assert_eq!(longest, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_channel() {
        let source = ScriptedChat::new(vec![]);
        let (handle, mut rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());

        wait_for_calls(&source, 1).await;
        handle.shutdown().await;
        assert!(rx.recv().await.is_none());

        let calls_after_stop = source.calls().len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls().len(), calls_after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_stops_poller() {
        let source = ScriptedChat::new(vec![]);
        let (handle, rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());
        wait_for_calls(&source, 1).await;

        drop(rx);
        for _ in 0..10 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_with_full_channel() {
        let backlog: Vec<ChatMessage> = (1..=100).map(message).collect();
        let source = ScriptedChat::new(vec![Ok(backlog)]);
        let (handle, mut rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());

        for expected in 1..=3 {
            assert_eq!(rx.recv().await.unwrap().id, expected);
        }

        // The receiver stays alive but is no longer drained
        let stopped = tokio::time::timeout(Duration::from_secs(3), handle.shutdown()).await;
        assert!(stopped.is_ok(), "poller blocked on a full channel");

        let mut buffered = 0;
        while rx.recv().await.is_some() {
            buffered += 1;
        }
        assert!(buffered <= config().channel_capacity);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_poller() {
        let source = ScriptedChat::new(vec![]);
        let (handle, mut rx) = spawn_chat_poller(Arc::clone(&source), CommunityId(1), config());
        wait_for_calls(&source, 1).await;

        drop(handle);
        assert!(rx.recv().await.is_none());
    }
}
