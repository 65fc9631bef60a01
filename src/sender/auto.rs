//! Automatic sender: a numbered message every interval, forever.

use std::time::Duration;

use super::{Dispatcher, SendOutcome};
use crate::config::DEFAULT_SEND_INTERVAL;

/// Sends `Hello! This is message <n> from <local>.` in an endless loop.
pub struct AutoSender {
    dispatcher: Dispatcher,
    counter: u64,
    interval: Duration,
}

impl AutoSender {
    /// Create a sender whose first message is number 1.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            counter: 1,
            interval: DEFAULT_SEND_INTERVAL,
        }
    }

    /// Set the pause between sends.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of the next message.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Content of message `seq`.
    pub fn content_for(&self, seq: u64) -> String {
        format!(
            "Hello! This is message {} from {}.",
            seq,
            self.dispatcher.local_address()
        )
    }

    /// Send one message. The counter advances whatever the outcome.
    pub async fn step(&mut self) -> SendOutcome {
        let seq = self.counter;
        let content = self.content_for(seq);
        let outcome = self.dispatcher.send_text(seq, &content).await;
        self.counter += 1;
        outcome
    }

    /// Send forever. Only process interruption stops this loop.
    pub async fn run(&mut self) {
        loop {
            self.step().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
