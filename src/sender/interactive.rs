//! Interactive sender: one message per line of operator input.

use std::io;

use tracing::info;

use super::Dispatcher;
use crate::input::LineSource;

/// Input that ends the interactive session (case-insensitive).
pub const EXIT_COMMAND: &str = "exit";

const PROMPT: &str = "Your message: ";

/// Sends each line the operator types, blank ones included, until `exit`
/// or end of input.
pub struct InteractiveSender {
    dispatcher: Dispatcher,
    counter: u64,
}

impl InteractiveSender {
    /// Create a sender whose first message is number 1.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            counter: 1,
        }
    }

    /// Number of the next message.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Read and send lines until `exit` or end of input.
    ///
    /// Returns the number of send attempts made.
    pub async fn run<L: LineSource + ?Sized>(&mut self, lines: &mut L) -> io::Result<u64> {
        println!("Enter your messages below. Type '{}' to quit.", EXIT_COMMAND);
        let mut attempts = 0;

        while let Some(line) = lines.next_line(PROMPT).await? {
            if line.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
                println!("Exiting message sender.");
                info!("Operator ended the interactive session");
                return Ok(attempts);
            }

            self.dispatcher.send_text(self.counter, &line).await;
            self.counter += 1;
            attempts += 1;
        }

        info!("Input closed, ending the interactive session");
        Ok(attempts)
    }
}
