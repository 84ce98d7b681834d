// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Leveled diagnostics collected per translator or merger call.
//!
//! Every record is forwarded to `tracing` as it is logged, and also kept so
//! callers can inspect warnings and errors after the call returns.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub channel: String,
    pub message: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] <{}> {}", self.channel, self.level, self.message)
    }
}

/// Collects log records for one component.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    channel: String,
    messages: Vec<LogMessage>,
}

impl LogSink {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            messages: Vec::new(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Drops all collected records.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(channel = %self.channel, "{}", message),
            LogLevel::Info => tracing::info!(channel = %self.channel, "{}", message),
            LogLevel::Warn => tracing::warn!(channel = %self.channel, "{}", message),
            LogLevel::Error => tracing::error!(channel = %self.channel, "{}", message),
        }
        self.messages.push(LogMessage {
            level,
            channel: self.channel.clone(),
            message,
        });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// All records in the order they were logged.
    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn warnings(&self) -> Vec<LogMessage> {
        self.at_level(LogLevel::Warn)
    }

    pub fn errors(&self) -> Vec<LogMessage> {
        self.at_level(LogLevel::Error)
    }

    fn at_level(&self, level: LogLevel) -> Vec<LogMessage> {
        self.messages
            .iter()
            .filter(|m| m.level == level)
            .cloned()
            .collect()
    }
}
