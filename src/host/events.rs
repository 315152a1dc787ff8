//! Events pushed to the client of a [`Host`](super::Host)

use crate::error::{HostError, ResultInterop};
use crate::query::Stats;
use crate::stages::cook::CookOutput;
use serde::Serialize;

/// An event as sent over the wire:
/// `{ "event": "search-complete", "payload": ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HostEvent {
    /// Database is opened and ready to use
    Initialized(ResultInterop<()>),
    /// Search progress as a percentage between 0 and 100
    SearchProgress(u32),
    SearchComplete(Completed<Stats>),
    /// Filter progress as a percentage between 0 and 100
    FilterProgress(u32),
    FilterComplete(Completed<Stats>),
    /// Cooked results are ready to display
    CookComplete(Completed<CookOutput>),
}

/// Completion payload, tagged with the id of the operation it completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completed<T> {
    pub id: u64,
    #[serde(flatten)]
    pub result: ResultInterop<T>,
}

impl<T> Completed<T> {
    pub fn new(id: u64, result: Result<T, HostError>) -> Self {
        Self {
            id,
            result: result.into(),
        }
    }
}

impl HostEvent {
    /// Event name, as used for the `event` field
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Initialized(_) => "initialized",
            HostEvent::SearchProgress(_) => "search-progress",
            HostEvent::SearchComplete(_) => "search-complete",
            HostEvent::FilterProgress(_) => "filter-progress",
            HostEvent::FilterComplete(_) => "filter-complete",
            HostEvent::CookComplete(_) => "cook-complete",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of host events. Called from worker threads.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: HostEvent);
}

impl EventSink for flume::Sender<HostEvent> {
    fn emit(&self, event: HostEvent) {
        // the client went away; nothing left to notify
        let _ = self.send(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: HostEvent) {}
}
