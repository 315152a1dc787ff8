use crate::error::HostError;
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Handle to the completion of a host operation.
///
/// Resolves exactly once, with the payload or a [`HostError`].
#[derive(Debug)]
pub struct Operation<T> {
    id: u64,
    receiver: Receiver<Result<T, HostError>>,
}

impl<T> Operation<T> {
    /// Operation id, also carried by the completion event
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the operation completes
    pub fn wait(self) -> Result<T, HostError> {
        self.receiver.recv().unwrap_or_else(|_| Err(dropped()))
    }

    /// Block for at most `timeout`. `None` if the operation is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, HostError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(dropped())),
        }
    }

    /// The result if the operation already completed
    pub fn try_result(&self) -> Option<Result<T, HostError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(dropped())),
        }
    }
}

fn dropped() -> HostError {
    HostError::Unexpected("operation was dropped without completing".to_string())
}

/// Sending side of one or more [`Operation`]s sharing the same id
pub(crate) struct Completion<T> {
    id: u64,
    senders: Vec<Sender<Result<T, HostError>>>,
}

impl<T> Completion<T> {
    pub fn new(id: u64) -> (Self, Operation<T>) {
        let mut completion = Self {
            id,
            senders: Vec::with_capacity(1),
        };
        let operation = completion.subscribe();
        (completion, operation)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Another handle resolving with the same result
    pub fn subscribe(&mut self) -> Operation<T> {
        let (sender, receiver) = flume::bounded(1);
        self.senders.push(sender);
        Operation {
            id: self.id,
            receiver,
        }
    }
}

impl<T: Clone> Completion<T> {
    pub fn resolve(self, result: Result<T, HostError>) {
        // handles dropped by the caller are fine to ignore
        for sender in self.senders {
            let _ = sender.send(result.clone());
        }
    }
}
