//! Background rate fetching. Workers never touch UI state: they send `FetchEvent`s over a
//! channel and the UI thread folds them into its `RateStore`.

use crate::currency::RateSnapshot;
use crate::rates::{RateError, RateProvider, RateSource};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub enum FetchEvent {
    Started {
        seq: u64,
    },
    Finished {
        seq: u64,
        result: Result<RateSnapshot, RateError>,
    },
}

/// What a handled event changed, for the UI to render.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    FetchStarted,
    Updated,
    Failed(String),
    Stale,
}

/// Owner of the current snapshot. Lives on the UI thread.
pub struct RateStore {
    current: RateSnapshot,
    last_issued: u64,
    newest_applied: Option<u64>,
    discard_stale: bool,
}

impl RateStore {
    pub fn new(discard_stale: bool) -> Self {
        Self {
            current: RateSnapshot::default(),
            last_issued: 0,
            newest_applied: None,
            discard_stale,
        }
    }

    pub fn current(&self) -> &RateSnapshot {
        &self.current
    }

    /// Issues the sequence number for a new fetch.
    pub fn next_request(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    pub fn handle(&mut self, event: FetchEvent) -> StoreUpdate {
        match event {
            FetchEvent::Started { seq } => {
                log::debug!("fetch #{} started", seq);
                StoreUpdate::FetchStarted
            }
            FetchEvent::Finished { seq, result } => self.apply(seq, result),
        }
    }

    fn apply(&mut self, seq: u64, result: Result<RateSnapshot, RateError>) -> StoreUpdate {
        if self.discard_stale && self.newest_applied.is_some_and(|newest| seq < newest) {
            log::info!("discarding result of fetch #{}, a newer one already landed", seq);
            return StoreUpdate::Stale;
        }
        self.newest_applied = Some(self.newest_applied.map_or(seq, |newest| newest.max(seq)));

        match result {
            Ok(snapshot) => {
                log::info!("fetch #{} applied, rates as of {}", seq, snapshot.as_of);
                self.current = snapshot;
                StoreUpdate::Updated
            }
            Err(e) => {
                log::error!("fetch #{} failed: {}", seq, e);
                StoreUpdate::Failed(e.to_string())
            }
        }
    }
}

pub struct Refresher<S> {
    provider: Arc<RateProvider<S>>,
    sender: Sender<FetchEvent>,
}

impl<S: RateSource + 'static> Refresher<S> {
    pub fn new(provider: RateProvider<S>) -> (Self, Receiver<FetchEvent>) {
        let (sender, receiver) = mpsc::channel();
        let refresher = Self {
            provider: Arc::new(provider),
            sender,
        };
        (refresher, receiver)
    }

    /// Runs one fetch on its own thread. There is no cancellation; overlapping fetches
    /// each report back independently.
    pub fn spawn(&self, seq: u64) -> thread::JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        thread::spawn(move || {
            log::info!("fetch #{} starting", seq);
            if sender.send(FetchEvent::Started { seq }).is_err() {
                return;
            }
            let result = provider.fetch_rates();
            if sender.send(FetchEvent::Finished { seq, result }).is_err() {
                log::debug!("fetch #{} finished after the receiver closed", seq);
            }
        })
    }
}
