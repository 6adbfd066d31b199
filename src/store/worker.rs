use anyhow::{anyhow, Result};
use async_channel::{bounded, Receiver, Sender};
use domain_keys::keys::RouteKey;
use hashbrown::HashMap;
use log::*;
use service_uptime::Uptime;
use std::time::{Duration, Instant};

use crate::worker::{JsonString, WorkerState, WorkerStatus, OK};

#[derive(Debug, Clone)]
pub enum Command {
    Set(String, JsonString, Sender<Option<JsonString>>),
    Get(String, Sender<Option<JsonString>>),
    Remove(String, Sender<Option<JsonString>>),
    Keys(Sender<Vec<String>>),
    Len(Sender<usize>),
    Purge(Sender<usize>), // drop expired entries, respond with the number dropped
    Status(Sender<JsonString>), // request the worker's status
    Shutdown,
}

#[derive(Debug, Clone)]
struct Entry {
    value: JsonString,
    touched: Instant,
}

impl Entry {
    fn new(value: JsonString, now: Instant) -> Entry {
        Entry {
            value,
            touched: now,
        }
    }

    // sliding expiration: idle time is measured from the last access
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.touched) > ttl
    }
}

// the count sticks at u16::MAX rather than wrapping
fn count_error(count: u16, failed: u16) -> u16 {
    count.saturating_add(failed)
}

// the handler loop
pub async fn handler(id: String, ttl: Duration, rx: Receiver<Command>) -> Result<()> {
    let uptime = Uptime::new();
    let mut state = WorkerState::Idle;
    let mut error_count = 0u16;

    let mut store: HashMap<String, Entry> = HashMap::new();

    // now read and respond to requests
    while let Ok(cmd) = rx.recv().await {
        let now = Instant::now();
        match cmd {
            Command::Set(key, value, tx) => {
                debug!("set key: {}", key);
                let prev = store
                    .insert(key, Entry::new(value, now))
                    .filter(|e| !e.is_expired(ttl, now))
                    .map(|e| e.value);

                error_count = count_error(error_count, send_response(prev, tx).await);
            }
            Command::Get(key, tx) => {
                debug!("get key: {}", key);
                let expired = store.get(&key).map(|e| e.is_expired(ttl, now));
                let value = match expired {
                    Some(true) => {
                        store.remove(&key);
                        None
                    }
                    Some(false) => store.get_mut(&key).map(|e| {
                        e.touched = now;
                        e.value.clone()
                    }),
                    None => None,
                };

                error_count = count_error(error_count, send_response(value, tx).await);
            }
            Command::Remove(key, tx) => {
                debug!("remove key: {}", key);
                let value = store
                    .remove(&key)
                    .filter(|e| !e.is_expired(ttl, now))
                    .map(|e| e.value);

                error_count = count_error(error_count, send_response(value, tx).await);
            }
            Command::Keys(tx) => {
                store.retain(|_, e| !e.is_expired(ttl, now));
                let list: Vec<String> = store.keys().cloned().collect();
                error_count = count_error(error_count, send_response(list, tx).await);
            }
            Command::Len(tx) => {
                store.retain(|_, e| !e.is_expired(ttl, now));
                error_count = count_error(error_count, send_response(store.len(), tx).await);
            }
            Command::Purge(tx) => {
                let before = store.len();
                store.retain(|_, e| !e.is_expired(ttl, now));
                let dropped = before - store.len();
                if dropped > 0 {
                    info!("worker id: {}, purged {} expired entries", id, dropped);
                }
                error_count = count_error(error_count, send_response(dropped, tx).await);
            }
            Command::Status(tx) => {
                let live = store.values().filter(|e| !e.is_expired(ttl, now)).count();
                let status = WorkerStatus::new(
                    id.to_string(),
                    OK.to_string(),
                    state.clone(),
                    uptime.to_string(),
                    error_count,
                    live,
                );

                let msg = match serde_json::to_string(&status) {
                    Ok(js) => js,
                    Err(e) => {
                        format!(r#"{}"status":"json parse error: {:?}"{}"#, "{", e, "}\n")
                    }
                };

                debug!("status response: {}", msg);
                error_count = count_error(error_count, send_response(msg, tx).await);
            }
            Command::Shutdown => {
                state = WorkerState::Shutdown;
                info!("worker id: {}, state: {:?}", id, state);
                break;
            }
        }
    }

    // helper functions
    async fn send_response<T>(msg: T, tx: Sender<T>) -> u16 {
        if tx.send(msg).await.is_err() {
            error!("error sending response, requester has gone away");
            1u16
        } else {
            0u16
        }
    }

    rx.close();

    // dropping queued commands drops their responders so waiting requesters see an error
    while let Ok(cmd) = rx.try_recv() {
        debug!("worker id: {}, dropping queued command: {:?}", id, cmd);
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct Worker {
    id: String,
    uptime: Uptime,
    request_tx: Sender<Command>,
}

//
impl Worker {
    /// create and start a new worker; entries idle longer than `ttl` expire.
    pub async fn new(ttl: Duration) -> Worker {
        let uptime = Uptime::new();
        let id = RouteKey::create();

        // this is for the worker struct
        let wid = id.clone();

        info!("starting up store worker, id: {}, ttl: {:?}", id, ttl);

        let (request_tx, request_receiver) = bounded(250);

        // run the handler loop as a background task
        async_std::task::spawn(async move {
            match handler(id.clone(), ttl, request_receiver).await {
                Ok(()) => info!("worker handler exit for worker id: {}", id),
                Err(e) => error!("worker exit with error: {:?}", e),
            }
        });

        Worker {
            id: wid,
            uptime,
            request_tx,
        }
    }

    /// return the worker's id
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    /// return the worker's uptime as a display string
    pub fn get_uptime(&self) -> String {
        self.uptime.to_string()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.uptime.get_uptime_seconds()
    }

    /// This is invoked by the client to enable sending command request to
    /// the worker
    pub fn request_channel(&self) -> Sender<Command> {
        self.request_tx.clone()
    }

    /// send a command built around a fresh response channel and wait for the answer
    pub async fn request<R, F>(&self, build: F) -> Result<R>
    where
        R: Send,
        F: FnOnce(Sender<R>) -> Command + Send,
    {
        let (tx, rx) = bounded(1);
        self.request_tx
            .send(build(tx))
            .await
            .map_err(|e| anyhow!("worker {} is not accepting requests: {}", self.id, e))?;

        rx.recv()
            .await
            .map_err(|e| anyhow!("worker {} did not respond: {}", self.id, e))
    }

    /// stop the handler loop
    pub async fn shutdown(&self) -> Result<()> {
        self.request_tx
            .send(Command::Shutdown)
            .await
            .map_err(|e| anyhow!("worker {} is already down: {}", self.id, e))
    }
}
