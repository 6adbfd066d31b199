use anyhow::Result;
use log::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use super::worker::{Command, Worker};
use crate::error::Error;
use crate::worker::{JsonString, WorkerStatus};

/// A fixed pool of store workers; each key is always routed to the same worker.
#[derive(Debug, Clone)]
pub struct Supervisor {
    pub pool_size: usize,
    pub ttl: Duration,
    pub workers: Vec<Worker>,
}

impl Supervisor {
    /// start `pool_size` workers sharing the same sliding expiration
    pub async fn new(pool_size: usize, ttl: Duration) -> Result<Supervisor> {
        if pool_size == 0 {
            return Err(Error::EmptyPool.into());
        }

        let mut workers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            workers.push(Worker::new(ttl).await);
        }

        info!("store supervisor started {} workers", pool_size);

        Ok(Supervisor {
            pool_size,
            ttl,
            workers,
        })
    }

    // the hasher is seeded with fixed keys so routing is stable for the life of the process
    fn route(&self, key: &str) -> &Worker {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() % self.workers.len() as u64) as usize;

        &self.workers[idx]
    }

    /// insert or replace the value; returns the replaced value
    pub async fn set(&self, key: &str, value: JsonString) -> Result<Option<JsonString>> {
        let k = key.to_string();
        self.route(key)
            .request(move |tx| Command::Set(k, value, tx))
            .await
    }

    pub async fn get(&self, key: &str) -> Result<Option<JsonString>> {
        let k = key.to_string();
        self.route(key).request(move |tx| Command::Get(k, tx)).await
    }

    pub async fn remove(&self, key: &str) -> Result<Option<JsonString>> {
        let k = key.to_string();
        self.route(key)
            .request(move |tx| Command::Remove(k, tx))
            .await
    }

    /// the live keys across all workers
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = vec![];
        for worker in self.workers.iter() {
            keys.extend(worker.request(Command::Keys).await?);
        }

        Ok(keys)
    }

    /// the number of live entries across all workers
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for worker in self.workers.iter() {
            match worker.request(Command::Len).await {
                Ok(sz) => total += sz,
                Err(e) => error!("len request failed: {}", e),
            }
        }

        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// drop expired entries from every worker; returns the number dropped
    pub async fn purge(&self) -> Result<usize> {
        let mut dropped = 0;
        for worker in self.workers.iter() {
            dropped += worker.request(Command::Purge).await?;
        }

        Ok(dropped)
    }

    /// one status per worker; a worker that does not answer is reported as down
    pub async fn status(&self) -> Vec<WorkerStatus> {
        let mut list = Vec::with_capacity(self.workers.len());
        for worker in self.workers.iter() {
            let status = match worker.request(Command::Status).await {
                Ok(js) => serde_json::from_str::<WorkerStatus>(&js).unwrap_or_else(|e| {
                    error!("bad status from worker {}: {}", worker.id(), e);
                    WorkerStatus::down(worker.id())
                }),
                Err(e) => {
                    warn!("{}", e);
                    WorkerStatus::down(worker.id())
                }
            };
            list.push(status);
        }

        list
    }

    pub async fn shutdown(&self) -> Result<()> {
        for worker in self.workers.iter() {
            worker.shutdown().await?;
        }

        info!("store supervisor shut down {} workers", self.workers.len());
        Ok(())
    }
}
