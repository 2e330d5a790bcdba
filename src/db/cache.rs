use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::Repository;
use crate::errors::AppError;
use crate::models::Link;

/// Site links, reloaded from the database once the TTL has passed.
pub struct LinkCache {
    ttl: Duration,
    slot: RwLock<Option<(Instant, Vec<Link>)>>,
}

impl LinkCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn get_all(&self, repo: &Repository) -> Result<Vec<Link>, AppError> {
        if let Some((loaded_at, links)) = self.slot.read().await.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(links.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some((loaded_at, links)) = slot.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(links.clone());
            }
        }

        let links = repo.list_links().await?;
        tracing::debug!("Link cache refreshed with {} links", links.len());
        *slot = Some((Instant::now(), links.clone()));
        Ok(links)
    }
}
