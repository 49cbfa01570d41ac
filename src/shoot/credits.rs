use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::backend::normalize_resolution;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CreditError {
    #[error("insufficient credits: {required} required, {available} available")]
    Insufficient { required: u32, available: u32 },
}

/// Consulted before any billable backend work starts.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn reserve(&self, credits: u32) -> Result<(), CreditError>;
}

/// Accepts every reservation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmetered;

#[async_trait]
impl CreditLedger for Unmetered {
    async fn reserve(&self, _credits: u32) -> Result<(), CreditError> {
        Ok(())
    }
}

/// Fixed balance held in memory; reservations are deducted up front.
#[derive(Debug)]
pub struct InMemoryLedger {
    remaining: Mutex<u32>,
}

impl InMemoryLedger {
    pub fn new(balance: u32) -> Self {
        InMemoryLedger {
            remaining: Mutex::new(balance),
        }
    }

    pub async fn remaining(&self) -> u32 {
        *self.remaining.lock().await
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn reserve(&self, credits: u32) -> Result<(), CreditError> {
        let mut remaining = self.remaining.lock().await;
        if *remaining < credits {
            return Err(CreditError::Insufficient {
                required: credits,
                available: *remaining,
            });
        }
        *remaining -= credits;
        info!("reserved {} credits ({} left)", credits, *remaining);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub per_shot: u32,
    pub per_shot_4k: u32,
}

impl Pricing {
    pub fn shot_cost(&self, resolution: &str) -> u32 {
        if normalize_resolution(resolution) == "4K" {
            self.per_shot_4k
        } else {
            self.per_shot
        }
    }

    pub fn total(&self, resolution: &str, shots: usize) -> u32 {
        self.shot_cost(resolution)
            .saturating_mul(u32::try_from(shots).unwrap_or(u32::MAX))
    }
}
