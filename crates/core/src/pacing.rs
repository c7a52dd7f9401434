//! Mandatory pacing in front of catalog searches.
//!
//! Every planner invocation acquires a [`PacingPermit`] before it issues any
//! search and holds it until its searches finish. [`SerialPacer`] shares one
//! gate across all clones, so concurrent resolution loops never search at the
//! same time and consecutive invocations start at least `delay` apart.
//! [`PerCallPacer`] only waits, which is enough when the catalog limits each
//! caller rather than the whole account.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    Global,
    PerCall,
}

impl std::str::FromStr for PacingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "per_call" | "per-call" => Ok(Self::PerCall),
            other => Err(format!("unsupported pacing mode `{other}` (expected global|per_call)")),
        }
    }
}

#[must_use = "searches are only paced while the permit is held"]
pub struct PacingPermit {
    _gate: Option<OwnedMutexGuard<()>>,
}

impl PacingPermit {
    pub fn unguarded() -> Self {
        Self { _gate: None }
    }

    pub fn guarded(gate: OwnedMutexGuard<()>) -> Self {
        Self { _gate: Some(gate) }
    }
}

#[async_trait]
pub trait SearchPacer: Send + Sync {
    async fn acquire(&self) -> PacingPermit;
}

#[derive(Clone, Debug)]
pub struct PerCallPacer {
    delay: Duration,
}

impl PerCallPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SearchPacer for PerCallPacer {
    async fn acquire(&self) -> PacingPermit {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        PacingPermit::unguarded()
    }
}

#[derive(Clone, Debug)]
pub struct SerialPacer {
    delay: Duration,
    gate: Arc<Mutex<()>>,
}

impl SerialPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, gate: Arc::new(Mutex::new(())) }
    }
}

#[async_trait]
impl SearchPacer for SerialPacer {
    async fn acquire(&self) -> PacingPermit {
        let guard = self.gate.clone().lock_owned().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        PacingPermit::guarded(guard)
    }
}

pub fn pacer_for(mode: PacingMode, delay: Duration) -> Arc<dyn SearchPacer> {
    match mode {
        PacingMode::Global => Arc::new(SerialPacer::new(delay)),
        PacingMode::PerCall => Arc::new(PerCallPacer::new(delay)),
    }
}
