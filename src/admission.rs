use std::{
    collections::{HashMap, HashSet, hash_map::Entry as Slot},
    sync::Arc,
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::Entry;

pub const DEFAULT_QUOTA_LIMIT_BYTES: u64 = 100_000;
pub const DEFAULT_RATE_LIMIT_PER_WINDOW: u32 = 5;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Reasons a submission is turned away. The `Display` text is what the
/// client sees in the response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Duplicate Data ID: {0}")]
    DuplicateId(String),
    #[error("Data limit exceeded for User ID {0}")]
    QuotaExceeded(String),
    #[error("Too many requests from User ID {0}")]
    RateLimited(String),
}

/// Record of submission IDs that have already been admitted.
///
/// Implementations only see IDs of accepted entries, so an eviction or TTL
/// policy can be slotted in here without the admission path changing.
pub trait SeenIds: Send {
    fn contains(&self, id: &str) -> bool;
    fn insert(&mut self, id: String);
}

/// Keeps every admitted ID for the lifetime of the process.
#[derive(Default)]
pub struct UnboundedSeenIds {
    ids: HashSet<String>,
}

impl SeenIds for UnboundedSeenIds {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: String) {
        self.ids.insert(id);
    }
}

/// Cumulative payload bytes a user has sent against their ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRecord {
    pub limit: u64,
    pub used: u64,
}

/// State of a user right after one of their submissions was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub quota: QuotaRecord,
    pub requests_in_window: u32,
}

pub struct AdmissionController<S = UnboundedSeenIds> {
    quota_limit: u64,
    rate_limit: u32,
    inner: Mutex<Ledger<S>>,
}

struct Ledger<S> {
    quotas: HashMap<String, QuotaRecord>,
    seen: S,
    request_counts: HashMap<String, u32>,
}

impl AdmissionController {
    pub fn new(quota_limit: u64, rate_limit: u32) -> Self {
        Self::with_seen_ids(quota_limit, rate_limit, UnboundedSeenIds::default())
    }
}

impl<S: SeenIds> AdmissionController<S> {
    /// A `rate_limit` of zero disables request-rate limiting.
    pub fn with_seen_ids(quota_limit: u64, rate_limit: u32, seen: S) -> Self {
        Self {
            quota_limit,
            rate_limit,
            inner: Mutex::new(Ledger {
                quotas: HashMap::new(),
                seen,
                request_counts: HashMap::new(),
            }),
        }
    }

    /// Decides whether `entry` is accepted and commits its effects.
    ///
    /// Checks run in a fixed order under one lock: duplicate ID, then quota,
    /// then request rate. The quota debit is applied before the rate check,
    /// so an entry rejected for rate still counts against the user's quota.
    /// A user's first entry is always within quota, whatever its size.
    pub async fn submit(&self, entry: &Entry) -> Result<Admission, AdmissionError> {
        let mut guard = self.inner.lock().await;
        let ledger = &mut *guard;

        if ledger.seen.contains(&entry.id) {
            return Err(AdmissionError::DuplicateId(entry.id.clone()));
        }

        let size = entry.payload.len() as u64;
        let quota = match ledger.quotas.entry(entry.user_id.clone()) {
            Slot::Vacant(slot) => *slot.insert(QuotaRecord {
                limit: self.quota_limit,
                used: size,
            }),
            Slot::Occupied(mut slot) => {
                let record = slot.get_mut();
                let used = record.used.saturating_add(size);
                if used > record.limit {
                    return Err(AdmissionError::QuotaExceeded(entry.user_id.clone()));
                }
                record.used = used;
                *record
            }
        };

        let count = ledger
            .request_counts
            .entry(entry.user_id.clone())
            .or_insert(0);
        if self.rate_limit > 0 && *count >= self.rate_limit {
            return Err(AdmissionError::RateLimited(entry.user_id.clone()));
        }
        *count = count.saturating_add(1);
        let requests_in_window = *count;

        ledger.seen.insert(entry.id.clone());

        Ok(Admission {
            quota,
            requests_in_window,
        })
    }

    /// Zeroes every user's request counter. Quotas and seen IDs are kept.
    pub async fn reset_request_counts(&self) {
        let mut ledger = self.inner.lock().await;
        for count in ledger.request_counts.values_mut() {
            *count = 0;
        }
    }
}

/// Resets request counters once per `period` until `shutdown` fires.
/// The first reset happens one full period after the call.
pub fn spawn_reset_task<S>(
    controller: Arc<AdmissionController<S>>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: SeenIds + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("request counter reset task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    controller.reset_request_counts().await;
                    debug!("request counters reset");
                }
            }
        }
    })
}
