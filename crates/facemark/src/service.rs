//! Verification orchestrator: normalize, match, decide, record.

use crate::clock::{Clock, SystemClock};
use crate::config::{validate_threshold, Config, ConfigError, DEFAULT_DISTANCE_THRESHOLD};
use crate::events::{AttendanceEvent, Observer, Subscribers};
use facemark_core::{
    normalize, AttendanceEntry, DecodeError, ImageSource, MatchError, Matcher,
    MeanAbsoluteDifference, Reference,
};
use facemark_store::{Storage, StoreError, StoredReference};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("reference name must not be empty")]
    EmptyName,
    #[error("image could not be decoded: {0}")]
    Decode(#[from] DecodeError),
    #[error("storage: {0}")]
    Store(#[from] StoreError),
    #[error("matcher invariant violated: {0}")]
    Match(MatchError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of a verification that ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verification {
    /// Best candidate was within the threshold; a ledger entry was written.
    Matched { name: String, distance: f64 },
    /// Best candidate was too far; nothing was written.
    Rejected { candidate: String, distance: f64 },
    /// Nothing registered to compare against.
    NoReferences,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Matched { .. })
    }
}

/// Single entry point for registration, deletion and verification.
pub struct AttendanceService {
    storage: Storage,
    matcher: Box<dyn Matcher + Send>,
    clock: Box<dyn Clock>,
    threshold: f64,
    subscribers: Subscribers,
}

impl AttendanceService {
    /// Service over `storage` with the default matcher and threshold.
    pub fn new(storage: Storage, clock: impl Clock + 'static) -> Self {
        Self {
            storage,
            matcher: Box::new(MeanAbsoluteDifference),
            clock: Box::new(clock),
            threshold: DEFAULT_DISTANCE_THRESHOLD,
            subscribers: Subscribers::default(),
        }
    }

    /// SQLite-backed service on the wall clock, per `config`.
    pub fn open(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let storage = Storage::open_sqlite(&config.db_path, config.target_size)?;
        tracing::info!(
            db = %config.db_path.display(),
            threshold = config.distance_threshold,
            target_size = config.target_size,
            "attendance service ready"
        );
        Self::new(storage, SystemClock).with_threshold(config.distance_threshold)
    }

    /// Replace the acceptance threshold. Non-finite or negative values are rejected.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, ServiceError> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    pub fn with_matcher(mut self, matcher: impl Matcher + Send + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.subscribers.subscribe(observer);
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn target_size(&self) -> u32 {
        self.storage.fingerprints().target_size()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Normalize `source` and store it under `name`.
    pub fn register(&self, name: &str, source: ImageSource) -> Result<(), ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::EmptyName);
        }

        let image = normalize(&source.decode()?, self.target_size())?;
        self.storage.fingerprints().add(name, &image)?;

        self.subscribers.publish(&AttendanceEvent::ReferenceAdded {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Remove every reference registered under `name`. Past ledger entries stay.
    pub fn remove(&self, name: &str) -> Result<usize, ServiceError> {
        let count = self.storage.fingerprints().remove(name)?;
        self.subscribers.publish(&AttendanceEvent::ReferencesRemoved {
            name: name.to_string(),
            count,
        });
        Ok(count)
    }

    /// Compare `source` against every registered reference and record a match.
    pub fn verify(&self, source: ImageSource) -> Result<Verification, ServiceError> {
        let probe = normalize(&source.decode()?, self.target_size())?;
        let references = self.storage.fingerprints().list()?;

        let best = match self.matcher.nearest(&probe, &references) {
            Ok(best) => best,
            Err(MatchError::NoReferences) => {
                tracing::info!("verify: no references registered");
                return Ok(Verification::NoReferences);
            }
            Err(e) => return Err(ServiceError::Match(e)),
        };

        if best.distance <= self.threshold {
            let entry = self
                .storage
                .ledger()
                .append(&best.name, self.clock.now_millis())?;
            tracing::info!(name = %best.name, distance = best.distance, "verify: matched");
            self.subscribers
                .publish(&AttendanceEvent::AttendanceMarked(entry));

            Ok(Verification::Matched {
                name: best.name,
                distance: best.distance,
            })
        } else {
            tracing::info!(
                candidate = %best.name,
                distance = best.distance,
                threshold = self.threshold,
                "verify: rejected"
            );
            Ok(Verification::Rejected {
                candidate: best.name,
                distance: best.distance,
            })
        }
    }

    /// Decoded references in store order.
    pub fn references(&self) -> Result<Vec<Reference>, ServiceError> {
        Ok(self.storage.fingerprints().list()?)
    }

    /// Stored references as persisted (name plus PNG data URI), for thumbnails.
    pub fn records(&self) -> Result<Vec<StoredReference>, ServiceError> {
        Ok(self.storage.fingerprints().records()?)
    }

    /// Ledger entries, oldest first.
    pub fn history(&self) -> Result<Vec<AttendanceEntry>, ServiceError> {
        Ok(self.storage.ledger().all()?)
    }

    /// Latest attendance timestamp per name.
    pub fn last_seen(&self) -> Result<BTreeMap<String, i64>, ServiceError> {
        Ok(self.storage.ledger().last_seen()?)
    }
}
