//! In-memory registry of pools and their pending ciphertext records.

use crate::clock::Clock;
use crate::error::PoolError;
use crate::types::{
    CiphertextInput, CiphertextRecord, DEFAULT_TTL_SECONDS, Pool, PoolInput,
    validate_ciphertext_input, validate_pool_input,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct PoolSlot {
    pool: Pool,
    records: Vec<CiphertextRecord>,
}

/// Owns all pool state behind a single mutex.
///
/// Every operation locks the same interior, so a join can never land
/// between a drain's read and its clear. "now" is sampled once per
/// operation; pruning is lazy, evaluated on every join and drain rather
/// than by a background task.
pub struct PoolLedger {
    slots: Mutex<HashMap<String, PoolSlot>>,
    clock: Arc<dyn Clock>,
}

impl PoolLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { slots: Mutex::new(HashMap::new()), clock }
    }

    /// Register a pool. Duplicate ids are rejected rather than overwritten,
    /// since an overwrite would silently discard accumulated ciphertexts.
    pub fn create_pool(&self, input: PoolInput) -> Result<Pool, PoolError> {
        validate_pool_input(&input)?;

        let mut slots = self.lock();
        if slots.contains_key(&input.id) {
            return Err(PoolError::PoolExists(input.id));
        }

        let pool = Pool {
            created_at: self.clock.now(),
            ttl_seconds: input.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS),
            id: input.id,
            mode: input.mode,
            description: input.description,
            metadata: input.metadata,
        };
        tracing::debug!(pool_id = %pool.id, ttl_seconds = pool.ttl_seconds, "pool created");

        slots.insert(pool.id.clone(), PoolSlot { pool: pool.clone(), records: Vec::new() });
        Ok(pool)
    }

    /// Append a contribution, defaulting its timestamp and TTL and deriving
    /// `expires_at` from the submission time.
    ///
    /// Validation happens before the slot is touched; a malformed join never
    /// partially updates the ledger. Expired records are dropped on the way
    /// in, but surviving ones are only ever removed by [`Self::drain`].
    pub fn join_pool(
        &self,
        pool_id: &str,
        input: CiphertextInput,
    ) -> Result<CiphertextRecord, PoolError> {
        validate_ciphertext_input(&input)?;

        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = slots
            .get_mut(pool_id)
            .ok_or_else(|| PoolError::PoolNotFound(pool_id.to_string()))?;

        let ttl_seconds = input.ttl_seconds.unwrap_or(slot.pool.ttl_seconds);
        let record = CiphertextRecord {
            ciphertext: input.ciphertext,
            sender_pubkey: input.sender_pubkey,
            nonce: input.nonce,
            timestamp: input.timestamp.unwrap_or(now),
            ttl_seconds,
            metadata: input.metadata,
            expires_at: now + Duration::seconds(ttl_seconds as i64),
        };

        let before = slot.records.len();
        prune(&mut slot.records, now);
        let dropped = before - slot.records.len();
        if dropped > 0 {
            tracing::debug!(pool_id, dropped, "pruned expired ciphertexts");
        }

        slot.records.push(record.clone());
        Ok(record)
    }

    pub fn snapshot(&self, pool_id: &str) -> Result<Pool, PoolError> {
        self.lock()
            .get(pool_id)
            .map(|slot| slot.pool.clone())
            .ok_or_else(|| PoolError::PoolNotFound(pool_id.to_string()))
    }

    /// Consume the pool's surviving records, leaving the slot empty.
    ///
    /// The single point of consumption: at most one compute cycle sees any
    /// given record.
    pub fn drain(&self, pool_id: &str) -> Result<Vec<CiphertextRecord>, PoolError> {
        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = slots
            .get_mut(pool_id)
            .ok_or_else(|| PoolError::PoolNotFound(pool_id.to_string()))?;

        let mut records = std::mem::take(&mut slot.records);
        prune(&mut records, now);
        tracing::debug!(pool_id, surviving = records.len(), "drained pool ciphertexts");
        Ok(records)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PoolSlot>> {
        self.slots.lock().expect("ledger mutex poisoned")
    }
}

/// A record survives iff it expires strictly after `now`.
fn prune(records: &mut Vec<CiphertextRecord>, now: DateTime<Utc>) {
    records.retain(|record| record.expires_at > now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::PoolMode;
    use chrono::TimeZone;

    fn fixture() -> (Arc<ManualClock>, PoolLedger) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let ledger = PoolLedger::new(clock.clone());
        (clock, ledger)
    }

    fn pool_input(id: &str) -> PoolInput {
        PoolInput {
            id: id.to_string(),
            mode: PoolMode::Tally,
            description: None,
            metadata: None,
            ttl_seconds: None,
        }
    }

    fn ciphertext(sender: &str) -> CiphertextInput {
        CiphertextInput {
            ciphertext: format!("{sender}-ciphertext-0123456789"),
            sender_pubkey: format!("{sender:0<32}"),
            ..CiphertextInput::default()
        }
    }

    #[test]
    fn create_applies_default_ttl() {
        let (_clock, ledger) = fixture();
        let pool = ledger.create_pool(pool_input("pl1")).unwrap();
        assert_eq!(pool.ttl_seconds, DEFAULT_TTL_SECONDS);
    }

    #[test]
    fn duplicate_pool_id_is_rejected() {
        let (_clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        assert!(matches!(
            ledger.create_pool(pool_input("pl1")),
            Err(PoolError::PoolExists(_))
        ));
    }

    #[test]
    fn unknown_pool_fails_join_snapshot_and_drain() {
        let (_clock, ledger) = fixture();
        assert!(matches!(
            ledger.join_pool("nonexistent", ciphertext("alice")),
            Err(PoolError::PoolNotFound(_))
        ));
        assert!(matches!(
            ledger.snapshot("nonexistent"),
            Err(PoolError::PoolNotFound(_))
        ));
        assert!(matches!(
            ledger.drain("nonexistent"),
            Err(PoolError::PoolNotFound(_))
        ));
    }

    #[test]
    fn ttl_falls_back_from_record_to_pool() {
        let (clock, ledger) = fixture();
        ledger
            .create_pool(PoolInput {
                ttl_seconds: Some(60),
                ..pool_input("pl1")
            })
            .unwrap();

        let inherited = ledger.join_pool("pl1", ciphertext("alice")).unwrap();
        assert_eq!(inherited.ttl_seconds, 60);
        assert_eq!(inherited.expires_at, clock.now() + Duration::seconds(60));

        let explicit = ledger
            .join_pool(
                "pl1",
                CiphertextInput {
                    ttl_seconds: Some(5),
                    ..ciphertext("bob")
                },
            )
            .unwrap();
        assert_eq!(explicit.ttl_seconds, 5);
    }

    #[test]
    fn drain_returns_survivors_once() {
        let (_clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        ledger.join_pool("pl1", ciphertext("alice")).unwrap();
        ledger.join_pool("pl1", ciphertext("bob")).unwrap();

        let first = ledger.drain("pl1").unwrap();
        assert_eq!(first.len(), 2);

        let second = ledger.drain("pl1").unwrap();
        assert!(second.is_empty());

        // The pool itself survives for future joins.
        ledger.join_pool("pl1", ciphertext("carol")).unwrap();
        assert_eq!(ledger.drain("pl1").unwrap().len(), 1);
    }

    #[test]
    fn expired_records_are_pruned_on_drain() {
        let (clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        ledger
            .join_pool(
                "pl1",
                CiphertextInput {
                    ttl_seconds: Some(1),
                    ..ciphertext("alice")
                },
            )
            .unwrap();
        ledger.join_pool("pl1", ciphertext("bob")).unwrap();

        clock.advance(Duration::seconds(2));
        let survivors = ledger.drain("pl1").unwrap();
        assert_eq!(survivors.len(), 1);
        assert!(survivors[0].sender_pubkey.starts_with("bob"));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let (clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        ledger
            .join_pool(
                "pl1",
                CiphertextInput {
                    ttl_seconds: Some(10),
                    ..ciphertext("alice")
                },
            )
            .unwrap();

        // At exactly expires_at the record is gone: survival requires
        // expires_at > now.
        clock.set(clock.now() + Duration::seconds(10));
        assert!(ledger.drain("pl1").unwrap().is_empty());
    }

    #[test]
    fn join_prunes_expired_but_keeps_survivors() {
        let (clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        ledger
            .join_pool(
                "pl1",
                CiphertextInput {
                    ttl_seconds: Some(1),
                    ..ciphertext("alice")
                },
            )
            .unwrap();

        clock.advance(Duration::seconds(2));
        ledger.join_pool("pl1", ciphertext("bob")).unwrap();

        let records = ledger.drain("pl1").unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].sender_pubkey.starts_with("bob"));
    }

    #[test]
    fn malformed_join_never_mutates() {
        let (_clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();
        ledger.join_pool("pl1", ciphertext("alice")).unwrap();

        let malformed = CiphertextInput {
            ciphertext: "tiny".to_string(),
            ..ciphertext("bob")
        };
        assert!(ledger.join_pool("pl1", malformed).is_err());

        assert_eq!(ledger.drain("pl1").unwrap().len(), 1);
    }

    #[test]
    fn explicit_timestamp_is_kept_but_expiry_uses_submission_time() {
        let (clock, ledger) = fixture();
        ledger.create_pool(pool_input("pl1")).unwrap();

        let backdated = clock.now() - Duration::seconds(500);
        let record = ledger
            .join_pool(
                "pl1",
                CiphertextInput {
                    timestamp: Some(backdated),
                    ttl_seconds: Some(60),
                    ..ciphertext("alice")
                },
            )
            .unwrap();

        assert_eq!(record.timestamp, backdated);
        assert_eq!(record.expires_at, clock.now() + Duration::seconds(60));
    }
}
