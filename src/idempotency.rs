//! At-most-once admission for creation requests.
//!
//! A client that retries a POST — because a response got lost, a mobile
//! network flapped, a load balancer timed out — must not create the thing
//! twice. The client sends an `Idempotency-Key` header; the store remembers
//! what the first attempt produced and replays it for every identical retry.
//!
//! The rules, in order:
//!
//! 1. No key → compute runs, nothing is remembered.
//! 2. Key seen before with the **same** payload hash → the stored response
//!    is replayed verbatim; compute never runs.
//! 3. Key seen before with a **different** payload hash → conflict fault.
//!    A key is a promise about one payload; reusing it for another is a
//!    client bug, and silently honouring it would hand caller A's response
//!    to caller B.
//! 4. Key never seen → compute runs while holding that key's slot, and a
//!    successful (2xx) result is stored.
//!
//! Concurrent requests with the same key serialize on a per-key
//! `tokio::sync::Mutex`: exactly one caller computes; the rest wait
//! (bounded) and then replay the winner's record. A caller still waiting
//! when the window expires gets a retryable conflict fault instead of a
//! second computation. Unrelated keys never contend.
//!
//! Records expire after a retention window (default 24 h). Expiry is lazy —
//! an expired record is treated as absent on lookup — and [`sweep`] drops
//! expired entries proactively; the server loop calls it on an interval.
//!
//! [`sweep`]: IdempotencyStore::sweep

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;

use crate::problem::Fault;

/// Request header naming the idempotency key on creation endpoints.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// What the first successful attempt produced, pinned to its payload hash.
struct Record {
    payload_hash: String,
    status: u16,
    body: Vec<u8>,
    stored_at: Instant,
}

type Slot = Arc<AsyncMutex<Option<Record>>>;

/// Outcome of [`IdempotencyStore::admit`].
#[derive(Debug, PartialEq, Eq)]
pub struct Admitted {
    pub status: u16,
    pub body: Vec<u8>,
    /// `true` when the result came from a stored record instead of `compute`.
    pub replayed: bool,
}

/// Deduplicating store for creation requests.
///
/// The only shared mutable state in the crate. The outer `std` mutex guards
/// the key → slot index and is held for map operations only — never across
/// an `.await`. Each slot is an async mutex serialising all work on one key.
pub struct IdempotencyStore {
    slots: Mutex<HashMap<String, Slot>>,
    retention: Duration,
    wait: Duration,
}

impl IdempotencyStore {
    /// Store with the default policy: 24 h retention, 2 s admission wait.
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_RETENTION, DEFAULT_WAIT)
    }

    /// Store with an explicit retention window and per-key wait timeout.
    ///
    /// `retention` bounds how long a key replays its first response.
    /// `wait` bounds how long a concurrent duplicate blocks on the winner
    /// before failing with a retryable conflict.
    pub fn with_policy(retention: Duration, wait: Duration) -> Self {
        Self { slots: Mutex::new(HashMap::new()), retention, wait }
    }

    /// SHA-256 of the raw request payload, lowercase hex.
    ///
    /// The hash — not the payload — is what a record is pinned to, so the
    /// store never retains request bodies.
    pub fn payload_hash(payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Admits one creation request through the store.
    ///
    /// Runs `compute` at most once per `(key, payload_hash)` pair, per the
    /// rules in the module docs. `compute` failures propagate and commit
    /// nothing — the key stays free for the next attempt. Cancellation
    /// mid-compute likewise drops the slot guard without committing.
    ///
    /// # Errors
    ///
    /// A conflict fault when the key was already used with a different
    /// payload, or when the per-key slot could not be acquired within the
    /// wait window. Any fault raised by `compute` passes through.
    pub async fn admit<F, Fut>(
        &self,
        key: Option<&str>,
        payload_hash: &str,
        compute: F,
    ) -> Result<Admitted, Fault>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(u16, Vec<u8>), Fault>>,
    {
        let Some(key) = key else {
            let (status, body) = compute().await?;
            return Ok(Admitted { status, body, replayed: false });
        };

        let slot = self.slot(key);
        let mut guard = tokio::time::timeout(self.wait, slot.lock())
            .await
            .map_err(|_| {
                Fault::conflict(format!(
                    "a request with idempotency key `{key}` is already in progress; retry shortly"
                ))
            })?;

        // Expired records are indistinguishable from absent ones.
        if guard
            .as_ref()
            .is_some_and(|r| r.stored_at.elapsed() >= self.retention)
        {
            *guard = None;
        }

        if let Some(record) = guard.as_ref() {
            if record.payload_hash == payload_hash {
                return Ok(Admitted {
                    status: record.status,
                    body: record.body.clone(),
                    replayed: true,
                });
            }
            return Err(Fault::conflict(format!(
                "idempotency key `{key}` was already used with a different payload"
            )));
        }

        let (status, body) = compute().await?;
        if (200..300).contains(&status) {
            *guard = Some(Record {
                payload_hash: payload_hash.to_owned(),
                status,
                body: body.clone(),
                stored_at: Instant::now(),
            });
        }
        Ok(Admitted { status, body, replayed: false })
    }

    /// Drops expired records and abandoned slots.
    ///
    /// Safe to call at any time; slots currently held or still referenced by
    /// an in-flight admission are left alone.
    pub fn sweep(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(guard) => guard
                    .as_ref()
                    .is_some_and(|r| r.stored_at.elapsed() < self.retention),
                Err(_) => true,
            }
        });
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_owned()).or_default())
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn created(body: &str) -> Result<(u16, Vec<u8>), Fault> {
        Ok((201, body.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn missing_key_computes_every_time() {
        let store = IdempotencyStore::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let out = store
                .admit(None, "h1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    created(r#"{"id":"1"}"#)
                })
                .await
                .unwrap();
            assert!(!out.replayed);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn identical_retry_replays_the_stored_response() {
        let store = IdempotencyStore::new();
        let first = store
            .admit(Some("k1"), "h1", || async { created(r#"{"id":"9"}"#) })
            .await
            .unwrap();
        assert!(!first.replayed);

        let second = store
            .admit(Some("k1"), "h1", || async { created(r#"{"id":"never"}"#) })
            .await
            .unwrap();
        assert!(second.replayed);
        assert_eq!(second.status, first.status);
        assert_eq!(second.body, first.body);
    }

    #[tokio::test]
    async fn key_reuse_with_different_payload_conflicts_without_computing() {
        let store = IdempotencyStore::new();
        store
            .admit(Some("k1"), "h1", || async { created("{}") })
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let err = store
            .admit(Some("k1"), "h2", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                created("{}")
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::FaultKind::Conflict);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_duplicates_compute_exactly_once() {
        let store = Arc::new(IdempotencyStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                store
                    .admit(Some("k1"), "h1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        created(r#"{"id":"77"}"#)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut bodies = Vec::new();
        for task in tasks {
            bodies.push(task.await.unwrap().body);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(bodies.iter().all(|b| b == &bodies[0]));
    }

    #[tokio::test]
    async fn failed_compute_commits_nothing() {
        let store = IdempotencyStore::new();
        let err = store
            .admit(Some("k1"), "h1", || async {
                Err::<(u16, Vec<u8>), _>(Fault::unavailable("downstream down"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::FaultKind::Unavailable);

        // The key is still free: the retry computes.
        let out = store
            .admit(Some("k1"), "h1", || async { created("{}") })
            .await
            .unwrap();
        assert!(!out.replayed);
    }

    #[tokio::test]
    async fn non_success_results_are_not_recorded() {
        let store = IdempotencyStore::new();
        let first = store
            .admit(Some("k1"), "h1", || async { Ok((422, Vec::new())) })
            .await
            .unwrap();
        assert_eq!(first.status, 422);

        let second = store
            .admit(Some("k1"), "h1", || async { created("{}") })
            .await
            .unwrap();
        assert!(!second.replayed);
        assert_eq!(second.status, 201);
    }

    #[tokio::test]
    async fn expired_records_are_treated_as_absent() {
        let store =
            IdempotencyStore::with_policy(Duration::from_millis(30), DEFAULT_WAIT);
        store
            .admit(Some("k1"), "h1", || async { created(r#"{"id":"old"}"#) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let out = store
            .admit(Some("k1"), "h1", || async { created(r#"{"id":"new"}"#) })
            .await
            .unwrap();
        assert!(!out.replayed);
        assert_eq!(out.body, br#"{"id":"new"}"#.to_vec());
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let store =
            IdempotencyStore::with_policy(Duration::from_millis(10), DEFAULT_WAIT);
        store
            .admit(Some("k1"), "h1", || async { created("{}") })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.sweep();
        let slots = store.slots.lock().unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn payload_hash_is_stable_hex() {
        let a = IdempotencyStore::payload_hash(b"{\"displayName\":\"Ada Lovelace\"}");
        let b = IdempotencyStore::payload_hash(b"{\"displayName\":\"Ada Lovelace\"}");
        let c = IdempotencyStore::payload_hash(b"{\"displayName\":\"Grace Hopper\"}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
