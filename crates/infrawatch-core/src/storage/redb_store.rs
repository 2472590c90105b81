//! # redb-backed Metric Store
//!
//! Disk-backed storage for the three record kinds the decision core
//! produces and consumes:
//! - latest observation per metric id (the detectors diff against the
//!   value this table held before an insert)
//! - append-only stage-determination history
//! - signals, whose only post-construction mutation is the read flag
//!
//! redb provides ACID transactions and crash safety with zero
//! configuration; record values are postcard-encoded.

use crate::detector::Signal;
use crate::snapshot::{MetricSnapshot, metric_ids};
use crate::stage::StageResult;
use crate::types::InfrawatchError;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for latest observations: metric id -> serialized observation.
const OBSERVATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("observations");

/// Table for stage history: sequence id -> serialized StageResult.
const STAGE_HISTORY: TableDefinition<u64, &[u8]> = TableDefinition::new("stage_history");

/// Table for signals: sequence id -> serialized Signal.
const SIGNALS: TableDefinition<u64, &[u8]> = TableDefinition::new("signals");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

// =============================================================================
// OBSERVATION RECORD
// =============================================================================

/// One stored metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    /// Metric id the observation is stored under.
    pub metric_id: String,
    pub value: f64,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    pub recorded_at_ms: u64,
}

// =============================================================================
// METRIC STORE
// =============================================================================

/// Disk-backed store for observations, stage history and signals.
pub struct MetricStore {
    db: Database,
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore").finish_non_exhaustive()
    }
}

impl MetricStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InfrawatchError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(OBSERVATIONS).map_err(io_err)?;
            let _ = write_txn.open_table(STAGE_HISTORY).map_err(io_err)?;
            let _ = write_txn.open_table(SIGNALS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    // =========================================================================
    // OBSERVATIONS
    // =========================================================================

    /// Store an observation as the latest value for its metric id.
    ///
    /// Returns the observation this one replaced, which is exactly the
    /// "previous value" the signal detectors compare against.
    pub fn put_observation(
        &self,
        observation: &MetricObservation,
    ) -> Result<Option<MetricObservation>, InfrawatchError> {
        let bytes = encode(observation)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let previous = {
            let mut table = write_txn.open_table(OBSERVATIONS).map_err(io_err)?;
            let replaced = table
                .insert(observation.metric_id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
            match replaced {
                Some(guard) => Some(decode::<MetricObservation>(guard.value())?),
                None => None,
            }
        };

        write_txn.commit().map_err(io_err)?;
        Ok(previous)
    }

    /// Latest observation for a metric id, if any.
    pub fn latest(&self, metric_id: &str) -> Result<Option<MetricObservation>, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(OBSERVATIONS).map_err(io_err)?;
        match table.get(metric_id).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Number of metric ids with a stored observation.
    pub fn observation_count(&self) -> Result<usize, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(OBSERVATIONS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    /// Assemble a classifier snapshot from the well-known metric ids.
    ///
    /// Ids without a stored observation stay absent in the snapshot; the
    /// classifier degrades gracefully from there.
    pub fn load_snapshot(&self) -> Result<MetricSnapshot, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(OBSERVATIONS).map_err(io_err)?;

        let mut snapshot = MetricSnapshot::new();
        for metric_id in [
            metric_ids::M01_LOW,
            metric_ids::M01_HIGH,
            metric_ids::PRICE_DEFLATION_QOQ,
            metric_ids::SPOT_DISCOUNT,
            metric_ids::RENTAL_QOQ,
            metric_ids::ADOPTION_STREAK,
            metric_ids::CLOUD_MARGIN_QOQ,
            metric_ids::SUPPLY_TIGHTNESS,
        ] {
            if let Some(guard) = table.get(metric_id).map_err(io_err)? {
                let observation: MetricObservation = decode(guard.value())?;
                snapshot.set_by_metric_id(metric_id, observation.value);
            }
        }

        Ok(snapshot)
    }

    // =========================================================================
    // STAGE HISTORY
    // =========================================================================

    /// Append a stage determination to the history log.
    pub fn append_stage(&self, result: &StageResult) -> Result<u64, InfrawatchError> {
        let bytes = encode(result)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let id = {
            let mut metadata = write_txn.open_table(METADATA).map_err(io_err)?;
            let id = metadata
                .get("next_stage_id")
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            metadata
                .insert("next_stage_id", id.saturating_add(1))
                .map_err(io_err)?;
            id
        };

        {
            let mut table = write_txn.open_table(STAGE_HISTORY).map_err(io_err)?;
            table.insert(id, bytes.as_slice()).map_err(io_err)?;
        }

        write_txn.commit().map_err(io_err)?;
        Ok(id)
    }

    /// Most recent stage determinations, newest first.
    pub fn stage_history(&self, limit: usize) -> Result<Vec<StageResult>, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(STAGE_HISTORY).map_err(io_err)?;

        let mut history = Vec::new();
        for entry in table.iter().map_err(io_err)?.rev().take(limit) {
            let (_, value) = entry.map_err(io_err)?;
            history.push(decode(value.value())?);
        }
        Ok(history)
    }

    /// The latest stage determination, if any exists yet.
    pub fn latest_stage(&self) -> Result<Option<StageResult>, InfrawatchError> {
        Ok(self.stage_history(1)?.into_iter().next())
    }

    /// Number of stored stage determinations.
    pub fn stage_count(&self) -> Result<usize, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(STAGE_HISTORY).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Store a detected signal, returning its assigned id.
    pub fn append_signal(&self, signal: &Signal) -> Result<u64, InfrawatchError> {
        let bytes = encode(signal)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let id = {
            let mut metadata = write_txn.open_table(METADATA).map_err(io_err)?;
            let id = metadata
                .get("next_signal_id")
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            metadata
                .insert("next_signal_id", id.saturating_add(1))
                .map_err(io_err)?;
            id
        };

        {
            let mut table = write_txn.open_table(SIGNALS).map_err(io_err)?;
            table.insert(id, bytes.as_slice()).map_err(io_err)?;
        }

        write_txn.commit().map_err(io_err)?;
        Ok(id)
    }

    /// Stored signals, newest first, optionally unread only.
    pub fn signals(
        &self,
        limit: usize,
        unread_only: bool,
    ) -> Result<Vec<(u64, Signal)>, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SIGNALS).map_err(io_err)?;

        let mut signals = Vec::new();
        for entry in table.iter().map_err(io_err)?.rev() {
            if signals.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(io_err)?;
            let signal: Signal = decode(value.value())?;
            if unread_only && signal.is_read {
                continue;
            }
            signals.push((key.value(), signal));
        }
        Ok(signals)
    }

    /// Number of stored signals.
    pub fn signal_count(&self) -> Result<usize, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SIGNALS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    /// Number of stored signals not yet acknowledged.
    pub fn unread_count(&self) -> Result<usize, InfrawatchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SIGNALS).map_err(io_err)?;

        let mut count = 0;
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let signal: Signal = decode(value.value())?;
            if !signal.is_read {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Flip a stored signal's read flag. The read flag is the only field
    /// a stored signal ever has rewritten.
    pub fn mark_read(&self, id: u64) -> Result<(), InfrawatchError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;

        {
            let mut table = write_txn.open_table(SIGNALS).map_err(io_err)?;
            let mut signal: Signal = match table.get(id).map_err(io_err)? {
                Some(guard) => decode(guard.value())?,
                None => return Err(InfrawatchError::SignalNotFound(id)),
            };
            signal.is_read = true;
            let bytes = encode(&signal)?;
            table.insert(id, bytes.as_slice()).map_err(io_err)?;
        }

        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// ENCODING HELPERS
// =============================================================================

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, InfrawatchError> {
    postcard::to_stdvec(value).map_err(|e| InfrawatchError::SerializationError(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, InfrawatchError> {
    postcard::from_bytes(bytes).map_err(|e| InfrawatchError::DeserializationError(e.to_string()))
}

fn io_err(e: impl std::fmt::Display) -> InfrawatchError {
    InfrawatchError::IoError(e.to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::SignalDetector;
    use crate::stage::StageClassifier;
    use crate::types::{StageCode, now_millis};

    fn open_temp_store() -> (MetricStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MetricStore::open(dir.path().join("infrawatch.db")).expect("open");
        (store, dir)
    }

    fn observation(metric_id: &str, value: f64) -> MetricObservation {
        MetricObservation {
            metric_id: metric_id.to_string(),
            value,
            sector: None,
            provider: None,
            recorded_at_ms: now_millis(),
        }
    }

    #[test]
    fn put_observation_returns_the_replaced_value() {
        let (store, _dir) = open_temp_store();

        let first = store
            .put_observation(&observation(metric_ids::SPOT_DISCOUNT, 0.30))
            .expect("put");
        assert!(first.is_none());

        let second = store
            .put_observation(&observation(metric_ids::SPOT_DISCOUNT, 0.45))
            .expect("put");
        assert_eq!(second.expect("previous").value, 0.30);

        let latest = store
            .latest(metric_ids::SPOT_DISCOUNT)
            .expect("latest")
            .expect("stored");
        assert_eq!(latest.value, 0.45);
    }

    #[test]
    fn snapshot_assembles_from_stored_observations() {
        let (store, _dir) = open_temp_store();
        store
            .put_observation(&observation(metric_ids::M01_LOW, 0.24))
            .expect("put");
        store
            .put_observation(&observation(metric_ids::M01_HIGH, 0.36))
            .expect("put");
        store
            .put_observation(&observation(metric_ids::ADOPTION_STREAK, 2.0))
            .expect("put");
        // A metric the classifier does not consume is simply ignored.
        store
            .put_observation(&observation("b_gpt_input_price", 2.50))
            .expect("put");

        let snapshot = store.load_snapshot().expect("snapshot");
        assert_eq!(snapshot.m01_low, Some(0.24));
        assert_eq!(snapshot.m01_high, Some(0.36));
        assert_eq!(snapshot.adoption_growth_streak, 2);
        assert_eq!(snapshot.price_deflation_qoq, None);
    }

    #[test]
    fn empty_store_yields_empty_snapshot() {
        let (store, _dir) = open_temp_store();
        assert!(store.load_snapshot().expect("snapshot").is_empty());
        assert_eq!(store.observation_count().expect("count"), 0);
    }

    #[test]
    fn stage_history_returns_newest_first() {
        let (store, _dir) = open_temp_store();
        let classifier = StageClassifier::new();

        let first = classifier.determine(&MetricSnapshot::new());
        store.append_stage(&first).expect("append");

        let mut snapshot = MetricSnapshot::new();
        snapshot.m01_low = Some(1.10);
        snapshot.cloud_margin_qoq = Some(0.01);
        let second = classifier.determine(&snapshot);
        store.append_stage(&second).expect("append");

        let history = store.stage_history(10).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].stage, StageCode::S3);
        assert_eq!(history[1].stage, StageCode::S1);

        let latest = store.latest_stage().expect("latest").expect("some");
        assert_eq!(latest.stage, StageCode::S3);
    }

    #[test]
    fn stage_history_respects_limit() {
        let (store, _dir) = open_temp_store();
        let classifier = StageClassifier::new();
        for _ in 0..5 {
            store
                .append_stage(&classifier.determine(&MetricSnapshot::new()))
                .expect("append");
        }
        assert_eq!(store.stage_history(3).expect("history").len(), 3);
        assert_eq!(store.stage_count().expect("count"), 5);
    }

    #[test]
    fn signals_round_trip_with_read_flag() {
        let (store, _dir) = open_temp_store();
        let detector = SignalDetector::new();

        let signal = detector
            .detect_price_move("b_gpt_input_price", 110.0, 100.0, Some("B"), Some("openai"))
            .expect("signal");
        let id = store.append_signal(&signal).expect("append");

        assert_eq!(store.unread_count().expect("count"), 1);

        store.mark_read(id).expect("mark read");
        assert_eq!(store.unread_count().expect("count"), 0);

        let stored = store.signals(10, false).expect("signals");
        assert_eq!(stored.len(), 1);
        assert!(stored[0].1.is_read);

        // Unread-only filtering now yields nothing.
        assert!(store.signals(10, true).expect("signals").is_empty());
    }

    #[test]
    fn mark_read_on_unknown_id_is_an_error() {
        let (store, _dir) = open_temp_store();
        assert!(matches!(
            store.mark_read(42),
            Err(InfrawatchError::SignalNotFound(42))
        ));
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("infrawatch.db");

        {
            let store = MetricStore::open(&path).expect("open");
            store
                .put_observation(&observation(metric_ids::M01_LOW, 0.24))
                .expect("put");
        }

        let reopened = MetricStore::open(&path).expect("reopen");
        let latest = reopened
            .latest(metric_ids::M01_LOW)
            .expect("latest")
            .expect("stored");
        assert_eq!(latest.value, 0.24);
    }
}
