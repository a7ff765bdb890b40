//! In-memory target record repository

use super::poison_err;
use crate::adapters::database::traits::RecordRepository;
use crate::core::decompose::upsert::Repositories;
use crate::domain::errors::StorageError;
use crate::domain::ids::{LegacyId, RecordId};
use crate::domain::records::{
    BgCheck, Bolus, BolusCalculation, Calibration, CarbIntake, DeviceEvent, MeterGlucose, Note,
    SensorGlucose, TargetRecord,
};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// In-memory repository for one target record kind
///
/// Enforces the same `UNIQUE (legacy_id)` rule as the PostgreSQL schema, so a
/// second `create` for an already-stored legacy id fails with a conflict.
#[derive(Debug)]
pub struct InMemoryRepository<T: TargetRecord> {
    table: RwLock<Table<T>>,
    failing_legacy_ids: RwLock<HashSet<String>>,
}

// Rows plus their legacy id index, kept under one lock
#[derive(Debug)]
struct Table<T> {
    rows: HashMap<RecordId, T>,
    by_legacy_id: HashMap<LegacyId, RecordId>,
}

impl<T: TargetRecord> Table<T> {
    fn conflict(legacy_id: &LegacyId) -> StorageError {
        StorageError::Conflict {
            kind: T::KIND.to_string(),
            legacy_id: legacy_id.to_string(),
        }
    }
}

impl<T: TargetRecord> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TargetRecord> InMemoryRepository<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: HashMap::new(),
                by_legacy_id: HashMap::new(),
            }),
            failing_legacy_ids: RwLock::new(HashSet::new()),
        }
    }

    /// Makes every write for `legacy_id` fail
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn fail_writes_for(&self, legacy_id: &str) -> Result<()> {
        self.failing_legacy_ids
            .write()
            .map_err(poison_err)?
            .insert(legacy_id.to_string());
        Ok(())
    }

    /// Number of stored rows
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.table.read().map_err(poison_err)?.rows.len())
    }

    /// Whether the repository is empty
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of all stored rows, ordered by `mills`
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn all(&self) -> Result<Vec<T>> {
        let mut rows: Vec<T> = self
            .table
            .read()
            .map_err(poison_err)?
            .rows
            .values()
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.header().mills);
        Ok(rows)
    }

    fn check_failure(&self, record: &T) -> Result<()> {
        let Some(legacy_id) = record.header().legacy_id.as_ref() else {
            return Ok(());
        };
        let failing = self.failing_legacy_ids.read().map_err(poison_err)?;
        if failing.contains(legacy_id.as_str()) {
            return Err(StorageError::InsertFailed {
                kind: T::KIND.to_string(),
                message: format!("injected failure for {legacy_id}"),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl<T: TargetRecord> RecordRepository<T> for InMemoryRepository<T> {
    async fn get_by_legacy_id(&self, legacy_id: &LegacyId) -> Result<Option<T>> {
        let table = self.table.read().map_err(poison_err)?;
        Ok(table
            .by_legacy_id
            .get(legacy_id)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn create(&self, record: &T) -> Result<T> {
        self.check_failure(record)?;

        let mut table = self.table.write().map_err(poison_err)?;
        let id = record.header().id;
        if let Some(legacy_id) = record.header().legacy_id.as_ref() {
            if table.by_legacy_id.contains_key(legacy_id) {
                return Err(Table::<T>::conflict(legacy_id).into());
            }
            table.by_legacy_id.insert(legacy_id.clone(), id);
        }
        table.rows.insert(id, record.clone());
        Ok(record.clone())
    }

    async fn update(&self, id: RecordId, record: &T) -> Result<T> {
        self.check_failure(record)?;

        let mut table = self.table.write().map_err(poison_err)?;
        let Some(previous) = table.rows.get(&id).map(|r| r.header().legacy_id.clone()) else {
            return Err(StorageError::RecordNotFound {
                kind: T::KIND.to_string(),
                id: id.to_string(),
            }
            .into());
        };

        let mut stored = record.clone();
        stored.header_mut().id = id;
        let next = stored.header().legacy_id.clone();
        if next != previous {
            if let Some(legacy_id) = next.as_ref() {
                if table.by_legacy_id.get(legacy_id).is_some_and(|owner| *owner != id) {
                    return Err(Table::<T>::conflict(legacy_id).into());
                }
            }
            if let Some(old) = previous.as_ref() {
                table.by_legacy_id.remove(old);
            }
            if let Some(legacy_id) = next {
                table.by_legacy_id.insert(legacy_id, id);
            }
        }
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }
}

/// Concrete in-memory repositories for every target kind
///
/// Keeps typed handles so callers can inspect what was written after handing
/// [`Repositories`] to the decomposers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepositories {
    pub boluses: Arc<InMemoryRepository<Bolus>>,
    pub carb_intakes: Arc<InMemoryRepository<CarbIntake>>,
    pub bg_checks: Arc<InMemoryRepository<BgCheck>>,
    pub notes: Arc<InMemoryRepository<Note>>,
    pub device_events: Arc<InMemoryRepository<DeviceEvent>>,
    pub bolus_calculations: Arc<InMemoryRepository<BolusCalculation>>,
    pub sensor_glucose: Arc<InMemoryRepository<SensorGlucose>>,
    pub meter_glucose: Arc<InMemoryRepository<MeterGlucose>>,
    pub calibrations: Arc<InMemoryRepository<Calibration>>,
}

impl InMemoryRepositories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view for the upsert coordinator
    pub fn repositories(&self) -> Repositories {
        Repositories {
            boluses: self.boluses.clone(),
            carb_intakes: self.carb_intakes.clone(),
            bg_checks: self.bg_checks.clone(),
            notes: self.notes.clone(),
            device_events: self.device_events.clone(),
            bolus_calculations: self.bolus_calculations.clone(),
            sensor_glucose: self.sensor_glucose.clone(),
            meter_glucose: self.meter_glucose.clone(),
            calibrations: self.calibrations.clone(),
        }
    }

    /// Total rows across all kinds
    ///
    /// # Errors
    ///
    /// Returns an error if a lock is poisoned.
    pub fn total_rows(&self) -> Result<usize> {
        Ok(self.boluses.len()?
            + self.carb_intakes.len()?
            + self.bg_checks.len()?
            + self.notes.len()?
            + self.device_events.len()?
            + self.bolus_calculations.len()?
            + self.sensor_glucose.len()?
            + self.meter_glucose.len()?
            + self.calibrations.len()?)
    }
}
