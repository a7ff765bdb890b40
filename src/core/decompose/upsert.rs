//! Create-or-update of target records keyed by legacy id
//!
//! One read and one write per record: look the legacy id up, adopt the
//! existing row's identity when found, otherwise insert. The read and the
//! write are not atomic; the storage layer's `UNIQUE (legacy_id)` index is
//! what stops two concurrent callers from creating duplicates.

use crate::adapters::database::traits::RecordRepository;
use crate::domain::records::{
    BgCheck, Bolus, BolusCalculation, Calibration, CarbIntake, DeviceEvent, MeterGlucose, Note,
    SensorGlucose, TargetRecord,
};
use crate::domain::Result;
use std::sync::Arc;

/// One repository per target record kind
#[derive(Clone)]
pub struct Repositories {
    pub boluses: Arc<dyn RecordRepository<Bolus>>,
    pub carb_intakes: Arc<dyn RecordRepository<CarbIntake>>,
    pub bg_checks: Arc<dyn RecordRepository<BgCheck>>,
    pub notes: Arc<dyn RecordRepository<Note>>,
    pub device_events: Arc<dyn RecordRepository<DeviceEvent>>,
    pub bolus_calculations: Arc<dyn RecordRepository<BolusCalculation>>,
    pub sensor_glucose: Arc<dyn RecordRepository<SensorGlucose>>,
    pub meter_glucose: Arc<dyn RecordRepository<MeterGlucose>>,
    pub calibrations: Arc<dyn RecordRepository<Calibration>>,
}

/// Selects the repository for a record type
pub trait RepositoryFor<T: TargetRecord> {
    fn repository(&self) -> &dyn RecordRepository<T>;
}

macro_rules! repository_for {
    ($ty:ty, $field:ident) => {
        impl RepositoryFor<$ty> for Repositories {
            fn repository(&self) -> &dyn RecordRepository<$ty> {
                self.$field.as_ref()
            }
        }
    };
}

repository_for!(Bolus, boluses);
repository_for!(CarbIntake, carb_intakes);
repository_for!(BgCheck, bg_checks);
repository_for!(Note, notes);
repository_for!(DeviceEvent, device_events);
repository_for!(BolusCalculation, bolus_calculations);
repository_for!(SensorGlucose, sensor_glucose);
repository_for!(MeterGlucose, meter_glucose);
repository_for!(Calibration, calibrations);

/// Whether an upsert inserted or replaced a row
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome<T> {
    Created(T),
    Updated(T),
}

impl<T> UpsertOutcome<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Created(record) | Self::Updated(record) => record,
        }
    }
}

/// Idempotent create-or-update over the per-kind repositories
#[derive(Clone)]
pub struct UpsertCoordinator {
    repositories: Repositories,
}

impl UpsertCoordinator {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Create or update `record` by its legacy id
    ///
    /// Records without a legacy id cannot be matched to an earlier run, so
    /// they skip the lookup and are always created.
    ///
    /// # Errors
    ///
    /// Propagates any repository error.
    pub async fn upsert<T>(&self, mut record: T) -> Result<UpsertOutcome<T>>
    where
        T: TargetRecord,
        Repositories: RepositoryFor<T>,
    {
        let repo = self.repositories.repository();
        let legacy_id = record.header().legacy_id.clone();

        let existing = match legacy_id.as_ref() {
            Some(legacy_id) => repo.get_by_legacy_id(legacy_id).await?,
            None => None,
        };

        let legacy = legacy_id.as_ref().map(|id| id.as_str());
        match existing {
            Some(existing) => {
                let id = existing.header().id;
                record.header_mut().id = id;
                let updated = repo.update(id, &record).await?;
                crate::log_decomposition!("updated", T::KIND, id, legacy);
                Ok(UpsertOutcome::Updated(updated))
            }
            None => {
                let created = repo.create(&record).await?;
                crate::log_decomposition!("created", T::KIND, created.header().id, legacy);
                Ok(UpsertOutcome::Created(created))
            }
        }
    }
}
