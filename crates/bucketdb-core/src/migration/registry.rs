use crate::{error::InternalError, model::Model};
use std::{any::Any, collections::BTreeMap, fmt};

type MigrationFn<M> = Box<dyn Fn(&mut M) -> Result<(), InternalError> + Send + Sync>;

///
/// Migrations
///
/// Ordered upgrade steps for one record type. `steps[0]` is the version 1
/// baseline; `steps[n]` upgrades a record from version `n` to `n + 1`.
///

struct Migrations<M> {
    steps: Vec<MigrationFn<M>>,
}

impl<M> Migrations<M> {
    #[expect(clippy::cast_possible_truncation)]
    const fn current(&self) -> u32 {
        self.steps.len() as u32
    }
}

///
/// MigrationRegistry
///
/// Per-type schema versions and the steps between them.
///
/// Built once during wiring and then shared read-only (usually behind an
/// `Arc`). Registration mistakes are programming errors and panic.
///

#[derive(Default)]
pub struct MigrationRegistry {
    types: BTreeMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Step for a version that needs no data change, typically version 1.
pub fn no_modification<M>(_: &mut M) -> Result<(), InternalError> {
    Ok(())
}

impl MigrationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the step producing `version` of `M`.
    ///
    /// Versions start at 1 and must be registered in order, each exactly
    /// once. The version 1 step is never run on reads; pass
    /// [`no_modification`] for it.
    ///
    /// Panics on a duplicate, a gap, or a path reused by another type.
    pub fn register<M, F>(&mut self, version: u32, step: F)
    where
        M: Model,
        F: Fn(&mut M) -> Result<(), InternalError> + Send + Sync + 'static,
    {
        let entry = self
            .types
            .entry(M::PATH)
            .or_insert_with(|| Box::new(Migrations::<M> { steps: Vec::new() }));

        let Some(migrations) = entry.downcast_mut::<Migrations<M>>() else {
            panic!("schema path {} registered with a different type", M::PATH);
        };

        let current = migrations.current();
        assert!(
            version > current,
            "schema {} version {version} registered twice",
            M::PATH
        );
        assert!(
            version == current + 1,
            "schema {} version {version} registered out of order (expected {})",
            M::PATH,
            current + 1
        );

        migrations.steps.push(Box::new(step));
    }

    /// Highest registered version of `M`, or `None` if `M` is unknown.
    #[must_use]
    pub fn current_version<M: Model>(&self) -> Option<u32> {
        self.migrations::<M>().map(Migrations::current)
    }

    fn migrations<M: Model>(&self) -> Option<&Migrations<M>> {
        self.types
            .get(M::PATH)
            .and_then(|entry| entry.downcast_ref::<Migrations<M>>())
    }

    /// Upgrade `value`, stored at version `from`, to the current version.
    ///
    /// Returns the version the value now has.
    pub fn migrate<M: Model>(&self, value: &mut M, from: u32) -> Result<u32, InternalError> {
        let migrations = self.migrations::<M>().ok_or_else(|| {
            InternalError::migration_config(format!("schema not registered: {}", M::PATH))
        })?;
        let current = migrations.current();

        if from == 0 {
            return Err(InternalError::migration_corruption(format!(
                "schema version 0 is invalid: {}",
                M::PATH
            )));
        }
        if from > current {
            return Err(InternalError::migration_config(format!(
                "schema {} stored at version {from}, newer than current {current}",
                M::PATH
            )));
        }

        for step in &migrations.steps[from as usize..] {
            step(value)?;
        }

        Ok(current)
    }
}
