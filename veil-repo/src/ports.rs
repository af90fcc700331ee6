//! The public repository surface.

use crate::context::ChangeContext;
use crate::engine::{ExecutionEngine, SaveReport};
use crate::error::{RepoError, RepoResult};
use std::sync::Arc;
use std::time::Duration;
use veil_model::{Entity, SchemaRegistry};
use veil_query::{compose, Filter, QuerySpec, TrackingMode};
use veil_types::Value;

/// Typed read operations over arbitrary entity types.
///
/// Every read defaults to untracked materialization; callers wanting
/// results they can hand to a write operation pass an explicit
/// [`TrackingMode::Tracked`], which registers them `Unchanged` in the
/// context. Reads take `&mut self` for exactly that registration.
pub trait ReadPort {
    /// Materializes all matches. There is no implicit cap; a broad filter
    /// returns a broad result.
    fn get<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Vec<E>>;

    /// Strict single-match read: zero matches is `None`, more than one is
    /// [`RepoError::MultipleResults`].
    fn get_one<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Option<E>>;

    /// First row under the given ordering (arbitrary when unordered).
    /// Never errors on multiple matches.
    fn get_first<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Option<E>>;

    /// Resolves by primary key via the engine's direct lookup path.
    fn get_by_id<E: Entity>(
        &mut self,
        key: &E::Key,
        tracking: TrackingMode,
    ) -> RepoResult<Option<E>>;

    /// Matching-row count, computed as an aggregate.
    fn count<E: Entity>(&self, filter: Option<Filter>) -> RepoResult<u64>;

    /// Whether any row matches, computed as an aggregate.
    fn exists<E: Entity>(&self, filter: Option<Filter>) -> RepoResult<bool>;

    /// Escape hatch for hand-authored queries. The SQL travels to the
    /// engine verbatim with its parameters; callers are responsible for
    /// parameterization, and values are never concatenated into the text
    /// here.
    fn from_sql_raw<E: Entity>(
        &mut self,
        sql: &str,
        params: &[Value],
        tracking: TrackingMode,
    ) -> RepoResult<Vec<E>>;

    /// Adjusts the engine's per-statement timeout.
    fn set_command_timeout(&self, timeout: Duration);
}

/// Typed write operations and save orchestration.
pub trait WritePort {
    fn create<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()>;

    fn create_range<E: Entity>(&mut self, entities: &mut [E]) -> RepoResult<()>;

    fn update<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()>;

    /// Stages the update and immediately saves the context.
    fn update_and_save<E: Entity>(&mut self, entity: &mut E) -> RepoResult<SaveReport>;

    fn delete<E: Entity>(&mut self, entity: &E) -> RepoResult<()>;

    /// Resolves the entity by id and stages its removal. A missing id is
    /// not an error: returns `false` with nothing staged.
    fn delete_by_id<E: Entity>(&mut self, key: &E::Key) -> RepoResult<bool>;

    /// Commits all staged changes in one unit.
    ///
    /// On success the tracked set is cleared so the next logical operation
    /// starts clean. On a validation failure the staged changes remain
    /// pending so the caller can correct and retry. This layer never
    /// retries on its own: blind retries of non-idempotent writes are the
    /// caller's decision.
    fn save(&mut self) -> RepoResult<SaveReport>;

    /// Executes a non-entity statement, returning the affected-row count.
    fn execute_sql(&mut self, sql: &str, params: &[Value]) -> RepoResult<u64>;
}

/// The repository: composed reads, staged writes, one engine.
///
/// Owned by a single logical unit of work; see the crate docs for the
/// concurrency discipline. Wrapping a `Repository` is the extension
/// mechanism; there is nothing to subclass.
pub struct Repository<Eng> {
    engine: Eng,
    registry: Arc<SchemaRegistry>,
    context: ChangeContext,
}

impl<Eng: ExecutionEngine> Repository<Eng> {
    #[must_use]
    pub fn new(engine: Eng, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            engine,
            registry,
            context: ChangeContext::new(),
        }
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Eng {
        &self.engine
    }

    /// Read-only view of the change context, for state inspection.
    #[must_use]
    pub fn context(&self) -> &ChangeContext {
        &self.context
    }

    fn require_registered<E: Entity>(&self) -> RepoResult<()> {
        if self.registry.contains(E::NAME) {
            Ok(())
        } else {
            Err(RepoError::UnknownEntityType(E::NAME.to_string()))
        }
    }

    fn register_if_tracked<E: Entity>(
        &mut self,
        tracking: TrackingMode,
        entities: &[E],
    ) -> RepoResult<()> {
        if tracking == TrackingMode::Tracked {
            for entity in entities {
                self.context.register_unchanged(entity)?;
            }
        }
        Ok(())
    }
}

impl<Eng: ExecutionEngine> ReadPort for Repository<Eng> {
    fn get<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Vec<E>> {
        let query = compose::<E>(&self.registry, spec)?;
        let tracking = query.tracking;
        let entities = self.engine.fetch::<E>(&query)?;
        self.register_if_tracked(tracking, &entities)?;
        Ok(entities)
    }

    fn get_one<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Option<E>> {
        // A window of two is enough to detect a contract violation without
        // materializing the full match set.
        let query = compose::<E>(&self.registry, spec.take(2))?;
        let tracking = query.tracking;
        let mut entities = self.engine.fetch::<E>(&query)?;
        if entities.len() > 1 {
            return Err(RepoError::MultipleResults {
                entity_type: E::NAME,
            });
        }
        self.register_if_tracked(tracking, &entities)?;
        Ok(entities.pop())
    }

    fn get_first<E: Entity>(&mut self, spec: QuerySpec) -> RepoResult<Option<E>> {
        let query = compose::<E>(&self.registry, spec.take(1))?;
        let tracking = query.tracking;
        let mut entities = self.engine.fetch::<E>(&query)?;
        self.register_if_tracked(tracking, &entities)?;
        Ok(entities.pop())
    }

    fn get_by_id<E: Entity>(
        &mut self,
        key: &E::Key,
        tracking: TrackingMode,
    ) -> RepoResult<Option<E>> {
        self.require_registered::<E>()?;
        let entity = self.engine.fetch_by_key::<E>(&key.clone().into())?;
        if let Some(entity) = &entity {
            self.register_if_tracked(tracking, std::slice::from_ref(entity))?;
        }
        Ok(entity)
    }

    fn count<E: Entity>(&self, filter: Option<Filter>) -> RepoResult<u64> {
        self.require_registered::<E>()?;
        Ok(self.engine.count(E::NAME, filter.as_ref())?)
    }

    fn exists<E: Entity>(&self, filter: Option<Filter>) -> RepoResult<bool> {
        self.require_registered::<E>()?;
        Ok(self.engine.exists(E::NAME, filter.as_ref())?)
    }

    fn from_sql_raw<E: Entity>(
        &mut self,
        sql: &str,
        params: &[Value],
        tracking: TrackingMode,
    ) -> RepoResult<Vec<E>> {
        self.require_registered::<E>()?;
        let entities = self.engine.fetch_raw::<E>(sql, params)?;
        self.register_if_tracked(tracking, &entities)?;
        Ok(entities)
    }

    fn set_command_timeout(&self, timeout: Duration) {
        self.engine.set_command_timeout(timeout);
    }
}

impl<Eng: ExecutionEngine> WritePort for Repository<Eng> {
    fn create<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()> {
        self.require_registered::<E>()?;
        self.context.create(entity)
    }

    fn create_range<E: Entity>(&mut self, entities: &mut [E]) -> RepoResult<()> {
        self.require_registered::<E>()?;
        self.context.create_range(entities)
    }

    fn update<E: Entity>(&mut self, entity: &mut E) -> RepoResult<()> {
        self.require_registered::<E>()?;
        self.context.update(entity)
    }

    fn update_and_save<E: Entity>(&mut self, entity: &mut E) -> RepoResult<SaveReport> {
        self.update(entity)?;
        self.save()
    }

    fn delete<E: Entity>(&mut self, entity: &E) -> RepoResult<()> {
        self.require_registered::<E>()?;
        self.context.delete(entity);
        Ok(())
    }

    fn delete_by_id<E: Entity>(&mut self, key: &E::Key) -> RepoResult<bool> {
        self.require_registered::<E>()?;
        // Resolve first; the context is only touched once the lookup has
        // returned, so an abandoned call stages nothing.
        match self.engine.fetch_by_key::<E>(&key.clone().into())? {
            Some(entity) => {
                self.context.delete(&entity);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn save(&mut self) -> RepoResult<SaveReport> {
        let ops = self.context.staged();
        if ops.is_empty() {
            return Ok(SaveReport { rows_affected: 0 });
        }
        tracing::debug!(staged = ops.len(), "committing change-set");
        match self.engine.save(&ops) {
            Ok(report) => {
                self.context.clear();
                Ok(report)
            }
            // Staged changes stay pending on failure so the caller can
            // inspect, correct and retry.
            Err(err) => Err(err.into()),
        }
    }

    fn execute_sql(&mut self, sql: &str, params: &[Value]) -> RepoResult<u64> {
        Ok(self.engine.execute_sql(sql, params)?)
    }
}
