//! Controller: turns one container's metadata into a live (possibly wrapped) instance.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::binder::{bind_parameters, CastParameters};
use crate::loader::Loader;
use crate::metadata::{ContainerKind, ContainerMeta};
use crate::registry::Locator;
use crate::transformer::Transformer;
use crate::value::Value;
use crate::wrapper::Wrapper;
use crate::CoreError;

/// Activation cache. Raw and wrapped instances never coexist.
enum CacheSlot {
    Uncached,
    /// Make procedure in progress on the given thread.
    Activating(ThreadId),
    Raw(Value),
    Wrapped(Value),
}

/// Wait-for graph shared by the controllers of one registry.
///
/// Tracks which thread holds each controller mid-activation and which
/// controller each blocked thread waits on, so a cycle spanning threads
/// fails instead of deadlocking. Always locked after a controller slot.
#[derive(Default)]
pub struct ActivationGraph {
    state: Mutex<GraphState>,
}

#[derive(Default)]
struct GraphState {
    holders: HashMap<String, ThreadId>,
    waiting: HashMap<ThreadId, String>,
}

impl ActivationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hold(&self, id: &str, thread: ThreadId) {
        self.lock().holders.insert(id.to_owned(), thread);
    }

    fn release(&self, id: &str) {
        self.lock().holders.remove(id);
    }

    /// Record that `thread` waits for `id`, held by `owner`. Returns false,
    /// recording nothing, when `owner` already waits on `thread` through the chain.
    fn wait_for(&self, thread: ThreadId, id: &str, owner: ThreadId) -> bool {
        let mut state = self.lock();
        let mut current = owner;
        for _ in 0..=state.waiting.len() {
            if current == thread {
                return false;
            }
            match state.waiting.get(&current).and_then(|held| state.holders.get(held)) {
                Some(next) => current = *next,
                None => break,
            }
        }
        state.waiting.insert(thread, id.to_owned());
        true
    }

    fn stop_waiting(&self, thread: ThreadId) {
        self.lock().waiting.remove(&thread);
    }
}

/// Owns one container's metadata and its activation cache.
pub struct Controller {
    metadata: ContainerMeta,
    locator: Weak<dyn Locator>,
    loader: Arc<dyn Loader>,
    transformer: Arc<dyn Transformer>,
    graph: Arc<ActivationGraph>,
    slot: Mutex<CacheSlot>,
    settled: Condvar,
}

impl Controller {
    pub fn new(
        metadata: ContainerMeta,
        locator: Weak<dyn Locator>,
        loader: Arc<dyn Loader>,
        transformer: Arc<dyn Transformer>,
        graph: Arc<ActivationGraph>,
    ) -> Self {
        Self {
            metadata,
            locator,
            loader,
            transformer,
            graph,
            slot: Mutex::new(CacheSlot::Uncached),
            settled: Condvar::new(),
        }
    }

    pub fn metadata(&self) -> &ContainerMeta {
        &self.metadata
    }

    /// True once a raw or wrapped instance is cached.
    pub fn activated(&self) -> bool {
        matches!(*self.lock_slot(), CacheSlot::Raw(_) | CacheSlot::Wrapped(_))
    }

    /// Return the cached instance, or run the make procedure.
    ///
    /// Non-cacheable containers run the make procedure on every call. Re-entering
    /// this controller from its own make procedure is a [`CoreError::CircularActivation`];
    /// another thread arriving mid-activation waits for the first one to settle, unless
    /// that thread is itself blocked on an activation this one holds.
    pub fn activate(&self) -> Result<Value, CoreError> {
        let me = thread::current().id();
        let mut slot = self.lock_slot();
        loop {
            let owner = match &*slot {
                CacheSlot::Raw(value) | CacheSlot::Wrapped(value) => return Ok(value.clone()),
                CacheSlot::Activating(owner) => *owner,
                CacheSlot::Uncached => break,
            };
            if owner == me || !self.graph.wait_for(me, &self.metadata.id, owner) {
                debug!(container = %self.metadata.id, "circular activation");
                return Err(CoreError::CircularActivation(self.metadata.id.clone()));
            }
            slot = self
                .settled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
            self.graph.stop_waiting(me);
        }
        *slot = CacheSlot::Activating(me);
        self.graph.hold(&self.metadata.id, me);
        drop(slot);

        let pending = Pending(self);
        let (value, wrapped) = self.make()?;
        if self.metadata.cacheable {
            *self.lock_slot() = if wrapped {
                CacheSlot::Wrapped(value.clone())
            } else {
                CacheSlot::Raw(value.clone())
            };
        }
        drop(pending);
        Ok(value)
    }

    fn lock_slot(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn make(&self) -> Result<(Value, bool), CoreError> {
        let locator = self
            .locator
            .upgrade()
            .ok_or_else(|| CoreError::Detached(self.metadata.id.clone()))?;

        debug!(
            container = %self.metadata.id,
            kind = self.metadata.kind.label(),
            target = %self.metadata.kind.target(),
            "activating"
        );
        let instance = self.instantiate(locator.as_ref())?;

        if self.metadata.is_lambda() {
            return Ok((instance, false));
        }

        let interceptions = locator.get_interceptions(&self.metadata.id);
        if interceptions.is_empty() {
            return Ok((instance, false));
        }

        let object = instance
            .as_object()
            .cloned()
            .ok_or_else(|| CoreError::NotInterceptable(self.metadata.id.clone()))?;
        debug!(
            container = %self.metadata.id,
            interceptions = interceptions.len(),
            "wrapping instance"
        );
        let wrapper = Wrapper::new(
            &self.metadata.id,
            object,
            interceptions,
            self.locator.clone(),
            Arc::clone(&self.transformer),
        );
        Ok((Value::Object(Arc::new(wrapper)), true))
    }

    fn instantiate(&self, locator: &dyn Locator) -> Result<Value, CoreError> {
        let id = self.metadata.id.as_str();
        let params = self.cast_params(locator)?;

        match &self.metadata.kind {
            ContainerKind::Entity {
                implementation: name,
            }
            | ContainerKind::Lambda { callable: name } => {
                let target = self.loader.resolve(name)?;
                let args = bind_parameters(id, target.signature(), params)?;
                target.call(args)
            }
            ContainerKind::Factorization {
                factory_id,
                factory_method,
            } => {
                let factory = locator.get(factory_id)?;
                let factory = factory
                    .as_object()
                    .ok_or_else(|| CoreError::NotAnObject(factory_id.clone()))?;
                let signature =
                    factory
                        .signature(factory_method)
                        .ok_or_else(|| CoreError::MissingMakeMethod {
                            container: id.to_owned(),
                            method: factory_method.clone(),
                        })?;
                let args = bind_parameters(id, &signature, params)?;
                factory.invoke(factory_method, args)
            }
        }
    }

    fn cast_params(&self, locator: &dyn Locator) -> Result<CastParameters, CoreError> {
        let params = &self.metadata.params;
        let mut cast = CastParameters::default();

        for (index, definition) in params.sequence().iter().enumerate() {
            let value = self
                .transformer
                .cast(definition, locator)
                .map_err(|e| self.interpretation_error(e, format!("{} (positional #{})", definition, index)))?;
            cast.sequence.push(value);
        }

        for (key, definition) in params.items() {
            let value = self
                .transformer
                .cast(definition, locator)
                .map_err(|e| self.interpretation_error(e, format!("{:?} -> {} (keyword)", key, definition)))?;
            cast.items.insert(key.clone(), value);
        }

        Ok(cast)
    }

    fn interpretation_error(&self, err: CoreError, target: String) -> CoreError {
        match err {
            CoreError::Cast(reason) => CoreError::ValueInterpretation {
                container: self.metadata.id.clone(),
                target,
                reason,
            },
            other => other,
        }
    }
}

/// Leaves the slot `Uncached` unless the activation stored a result, and wakes waiters.
/// Also runs when the make procedure fails or unwinds.
struct Pending<'c>(&'c Controller);

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let mut slot = self.0.lock_slot();
        if matches!(*slot, CacheSlot::Activating(_)) {
            *slot = CacheSlot::Uncached;
        }
        self.0.graph.release(&self.0.metadata.id);
        drop(slot);
        self.0.settled.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other_thread() -> ThreadId {
        thread::spawn(|| thread::current().id()).join().unwrap()
    }

    #[test]
    fn wait_chain_back_to_the_waiter_is_refused() {
        let graph = ActivationGraph::new();
        let (t1, t2, t3) = (other_thread(), other_thread(), other_thread());
        graph.hold("a", t1);
        graph.hold("b", t2);
        graph.hold("c", t3);

        assert!(graph.wait_for(t1, "b", t2));
        assert!(graph.wait_for(t2, "c", t3));
        // t3 -> a (t1) -> b (t2) -> c (t3)
        assert!(!graph.wait_for(t3, "a", t1));

        graph.stop_waiting(t2);
        assert!(graph.wait_for(t3, "a", t1));
    }
}
