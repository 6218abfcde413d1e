//! Wrapper: runs before/pre/post/after handler chains around calls to an activated instance.

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::metadata::{Definition, Event, Interception};
use crate::registry::Locator;
use crate::signature::Signature;
use crate::transformer::Transformer;
use crate::value::{Arguments, Instance, Object, Value};
use crate::CoreError;

/// Stands in for an activated instance whose container has interceptions.
///
/// Handlers are containers too; they are activated through the locator when
/// their event fires, not when the wrapper is built.
pub struct Wrapper {
    id: String,
    instance: Instance,
    interceptions: Arc<[Interception]>,
    locator: Weak<dyn Locator>,
    transformer: Arc<dyn Transformer>,
}

impl Wrapper {
    pub fn new(
        id: &str,
        instance: Instance,
        interceptions: Arc<[Interception]>,
        locator: Weak<dyn Locator>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            id: id.to_owned(),
            instance,
            interceptions,
            locator,
            transformer,
        }
    }

    fn handlers<'a>(&'a self, method: &'a str, event: Event) -> impl Iterator<Item = &'a Interception> + 'a {
        self.interceptions
            .iter()
            .filter(move |i| i.event == event && i.intercepted_method == method)
    }

    fn handle(
        &self,
        locator: &dyn Locator,
        interception: &Interception,
        args: Arguments,
    ) -> Result<Value, CoreError> {
        trace!(
            actor = %self.id,
            method = %interception.intercepted_method,
            event = %interception.event,
            handler = %interception.handler,
            handling_method = %interception.handling_method,
            "dispatching interception"
        );
        let handler = locator.get(&interception.handler)?;
        let handler = handler
            .as_object()
            .ok_or_else(|| CoreError::NotAnObject(interception.handler.clone()))?;
        handler.invoke(&interception.handling_method, args)
    }

    /// Call a `before`/`after` handler with its own declared parameters.
    fn handle_with_own_params(
        &self,
        locator: &dyn Locator,
        interception: &Interception,
    ) -> Result<Value, CoreError> {
        let params = &interception.handling_params;
        let mut args = Arguments::new();
        for definition in params.sequence() {
            args.args.push(self.cast(interception, definition, locator)?);
        }
        for (key, definition) in params.items() {
            args.kwargs
                .insert(key.clone(), self.cast(interception, definition, locator)?);
        }
        self.handle(locator, interception, args)
    }

    fn cast(
        &self,
        interception: &Interception,
        definition: &Definition,
        locator: &dyn Locator,
    ) -> Result<Value, CoreError> {
        self.transformer
            .cast(definition, locator)
            .map_err(|e| match e {
                CoreError::Cast(reason) => CoreError::ValueInterpretation {
                    container: interception.handler.clone(),
                    target: format!("{} ({} handler parameter)", definition, interception.event),
                    reason,
                },
                other => other,
            })
    }

    fn dispatch(&self, method: &str, args: Arguments) -> Result<Value, CoreError> {
        if !self.interceptions.iter().any(|i| i.intercepted_method == method) {
            return self.instance.invoke(method, args);
        }

        let locator = self
            .locator
            .upgrade()
            .ok_or_else(|| CoreError::Detached(self.id.clone()))?;
        let locator = locator.as_ref();

        for interception in self.handlers(method, Event::Before) {
            self.handle_with_own_params(locator, interception)?;
        }

        for interception in self.handlers(method, Event::Pre) {
            self.handle(locator, interception, args.clone())?;
        }

        let outcome = self.instance.invoke(method, args).and_then(|result| {
            self.handlers(method, Event::Post)
                .try_fold(result, |result, interception| {
                    self.handle(locator, interception, Arguments::positional(vec![result]))
                })
        });

        let mut after_error = None;
        for interception in self.handlers(method, Event::After) {
            if let Err(e) = self.handle_with_own_params(locator, interception) {
                after_error.get_or_insert(e);
            }
        }

        match (outcome, after_error) {
            (Err(e), _) | (Ok(_), Some(e)) => Err(e),
            (Ok(result), None) => Ok(result),
        }
    }
}

impl Object for Wrapper {
    fn type_name(&self) -> &str {
        self.instance.type_name()
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        self.instance.signature(method)
    }

    fn invoke(&self, method: &str, args: Arguments) -> Result<Value, CoreError> {
        self.dispatch(method, args)
    }
}
