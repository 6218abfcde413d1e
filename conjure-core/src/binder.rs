//! Parameter binding: match supplied definitions against a target's formal parameters.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::signature::{FormalParameter, Signature};
use crate::value::{Arguments, Value};
use crate::CoreError;

/// Supplied parameters after casting: positional values in order, keyword values by name.
#[derive(Clone, Debug, Default)]
pub struct CastParameters {
    pub sequence: Vec<Value>,
    pub items: BTreeMap<String, Value>,
}

/// Where a fixed parameter got its value from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceType {
    /// Index into the positional definitions.
    Positional(usize),
    /// Key of the keyword definition.
    Keyword(String),
}

/// Binding-time bookkeeping for one fixed formal parameter. Lives for one binding attempt.
#[derive(Clone, Debug)]
pub struct ParameterMetadata<'s> {
    pub index: usize,
    pub required: bool,
    pub spec: &'s FormalParameter,
    pub value: Option<Value>,
    pub source: Option<SourceType>,
}

impl<'s> ParameterMetadata<'s> {
    fn new(index: usize, spec: &'s FormalParameter) -> Self {
        Self {
            index,
            required: spec.required(),
            spec,
            value: None,
            source: None,
        }
    }

    pub fn name(&self) -> &'s str {
        &self.spec.name
    }

    pub fn defined(&self) -> bool {
        self.value.is_some()
    }

    fn define(&mut self, value: Value, source: SourceType) {
        self.value = Some(value);
        self.source = Some(source);
    }
}

/// Bind `given` against `signature` and compose the call arguments.
///
/// Keyword definitions are matched first; positional definitions then fill the
/// remaining fixed parameters in declaration order. A positional definition that
/// lands on a parameter already defined by keyword is passed through as an extra
/// positional value, and so is everything past the last fixed parameter.
///
/// When every fixed parameter is bound the call is purely positional. When some
/// optional parameter is left to the target's default the call switches to
/// keyword form and extra positional values are dropped.
pub fn bind_parameters(
    container: &str,
    signature: &Signature,
    given: CastParameters,
) -> Result<Arguments, CoreError> {
    let mut fixed: Vec<ParameterMetadata<'_>> = signature
        .fixed()
        .enumerate()
        .map(|(index, spec)| ParameterMetadata::new(index, spec))
        .collect();
    let mut extra_positional = Vec::new();
    let mut extra_keyword = BTreeMap::new();

    debug!(container, given = ?given, "binding parameters");

    for (key, value) in given.items {
        match fixed.iter_mut().find(|p| p.name() == key) {
            Some(param) => {
                debug!(container, key = %key, value = %value, "keyword parameter defined");
                param.define(value, SourceType::Keyword(key));
            }
            None => {
                debug!(container, key = %key, value = %value, "keyword parameter considered as extra");
                extra_keyword.insert(key, value);
            }
        }
    }

    let mut cursor = 0;
    for value in given.sequence {
        if cursor >= fixed.len() {
            debug!(container, value = %value, "positional parameter considered as extra");
            extra_positional.push(value);
            continue;
        }

        let param = &mut fixed[cursor];
        if param.defined() {
            debug!(container, value = %value, "positional parameter kept for backward compatibility");
            extra_positional.push(value);
            continue;
        }

        debug!(container, name = param.name(), value = %value, "positional parameter defined");
        param.define(value, SourceType::Positional(cursor));
        cursor += 1;
    }

    let mut delegated = 0;
    let mut missing = Vec::new();
    for param in &fixed {
        assert_declared_type(container, param)?;

        if param.defined() {
            continue;
        }
        if !param.required {
            debug!(container, name = param.name(), "parameter delegated to the target default");
            delegated += 1;
            continue;
        }
        debug!(container, name = param.name(), "parameter not defined");
        missing.push(format!("{} (position {})", param.name(), param.index));
    }

    if !missing.is_empty() {
        return Err(CoreError::MissingParameters {
            container: container.to_owned(),
            missing,
        });
    }

    if delegated > 0 {
        if !extra_positional.is_empty() {
            info!(
                container,
                dropped = extra_positional.len(),
                "not all fixed parameters defined; positional extras ignored"
            );
        }
        let mut kwargs: BTreeMap<String, Value> = fixed
            .into_iter()
            .filter_map(|p| p.value.map(|v| (p.spec.name.clone(), v)))
            .collect();
        kwargs.extend(extra_keyword);
        return Ok(Arguments {
            args: Vec::new(),
            kwargs,
        });
    }

    let mut args: Vec<Value> = fixed.into_iter().filter_map(|p| p.value).collect();
    args.extend(extra_positional);
    Ok(Arguments {
        args,
        kwargs: extra_keyword,
    })
}

fn assert_declared_type(container: &str, param: &ParameterMetadata<'_>) -> Result<(), CoreError> {
    let (Some(value), Some(tag)) = (&param.value, &param.spec.annotation) else {
        return Ok(());
    };
    match tag.check(value) {
        Some(true) => Ok(()),
        Some(false) => Err(CoreError::UnexpectedDefinitionType {
            container: container.to_owned(),
            given: value.type_name().to_owned(),
            value: value.to_string(),
            expected: tag.name().to_owned(),
            parameter: param.name().to_owned(),
        }),
        None => {
            debug!(container, name = param.name(), tag = tag.name(), "annotation not checkable; skipped");
            Ok(())
        }
    }
}
