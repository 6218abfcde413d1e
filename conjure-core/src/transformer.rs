//! Casting parameter definitions into values.

use serde_json::Value as Json;

use crate::metadata::Definition;
use crate::registry::Locator;
use crate::value::Value;
use crate::CoreError;

/// Turns a [`Definition`] into a [`Value`]. An uninterpretable definition is [`CoreError::Cast`].
pub trait Transformer: Send + Sync {
    fn cast(&self, definition: &Definition, locator: &dyn Locator) -> Result<Value, CoreError>;
}

/// Default transformer: literals as-is, references through the locator, typed raw text parsed by kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeTransformer;

impl TypeTransformer {
    fn cast_typed(&self, kind: &str, raw: &str, locator: &dyn Locator) -> Result<Value, CoreError> {
        let data = match kind {
            "entity" => return locator.get(raw.trim()),
            "str" | "unicode" => Json::String(raw.to_owned()),
            "int" => raw
                .trim()
                .parse::<i64>()
                .map(Json::from)
                .map_err(|e| CoreError::Cast(format!("{:?} as int: {}", raw, e)))?,
            "float" => {
                let f = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| CoreError::Cast(format!("{:?} as float: {}", raw, e)))?;
                serde_json::Number::from_f64(f)
                    .map(Json::Number)
                    .ok_or_else(|| CoreError::Cast(format!("{:?} is not a finite float", raw)))?
            }
            "bool" => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Json::Bool(true),
                "false" | "0" | "no" => Json::Bool(false),
                other => return Err(CoreError::Cast(format!("{:?} as bool", other))),
            },
            "null" | "none" => Json::Null,
            "json" | "list" | "dict" => {
                let parsed: Json = serde_json::from_str(raw)
                    .map_err(|e| CoreError::Cast(format!("{:?} as {}: {}", raw, kind, e)))?;
                let shape_ok = match kind {
                    "list" => parsed.is_array(),
                    "dict" => parsed.is_object(),
                    _ => true,
                };
                if !shape_ok {
                    return Err(CoreError::Cast(format!("{:?} is not a {}", raw, kind)));
                }
                parsed
            }
            other => return Err(CoreError::Cast(format!("unsupported kind {:?}", other))),
        };
        Ok(Value::Data(data))
    }
}

impl Transformer for TypeTransformer {
    fn cast(&self, definition: &Definition, locator: &dyn Locator) -> Result<Value, CoreError> {
        match definition {
            Definition::Literal(data) => Ok(Value::Data(data.clone())),
            Definition::Reference(id) => locator.get(id),
            Definition::Typed { kind, raw } => self.cast_typed(kind, raw, locator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Interception;
    use serde_json::json;
    use std::sync::Arc;

    struct NoContainers;

    impl Locator for NoContainers {
        fn get(&self, id: &str) -> Result<Value, CoreError> {
            Err(CoreError::UnknownContainer(id.to_owned()))
        }

        fn get_interceptions(&self, _id: &str) -> Arc<[Interception]> {
            Arc::from(Vec::new())
        }
    }

    fn cast(definition: Definition) -> Result<Value, CoreError> {
        TypeTransformer.cast(&definition, &NoContainers)
    }

    #[test]
    fn typed_values_are_parsed() {
        assert_eq!(cast(Definition::typed("int", " 42 ")).unwrap().as_data(), Some(&json!(42)));
        assert_eq!(cast(Definition::typed("bool", "True")).unwrap().as_data(), Some(&json!(true)));
        assert_eq!(cast(Definition::typed("str", " a ")).unwrap().as_data(), Some(&json!(" a ")));
        assert_eq!(
            cast(Definition::typed("list", "[1, 2]")).unwrap().as_data(),
            Some(&json!([1, 2]))
        );
    }

    #[test]
    fn bad_raw_text_is_a_cast_error() {
        assert!(matches!(cast(Definition::typed("int", "forty")), Err(CoreError::Cast(_))));
        assert!(matches!(cast(Definition::typed("dict", "[1]")), Err(CoreError::Cast(_))));
        assert!(matches!(cast(Definition::typed("decimal", "1")), Err(CoreError::Cast(_))));
    }

    #[test]
    fn references_go_through_the_locator() {
        assert!(matches!(
            cast(Definition::reference("beta")),
            Err(CoreError::UnknownContainer(id)) if id == "beta"
        ));
    }
}
