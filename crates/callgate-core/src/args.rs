//! Call arguments and the two binding strategies.
//!
//! The caller picks the strategy through the container shape: a mapping binds
//! by name, a sequence binds by position. Both end up as a name-keyed map
//! checked against the operation's declared parameters.

use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::service::Param;

/// Arguments of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArguments {
    /// Keyword binding: every key names a declared parameter.
    Keyword(Map<String, Value>),
    /// Positional binding: values fill parameters in declaration order.
    Positional(Vec<Value>),
}

impl Default for CallArguments {
    fn default() -> Self {
        CallArguments::Keyword(Map::new())
    }
}

impl From<Map<String, Value>> for CallArguments {
    fn from(map: Map<String, Value>) -> Self {
        CallArguments::Keyword(map)
    }
}

impl From<Vec<Value>> for CallArguments {
    fn from(values: Vec<Value>) -> Self {
        CallArguments::Positional(values)
    }
}

impl TryFrom<Value> for CallArguments {
    type Error = RpcError;

    /// `null` means "no arguments"; any other scalar is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(CallArguments::default()),
            Value::Object(map) => Ok(CallArguments::Keyword(map)),
            Value::Array(values) => Ok(CallArguments::Positional(values)),
            _ => Err(RpcError::invalid_argument(
                "function parameters should be passed as a mapping or a sequence",
            )),
        }
    }
}

/// Why arguments did not match a parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("expected at least {expected} arguments, got {got}")]
    TooFew { expected: usize, got: usize },

    #[error("expected at most {expected} arguments, got {got}")]
    TooMany { expected: usize, got: usize },

    #[error("unexpected parameter {0}")]
    UnknownParameter(String),

    #[error("missing required parameter {0}")]
    MissingParameter(&'static str),
}

impl CallArguments {
    /// Match the arguments against `params`, producing a name-keyed map.
    ///
    /// Optional parameters that were not supplied are left out of the map.
    pub fn bind(self, params: &[Param]) -> Result<Map<String, Value>, BindError> {
        match self {
            CallArguments::Keyword(map) => {
                let declared = |key: &String| params.iter().any(|p| p.name == key.as_str());
                if let Some(key) = map.keys().find(|k| !declared(k)) {
                    return Err(BindError::UnknownParameter(key.clone()));
                }
                if let Some(missing) = params
                    .iter()
                    .find(|p| p.required && !map.contains_key(p.name))
                {
                    return Err(BindError::MissingParameter(missing.name));
                }
                Ok(map)
            }
            CallArguments::Positional(values) => {
                let required = params.iter().filter(|p| p.required).count();
                if values.len() < required {
                    return Err(BindError::TooFew {
                        expected: required,
                        got: values.len(),
                    });
                }
                if values.len() > params.len() {
                    return Err(BindError::TooMany {
                        expected: params.len(),
                        got: values.len(),
                    });
                }
                Ok(params
                    .iter()
                    .zip(values)
                    .map(|(p, v)| (p.name.to_string(), v))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const QUERY: &[Param] = &[
        Param::required("mask"),
        Param::optional("start"),
        Param::optional("end"),
    ];

    fn args(value: Value) -> CallArguments {
        CallArguments::try_from(value).unwrap()
    }

    #[test]
    fn test_container_shape_selects_strategy() {
        assert!(matches!(args(json!({"a": 1})), CallArguments::Keyword(_)));
        assert!(matches!(args(json!([1, 2])), CallArguments::Positional(_)));
        assert_eq!(args(Value::Null), CallArguments::default());

        let err = CallArguments::try_from(json!("not-a-container")).unwrap_err();
        assert_eq!(err.code, crate::error::EINVAL);
        assert!(CallArguments::try_from(json!(42)).is_err());
    }

    #[test]
    fn test_keyword_binding() {
        let bound = args(json!({"mask": "*", "end": 10})).bind(QUERY).unwrap();
        assert_eq!(Value::Object(bound), json!({"mask": "*", "end": 10}));

        assert_eq!(
            args(json!({"mask": "*", "limit": 3})).bind(QUERY),
            Err(BindError::UnknownParameter("limit".into()))
        );
        assert_eq!(
            args(json!({"start": 1})).bind(QUERY),
            Err(BindError::MissingParameter("mask"))
        );
    }

    #[test]
    fn test_positional_binding() {
        let bound = args(json!(["*", 5])).bind(QUERY).unwrap();
        assert_eq!(Value::Object(bound), json!({"mask": "*", "start": 5}));

        assert_eq!(
            args(json!([])).bind(QUERY),
            Err(BindError::TooFew { expected: 1, got: 0 })
        );
        assert_eq!(
            args(json!([1, 2, 3, 4])).bind(QUERY),
            Err(BindError::TooMany { expected: 3, got: 4 })
        );
    }

    #[test]
    fn test_empty_arguments_fit_parameterless_operation() {
        assert!(CallArguments::default().bind(&[]).unwrap().is_empty());
        assert!(args(json!([])).bind(&[]).is_ok());
        assert!(args(json!([1])).bind(&[]).is_err());
    }
}
