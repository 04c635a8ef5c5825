//! Typed access to resource state and plans.
//!
//! [`State`] and [`Plan`] hold the raw JSON object the host engine exchanges
//! with the provider. Resource handles read them into their Model structs
//! with [`State::get`] and write Models back with [`State::set`]; any
//! conversion failure is reported as a [`Diagnostics`] value, never a panic.

use crate::schema::{Diagnostic, Diagnostics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

macro_rules! json_document {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            raw: Value,
        }

        impl $name {
            /// Create an empty (null) document.
            pub fn new() -> Self {
                Self { raw: Value::Null }
            }

            /// Wrap a raw JSON value.
            pub fn from_value(raw: Value) -> Self {
                Self { raw }
            }

            /// Borrow the raw JSON value.
            pub fn raw(&self) -> &Value {
                &self.raw
            }

            /// Take the raw JSON value.
            pub fn into_value(self) -> Value {
                self.raw
            }

            /// Returns true if nothing has been stored yet.
            pub fn is_null(&self) -> bool {
                self.raw.is_null()
            }

            /// Deserialize the whole document into a Model.
            pub fn get<T: DeserializeOwned>(&self) -> Result<T, Diagnostics> {
                serde_json::from_value(self.raw.clone()).map_err(|err| {
                    Diagnostic::error("Value Conversion Error")
                        .with_detail(format!("failed to read {}: {}", $label, err))
                        .into()
                })
            }

            /// Replace the whole document with the serialized Model.
            pub fn set<T: Serialize>(&mut self, model: &T) -> Diagnostics {
                match serde_json::to_value(model) {
                    Ok(raw) => {
                        self.raw = raw;
                        Diagnostics::new()
                    },
                    Err(err) => Diagnostic::error("Value Conversion Error")
                        .with_detail(format!("failed to write {}: {}", $label, err))
                        .into(),
                }
            }

            /// Read a single top-level attribute. Absent and null both yield `None`.
            pub fn get_attribute<T: DeserializeOwned>(
                &self,
                name: &str,
            ) -> Result<Option<T>, Diagnostics> {
                match self.raw.get(name) {
                    None | Some(Value::Null) => Ok(None),
                    Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|err| {
                        Diagnostic::error("Value Conversion Error")
                            .with_detail(err.to_string())
                            .with_attribute(name)
                            .into()
                    }),
                }
            }

            /// Write a single top-level attribute, creating the object if needed.
            pub fn set_attribute<T: Serialize>(&mut self, name: &str, value: &T) -> Diagnostics {
                let value = match serde_json::to_value(value) {
                    Ok(v) => v,
                    Err(err) => {
                        return Diagnostic::error("Value Conversion Error")
                            .with_detail(err.to_string())
                            .with_attribute(name)
                            .into()
                    },
                };
                if !self.raw.is_object() {
                    self.raw = Value::Object(Map::new());
                }
                if let Value::Object(map) = &mut self.raw {
                    map.insert(name.to_string(), value);
                }
                Diagnostics::new()
            }
        }
    };
}

json_document!(
    /// Persisted resource state.
    State,
    "state"
);

json_document!(
    /// Planned resource values computed from configuration.
    Plan,
    "plan"
);

impl State {
    /// Drop the resource from state, which tells the host engine it is gone.
    pub fn remove_resource(&mut self) {
        self.raw = Value::Null;
    }
}

impl From<Plan> for State {
    fn from(plan: Plan) -> Self {
        State::from_value(plan.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Model {
        id: Option<String>,
        name: String,
        tags: Option<Vec<String>>,
    }

    #[test]
    fn test_get_and_set_roundtrip() {
        let mut state = State::new();
        assert!(state.is_null());

        let model = Model {
            id: Some("id-1".into()),
            name: "name".into(),
            tags: None,
        };
        assert!(state.set(&model).is_empty());
        assert_eq!(
            state.raw(),
            &json!({"id": "id-1", "name": "name", "tags": null})
        );

        let read: Model = state.get().unwrap();
        assert_eq!(read, model);
    }

    #[test]
    fn test_get_conversion_error() {
        let plan = Plan::from_value(json!({"name": 5}));
        let err = plan.get::<Model>().unwrap_err();
        assert!(err.has_error());
        assert_eq!(err[0].summary, "Value Conversion Error");
    }

    #[test]
    fn test_attributes() {
        let mut plan = Plan::new();
        assert!(plan.set_attribute("internal_id", &"abc").is_empty());
        assert_eq!(
            plan.get_attribute::<String>("internal_id").unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(plan.get_attribute::<String>("missing").unwrap(), None);

        let plan = Plan::from_value(json!({"id": null}));
        assert_eq!(plan.get_attribute::<String>("id").unwrap(), None);
    }

    #[test]
    fn test_remove_resource() {
        let mut state = State::from_value(json!({"id": "1"}));
        state.remove_resource();
        assert!(state.is_null());
    }
}
