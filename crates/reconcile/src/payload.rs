//! Incoming configuration documents
//!
//! A payload is an untyped JSON object exported from a tenant. The engine
//! only reads a handful of well-known properties from it; everything else is
//! carried through to the remote write untouched.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Property holding the object's schema type
pub const ODATA_TYPE: &str = "@odata.type";
/// Property holding the collection URL the object was read from
pub const ODATA_CONTEXT: &str = "@odata.context";

/// An exported configuration object plus its type discriminator
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationPayload {
    document: Map<String, Value>,
    discriminator: String,
}

impl ConfigurationPayload {
    /// Parse a payload from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Build a payload from an already-parsed JSON value
    ///
    /// The discriminator is `@odata.type`; exports of types that are not
    /// derived from a base type only carry `@odata.context`, which is used as
    /// the fallback.
    pub fn from_value(value: Value) -> Result<Self> {
        let document = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidPayload(format!(
                    "expected a JSON object, found {}",
                    json_type_name(&other)
                )));
            }
        };

        let discriminator = [ODATA_TYPE, ODATA_CONTEXT]
            .iter()
            .find_map(|key| {
                document
                    .get(*key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .ok_or(Error::MissingDiscriminator)?
            .to_string();

        Ok(Self {
            document,
            discriminator,
        })
    }

    /// The type discriminator used for classification
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// The object's id in the tenant it was exported from
    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_field("displayName")
    }

    /// `isBuiltIn` flag, present on scope tags
    pub fn is_built_in(&self) -> Option<bool> {
        self.document.get("isBuiltIn").and_then(Value::as_bool)
    }

    /// The full document as exported
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// The full document as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reads_odata_type() {
        let payload = ConfigurationPayload::parse(
            r##"{"@odata.type":"#microsoft.graph.windows10GeneralConfiguration","id":"A","displayName":"Baseline"}"##,
        )
        .unwrap();

        assert_eq!(
            payload.discriminator(),
            "#microsoft.graph.windows10GeneralConfiguration"
        );
        assert_eq!(payload.id(), Some("A"));
        assert_eq!(payload.display_name(), Some("Baseline"));
        assert_eq!(payload.is_built_in(), None);
    }

    #[test]
    fn test_falls_back_to_odata_context() {
        let payload = ConfigurationPayload::from_value(json!({
            "@odata.context": "https://graph.microsoft.com/beta/$metadata#deviceManagement/deviceManagementScripts/$entity",
            "id": "s1",
            "displayName": "Set wallpaper"
        }))
        .unwrap();

        assert!(payload.discriminator().contains("deviceManagementScripts"));
    }

    #[test]
    fn test_odata_type_wins_over_context() {
        let payload = ConfigurationPayload::from_value(json!({
            "@odata.context": "https://graph.microsoft.com/beta/$metadata#deviceManagement/roleScopeTags/$entity",
            "@odata.type": "#microsoft.graph.roleScopeTag",
        }))
        .unwrap();

        assert_eq!(payload.discriminator(), "#microsoft.graph.roleScopeTag");
    }

    #[test]
    fn test_missing_discriminator() {
        let err = ConfigurationPayload::from_value(json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, Error::MissingDiscriminator));

        let err = ConfigurationPayload::from_value(json!({"@odata.type": ""})).unwrap_err();
        assert!(matches!(err, Error::MissingDiscriminator));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = ConfigurationPayload::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(ref m) if m.contains("array")));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ConfigurationPayload::parse("{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_is_built_in() {
        let payload = ConfigurationPayload::from_value(json!({
            "@odata.type": "#microsoft.graph.roleScopeTag",
            "id": "0",
            "displayName": "Default",
            "isBuiltIn": true
        }))
        .unwrap();
        assert_eq!(payload.is_built_in(), Some(true));
    }
}
