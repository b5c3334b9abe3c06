//! API descriptor types
//!
//! A descriptor is one serialized snapshot of a simulation's PhET-iO API: the
//! tree of instrumented elements plus the registry of IO Types they reference.
//! Two wire formats exist:
//!
//! ```text
//! legacy (no "version"):              current ("version": {major, minor}):
//! {                                   {
//!   "phetioElements": {                 "version": {"major": 1, "minor": 1},
//!     "sim.screen.model": {             "phetioElements": {
//!       "phetioTypeName": "ObjectIO",     "sim": { "screen": { "model": {
//!       ...every attribute...               "_metadata": { ...overrides only... },
//!     }                                     "_data": { "initialState": ... }
//!   },                                    } } }
//!   "phetioTypes": { ... }              },
//! }                                     "phetioTypes": { ... }
//!                                     }
//! ```
//!
//! The format is resolved once when a descriptor is parsed into [`ApiDescriptor`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{CompareError, Result};
use crate::version::ApiVersion;

/// Reserved element key holding the element's metadata
pub const METADATA_KEY: &str = "_metadata";

/// Reserved element key holding captured data (`initialState`)
pub const DATA_KEY: &str = "_data";

/// Key inside `_data` holding the element's state at snapshot time
pub const INITIAL_STATE_KEY: &str = "initialState";

/// Type name used when an element does not declare one
pub const ROOT_TYPE_NAME: &str = "ObjectIO";

/// Flat map of metadata attributes (`phetioTypeName`, `phetioState`, ...)
pub type Metadata = Map<String, Value>;

/// Registry of IO Types keyed by type name
pub type TypeRegistry = BTreeMap<String, TypeDefinition>;

/// One node of the element tree.
///
/// Any key other than `_metadata` and `_data` names a child element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Element {
    /// Present only on instrumented elements; structural containers have none
    pub metadata: Option<Metadata>,
    /// Captured data, usually `{"initialState": ...}`
    pub data: Option<Map<String, Value>>,
    pub children: BTreeMap<String, Element>,
}

impl Element {
    /// A structural container with no metadata
    pub fn container() -> Self {
        Self::default()
    }

    pub fn is_instrumented(&self) -> bool {
        self.metadata.is_some()
    }

    /// The declared initial state, if any. An explicit `null` counts as undeclared.
    pub fn initial_state(&self) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|data| data.get(INITIAL_STATE_KEY))
            .filter(|state| !state.is_null())
    }

    /// The element's own (unresolved) value for a metadata key
    pub fn own_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// The declared IO Type name, defaulting to [`ROOT_TYPE_NAME`]
    pub fn type_name(&self) -> &str {
        self.own_metadata("phetioTypeName")
            .and_then(Value::as_str)
            .unwrap_or(ROOT_TYPE_NAME)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.get(name)
    }

    /// Get or create the child with the given name
    pub fn child_mut(&mut self, name: &str) -> &mut Element {
        self.children.entry(name.to_string()).or_default()
    }

    /// Count of instrumented elements in this subtree (including self)
    pub fn instrumented_count(&self) -> usize {
        usize::from(self.is_instrumented())
            + self
                .children
                .values()
                .map(Element::instrumented_count)
                .sum::<usize>()
    }
}

impl TryFrom<Map<String, Value>> for Element {
    type Error = CompareError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut element = Element::default();
        for (key, value) in map {
            match key.as_str() {
                METADATA_KEY => match value {
                    Value::Object(metadata) => element.metadata = Some(metadata),
                    other => {
                        return Err(CompareError::InvalidDescriptor(format!(
                            "{} must be an object, got {}",
                            METADATA_KEY, other
                        )))
                    }
                },
                DATA_KEY => match value {
                    Value::Object(data) => element.data = Some(data),
                    Value::Null => {}
                    other => {
                        return Err(CompareError::InvalidDescriptor(format!(
                            "{} must be an object, got {}",
                            DATA_KEY, other
                        )))
                    }
                },
                _ => match value {
                    Value::Object(child) => {
                        element.children.insert(key, Element::try_from(child)?);
                    }
                    other => {
                        return Err(CompareError::InvalidDescriptor(format!(
                            "element {} must be an object, got {}",
                            key, other
                        )))
                    }
                },
            }
        }
        Ok(element)
    }
}

impl From<Element> for Map<String, Value> {
    fn from(element: Element) -> Self {
        let mut map = Map::new();
        if let Some(metadata) = element.metadata {
            map.insert(METADATA_KEY.to_string(), Value::Object(metadata));
        }
        if let Some(data) = element.data {
            map.insert(DATA_KEY.to_string(), Value::Object(data));
        }
        for (name, child) in element.children {
            map.insert(name, Value::Object(child.into()));
        }
        map
    }
}

/// Signature of one IO Type method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSignature {
    #[serde(default)]
    pub parameter_types: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
}

/// One IO Type in the type registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    #[serde(default)]
    pub supertype: Option<String>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSignature>,
    #[serde(default)]
    pub events: Vec<String>,
    /// Only present in the current format
    #[serde(default)]
    pub metadata_defaults: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_state_keys: Option<Vec<String>>,
    /// Type parameters of parametric types such as `PropertyIO<NumberIO>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_types: Option<Vec<String>>,
}

/// A current-format (nested tree) descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentApi {
    pub version: ApiVersion,
    #[serde(rename = "phetioElements", alias = "elements", default)]
    pub elements: Element,
    #[serde(rename = "phetioTypes", alias = "types", default)]
    pub types: TypeRegistry,
}

/// A legacy descriptor: flat, dot-joined element IDs with full metadata each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyApi {
    #[serde(rename = "phetioElements", alias = "elements", default)]
    pub elements: BTreeMap<String, Metadata>,
    #[serde(rename = "phetioTypes", alias = "types", default)]
    pub types: TypeRegistry,
}

/// A parsed descriptor in either wire format
#[derive(Debug, Clone, PartialEq)]
pub enum ApiDescriptor {
    Legacy(LegacyApi),
    Current(CurrentApi),
}

impl ApiDescriptor {
    /// Parse a descriptor, deciding the format by the presence of `version`
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(ref object) = value else {
            return Err(CompareError::InvalidDescriptor(
                "descriptor must be a JSON object".to_string(),
            ));
        };
        if object.contains_key("version") {
            Ok(Self::Current(serde_json::from_value(value)?))
        } else {
            Ok(Self::Legacy(serde_json::from_value(value)?))
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn version(&self) -> Option<&ApiVersion> {
        match self {
            Self::Legacy(_) => None,
            Self::Current(api) => Some(&api.version),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    pub fn types(&self) -> &TypeRegistry {
        match self {
            Self::Legacy(api) => &api.types,
            Self::Current(api) => &api.types,
        }
    }

    /// Serialize back to the descriptor's own wire format
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Legacy(api) => serde_json::to_value(api)?,
            Self::Current(api) => serde_json::to_value(api)?,
        })
    }
}

/// A descriptor normalized to the nested tree shape.
///
/// `version` is kept because the format still matters for metadata default
/// resolution and for the `apiStateKeys` gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Api {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ApiVersion>,
    #[serde(rename = "phetioElements")]
    pub elements: Element,
    #[serde(rename = "phetioTypes")]
    pub types: TypeRegistry,
}

impl Api {
    pub fn is_legacy(&self) -> bool {
        self.version.is_none()
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Render the normalized tree as nested JSON, for display and debugging
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
