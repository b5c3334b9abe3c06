//! Effective metadata resolution
//!
//! Current-format descriptors store only the attributes an element overrides;
//! everything else is inherited from `metadataDefaults` along its IO Type's
//! supertype chain. Legacy descriptors are dense and need no resolution.

use std::collections::HashSet;

use tracing::debug;

use crate::descriptor::{Api, Element, Metadata};
use crate::error::{CompareError, Result};

/// Complete effective metadata for an element.
///
/// Precedence, lowest to highest: root-most supertype defaults, ..., the
/// element type's own defaults, the element's explicit metadata.
pub fn resolve_metadata(element: &Element, api: &Api) -> Result<Metadata> {
    let explicit = element.metadata.as_ref();

    if api.is_legacy() {
        return Ok(explicit.cloned().unwrap_or_default());
    }

    let mut resolved = metadata_defaults(element.type_name(), api)?;
    if let Some(explicit) = explicit {
        for (key, value) in explicit {
            resolved.insert(key.clone(), value.clone());
        }
    }
    Ok(resolved)
}

/// Merged `metadataDefaults` for a type and all of its supertypes
pub fn metadata_defaults(type_name: &str, api: &Api) -> Result<Metadata> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(type_name);

    while let Some(name) = current {
        if !seen.insert(name) {
            return Err(CompareError::SupertypeCycle {
                type_name: type_name.to_string(),
            });
        }
        let Some(definition) = api.type_definition(name) else {
            debug!(type_name = name, "type referenced but missing from registry");
            return Err(CompareError::UnknownType {
                type_name: name.to_string(),
            });
        };
        chain.push(definition);
        current = definition.supertype.as_deref();
    }

    let mut defaults = Metadata::new();
    for definition in chain.iter().rev() {
        for (key, value) in &definition.metadata_defaults {
            defaults.insert(key.clone(), value.clone());
        }
    }
    Ok(defaults)
}
