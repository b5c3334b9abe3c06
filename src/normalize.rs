//! Legacy descriptor up-conversion
//!
//! Legacy descriptors key every element by its full dot-joined ID and repeat
//! every metadata attribute on every element. The comparison engine only works
//! on the nested tree, so legacy input is rewritten here once.

use tracing::debug;

use crate::descriptor::{Api, ApiDescriptor, Element, LegacyApi};

/// Separator used by legacy element IDs. Fixed by the committed legacy
/// descriptors, independent of whatever separator newer formats use.
pub const LEGACY_ID_SEPARATOR: char = '.';

/// Normalize a descriptor into the nested tree shape.
///
/// Legacy descriptors are rebuilt into a tree with each element's attributes
/// stored verbatim as its metadata (nothing is factored out into defaults).
/// Current descriptors are copied as-is. The input is never modified.
pub fn up_convert(descriptor: &ApiDescriptor) -> Api {
    match descriptor {
        ApiDescriptor::Current(api) => Api {
            version: Some(api.version),
            elements: api.elements.clone(),
            types: api.types.clone(),
        },
        ApiDescriptor::Legacy(api) => up_convert_legacy(api),
    }
}

fn up_convert_legacy(api: &LegacyApi) -> Api {
    let mut root = Element::container();

    for (phetio_id, attributes) in &api.elements {
        let mut level = &mut root;
        for component_name in phetio_id.split(LEGACY_ID_SEPARATOR) {
            level = level.child_mut(component_name);
        }

        // A chain that lands on an existing node merges into its metadata.
        let metadata = level.metadata.get_or_insert_with(Default::default);
        for (key, value) in attributes {
            metadata.insert(key.clone(), value.clone());
        }
    }

    debug!(
        elements = api.elements.len(),
        instrumented = root.instrumented_count(),
        "up-converted legacy API"
    );

    Api {
        version: None,
        elements: root,
        types: api.types.clone(),
    }
}
