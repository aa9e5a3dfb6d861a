//! Import identifiers.
//!
//! Compound identifiers join their components with
//! [`ID_SEPARATOR`](junos_session::output::ID_SEPARATOR), e.g.
//! `public_-_v2c` for a two-key record.

use junos_session::output::ID_SEPARATOR;

use crate::contract::KeyArity;
use crate::error::LifecycleError;

/// Joins key components into an identifier.
pub fn join_id<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(ID_SEPARATOR)
}

/// Splits an import identifier into the keys of a record of `arity`.
///
/// - keyless records ignore the identifier
/// - single-key records use it whole, separator included
/// - two- and four-key records require exactly that many components
pub fn split_import_id(id: &str, arity: KeyArity) -> Result<Vec<String>, LifecycleError> {
    match arity {
        KeyArity::Keyless => Ok(Vec::new()),
        KeyArity::Single => Ok(vec![id.to_string()]),
        KeyArity::Pair | KeyArity::Quad => {
            let parts: Vec<String> = id.split(ID_SEPARATOR).map(str::to_string).collect();
            if parts.len() != arity.count() {
                return Err(LifecycleError::BadIdentifier {
                    separator: ID_SEPARATOR,
                    expected: arity.count(),
                    found: parts.len(),
                });
            }
            Ok(parts)
        }
    }
}
