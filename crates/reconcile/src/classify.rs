//! Type classification
//!
//! Maps a discriminator to an [`EntityKind`] by walking the registry in
//! order. Some rules are broad substring tests, so order matters: the first
//! matching row wins.

use crate::error::{Error, Result};
use crate::kinds::{KindSpec, REGISTRY};
use crate::types::EntityKind;

/// Classify a discriminator, returning the matching registry row
pub fn classify_spec(discriminator: &str) -> Result<&'static KindSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.matcher.matches(discriminator))
        .ok_or_else(|| Error::UnsupportedType {
            discriminator: discriminator.to_string(),
        })
}

/// Classify a discriminator
pub fn classify(discriminator: &str) -> Result<EntityKind> {
    classify_spec(discriminator).map(|spec| spec.kind)
}
