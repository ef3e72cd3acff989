//! Per-test rebinding of named external callables invoked by a transform.
//!
//! A map declares the extensions it calls in a manifest of symbolic name to
//! implementation type. Tests substitute doubles by implementation type; the
//! resolver maps each substitution back to its symbolic name and produces a
//! fresh binding set. The manifest is never mutated.

use crate::error_codes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtensionCallError {
    #[error("[MAPCHECK_EXT_001] extension call '{function}' failed: {message}")]
    CallFailed { function: String, message: String },
}

impl ExtensionCallError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtensionCallError::CallFailed { .. } => error_codes::EXT_CALL_FAILED,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindingError {
    #[error(
        "[MAPCHECK_BIND_001] no extension with implementation type '{type_id}' is declared by this map. Declared: {declared}. Suggestion: check the manifest and the override's type id."
    )]
    BindingNotFound { type_id: String, declared: String },
}

impl BindingError {
    pub fn code(&self) -> &'static str {
        match self {
            BindingError::BindingNotFound { .. } => error_codes::BINDING_NOT_FOUND,
        }
    }
}

/// The capability interface implemented by production extensions and test
/// doubles alike. The resolver always binds symbolic names to *some*
/// implementation of this trait.
pub trait ExtensionImplementation {
    /// A stable identifier for the implementing type, used to match
    /// overrides against manifest entries.
    fn type_id(&self) -> &str;

    fn invoke(&self, function: &str, args: &[String]) -> Result<String, ExtensionCallError>;
}

/// A map's declared extensions: symbolic name -> implementation type id,
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionManifest {
    entries: Vec<(String, String)>,
}

impl ExtensionManifest {
    pub fn new() -> ExtensionManifest {
        ExtensionManifest::default()
    }

    pub fn declare(
        mut self,
        symbolic_name: impl Into<String>,
        type_id: impl Into<String>,
    ) -> ExtensionManifest {
        self.entries.push((symbolic_name.into(), type_id.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbolic_name_for(&self, type_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, t)| t == type_id)
            .map(|(name, _)| name.as_str())
    }

    fn declared_summary(&self) -> String {
        if self.entries.is_empty() {
            return "(none)".to_string();
        }
        self.entries
            .iter()
            .map(|(name, type_id)| format!("{name} ({type_id})"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One caller-supplied substitution: the implementation type to replace and
/// the double that should receive its calls.
#[derive(Clone)]
pub struct ExtensionOverride {
    pub type_id: String,
    pub replacement: Arc<dyn ExtensionImplementation>,
}

impl ExtensionOverride {
    pub fn new(replacement: Arc<dyn ExtensionImplementation>) -> ExtensionOverride {
        ExtensionOverride {
            type_id: replacement.type_id().to_string(),
            replacement,
        }
    }
}

impl std::fmt::Debug for ExtensionOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionOverride")
            .field("type_id", &self.type_id)
            .finish()
    }
}

/// Resolved symbolic-name routing handed to the transform runtime.
#[derive(Clone, Default)]
pub struct ExtensionBindings {
    bindings: Vec<(String, Arc<dyn ExtensionImplementation>)>,
}

impl ExtensionBindings {
    pub fn lookup(&self, symbolic_name: &str) -> Option<&Arc<dyn ExtensionImplementation>> {
        self.bindings
            .iter()
            .find(|(name, _)| name == symbolic_name)
            .map(|(_, implementation)| implementation)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }
}

impl std::fmt::Debug for ExtensionBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Resolve each override to its symbolic name via the manifest.
///
/// Fails with [`BindingError::BindingNotFound`] when an override's type id
/// has no manifest entry. The manifest is read-only; the produced binding
/// set is new on every call.
pub fn resolve_overrides(
    manifest: &ExtensionManifest,
    overrides: &[ExtensionOverride],
) -> Result<ExtensionBindings, BindingError> {
    let mut bindings = Vec::with_capacity(overrides.len());
    for o in overrides {
        let name = manifest.symbolic_name_for(&o.type_id).ok_or_else(|| {
            BindingError::BindingNotFound {
                type_id: o.type_id.clone(),
                declared: manifest.declared_summary(),
            }
        })?;
        bindings.push((name.to_string(), Arc::clone(&o.replacement)));
    }
    Ok(ExtensionBindings { bindings })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGuid;

    impl ExtensionImplementation for FixedGuid {
        fn type_id(&self) -> &str {
            "GuidHelper"
        }

        fn invoke(&self, _function: &str, _args: &[String]) -> Result<String, ExtensionCallError> {
            Ok("FAKE_GUID".to_string())
        }
    }

    #[test]
    fn override_resolves_to_symbolic_name() {
        let manifest = ExtensionManifest::new().declare("guid-helper", "GuidHelper");
        let overrides = [ExtensionOverride::new(Arc::new(FixedGuid))];
        let bindings = resolve_overrides(&manifest, &overrides).unwrap();

        let implementation = bindings.lookup("guid-helper").unwrap();
        assert_eq!(implementation.invoke("new_guid", &[]).unwrap(), "FAKE_GUID");
    }

    #[test]
    fn unknown_type_is_binding_not_found() {
        let manifest = ExtensionManifest::new().declare("other", "OtherHelper");
        let overrides = [ExtensionOverride::new(Arc::new(FixedGuid))];
        let err = resolve_overrides(&manifest, &overrides).unwrap_err();
        assert_eq!(err.code(), error_codes::BINDING_NOT_FOUND);
        assert!(err.to_string().contains("GuidHelper"));
    }

    #[test]
    fn resolution_never_mutates_the_manifest() {
        let manifest = ExtensionManifest::new().declare("guid-helper", "GuidHelper");
        let before = manifest.clone();
        let _ = resolve_overrides(&manifest, &[ExtensionOverride::new(Arc::new(FixedGuid))]);
        assert_eq!(manifest, before);
    }
}
