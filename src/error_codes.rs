//! Stable error codes embedded in user-facing error messages.
//!
//! Codes are part of the public contract: they appear in rendered diagnostics
//! and must not change meaning between releases.

pub const DOC_XML: &str = "MAPCHECK_DOC_001";
pub const DOC_NO_ROOT: &str = "MAPCHECK_DOC_002";
pub const DOC_UNBALANCED: &str = "MAPCHECK_DOC_003";

pub const VALIDATION_FAILED: &str = "MAPCHECK_VAL_001";

pub const CONVERSION_FAILED: &str = "MAPCHECK_CONV_001";

pub const EXEC_TRANSFORM_FAILED: &str = "MAPCHECK_EXEC_001";
pub const EXEC_COMPILE_FAILED: &str = "MAPCHECK_EXEC_002";
pub const EXEC_EMPTY_OUTPUT: &str = "MAPCHECK_EXEC_003";

pub const BINDING_NOT_FOUND: &str = "MAPCHECK_BIND_001";

pub const COMPARISON_FAILED: &str = "MAPCHECK_CMP_001";

pub const ORCH_STAGE_FAILED: &str = "MAPCHECK_ORCH_001";

pub const RESOURCE_NOT_FOUND: &str = "MAPCHECK_RES_001";
pub const RESOURCE_IO: &str = "MAPCHECK_RES_002";

pub const PATH_SYNTAX: &str = "MAPCHECK_PATH_001";

pub const EXT_CALL_FAILED: &str = "MAPCHECK_EXT_001";
