// Workflow step identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of one stage of the configuration workflow
///
/// Steps are opaque: the backend may report steps this client does not know
/// about, and they still decode and fold into the state map. The canonical
/// order of steps is defined by the route tree, never by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowStep(Cow<'static, str>);

impl WorkflowStep {
    pub const PRE_CONFIGURE: Self = Self::from_static("PRE_CONFIGURE");
    pub const PRE_COMPUTE: Self = Self::from_static("PRE_COMPUTE");
    pub const REQUEST_CC_KEYS: Self = Self::from_static("REQUEST_CC_KEYS");
    pub const COMPUTE: Self = Self::from_static("COMPUTE");
    pub const DOWNLOAD: Self = Self::from_static("DOWNLOAD");
    pub const GENERATE: Self = Self::from_static("GENERATE");
    pub const GENERATE_PRINT_FILE: Self = Self::from_static("GENERATE_PRINT_FILE");
    pub const CONSTITUTE_ELECTORAL_BOARD: Self = Self::from_static("CONSTITUTE_ELECTORAL_BOARD");
    pub const EXPORT_TO_ONLINE: Self = Self::from_static("EXPORT_TO_ONLINE");
    pub const IMPORT_FROM_SETUP: Self = Self::from_static("IMPORT_FROM_SETUP");
    pub const UPLOAD_CONFIGURATION: Self = Self::from_static("UPLOAD_CONFIGURATION");
    pub const MIX_BALLOT_BOX: Self = Self::from_static("MIX_BALLOT_BOX");
    pub const DOWNLOAD_BALLOT_BOX: Self = Self::from_static("DOWNLOAD_BALLOT_BOX");
    pub const DECRYPT_BALLOT_BOX: Self = Self::from_static("DECRYPT_BALLOT_BOX");
    pub const EXPORT_TALLY: Self = Self::from_static("EXPORT_TALLY");

    /// Create a step from a static name (usable in const context)
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a step from any name
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for WorkflowStep {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for WorkflowStep {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
