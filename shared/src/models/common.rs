//! Types shared by every signal: attributes, resources and instrumentation scopes.

use serde::{Deserialize, Serialize};

/// Key-value attributes.
///
/// Values are arbitrary JSON so nested maps and arrays survive unchanged.
/// The map keeps a stable iteration order, which keeps encoded payloads
/// deterministic.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Describes the process or host producing telemetry.
///
/// # Example
///
/// ```
/// use shared::models::Resource;
///
/// let resource = Resource::new()
///     .with_attribute("service.name", "checkout")
///     .with_attribute("host.cpu.count", 8);
///
/// assert_eq!(resource.service_name(), Some("checkout"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Resource attributes (e.g., `service.name`).
    #[serde(default)]
    pub attributes: Attributes,

    /// Optional schema URL for the attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

impl Resource {
    /// Creates an empty resource.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute to the resource.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the `service.name` attribute, if it is a string.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        self.attributes
            .get("service.name")
            .and_then(serde_json::Value::as_str)
    }
}

/// A named, optionally versioned producer of telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentationScope {
    /// Scope name (usually the instrumenting library or logger name).
    pub name: String,

    /// Optional scope version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional schema URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    /// Scope attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl InstrumentationScope {
    /// Creates an unversioned scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the scope version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl std::fmt::Display for InstrumentationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
