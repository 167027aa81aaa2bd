//! Mapping from a declared license source to provider connection options.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LicenseError;

/// Default management server port.
pub const DEFAULT_SERVER_PORT: u16 = 27443;

/// Registry endpoint used for the cloud license service.
pub const CLOUD_REGISTRY_ENDPOINT: &str = "https://licence-api.nuix.com";

/// Where a license should be located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LicenseSource {
    /// Physical dongles attached to the machine.
    Dongle,
    /// A management server instance.
    Server {
        host: String,
        #[serde(default = "default_server_port")]
        port: u16,
    },
    /// The cloud license service.
    Cloud,
    /// No constraint on where the license comes from.
    Any,
    /// Caller-supplied sources value, passed through verbatim.
    Custom { value: String },
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

impl fmt::Display for LicenseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dongle => f.write_str("dongle"),
            Self::Server { host, port } => write!(f, "server({host}:{port})"),
            Self::Cloud => f.write_str("cloud"),
            Self::Any => f.write_str("any"),
            Self::Custom { value } => write!(f, "custom({value})"),
        }
    }
}

/// Options handed to the provider when asking for available licenses.
///
/// Serializes to `{"sources": "<value>"}`, or `{}` when unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

impl LicenseOptions {
    fn sources(value: impl Into<String>) -> Self {
        Self {
            sources: Some(value.into()),
        }
    }
}

/// Result of resolving a [`LicenseSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResolution {
    pub options: LicenseOptions,
    /// Process-wide registry endpoint that must be set before enumeration, if any.
    pub endpoint: Option<String>,
}

/// Map a source to provider options and the registry endpoint it requires.
///
/// Pure: applying the endpoint is the caller's job (see `io::endpoint`).
pub fn resolve_source(source: &LicenseSource) -> Result<SourceResolution, LicenseError> {
    let resolution = match source {
        LicenseSource::Cloud => SourceResolution {
            options: LicenseOptions::sources("cloud-server"),
            endpoint: Some(CLOUD_REGISTRY_ENDPOINT.to_string()),
        },
        LicenseSource::Server { host, port } => {
            validate_host(host)?;
            SourceResolution {
                options: LicenseOptions::sources("server"),
                endpoint: Some(format!("{host}:{port}")),
            }
        }
        LicenseSource::Dongle => SourceResolution {
            options: LicenseOptions::sources("dongle"),
            endpoint: None,
        },
        LicenseSource::Any => SourceResolution {
            options: LicenseOptions::default(),
            endpoint: None,
        },
        LicenseSource::Custom { value } => SourceResolution {
            options: LicenseOptions::sources(value.as_str()),
            endpoint: None,
        },
    };
    Ok(resolution)
}

/// Reject an empty server host.
pub fn validate_host(host: &str) -> Result<(), LicenseError> {
    if host.trim().is_empty() {
        return Err(LicenseError::configuration(
            "server source requires a non-empty host",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_sets_registry_endpoint() {
        let resolved = resolve_source(&LicenseSource::Cloud).expect("resolve");
        assert_eq!(resolved.options.sources.as_deref(), Some("cloud-server"));
        assert_eq!(resolved.endpoint.as_deref(), Some(CLOUD_REGISTRY_ENDPOINT));
    }

    #[test]
    fn server_endpoint_includes_port() {
        let source = LicenseSource::Server {
            host: "nms.internal".to_string(),
            port: 27443,
        };
        let resolved = resolve_source(&source).expect("resolve");
        assert_eq!(resolved.options.sources.as_deref(), Some("server"));
        assert_eq!(resolved.endpoint.as_deref(), Some("nms.internal:27443"));
    }

    #[test]
    fn server_with_blank_host_is_configuration_error() {
        let source = LicenseSource::Server {
            host: "  ".to_string(),
            port: DEFAULT_SERVER_PORT,
        };
        let err = resolve_source(&source).expect_err("blank host");
        assert!(matches!(err, LicenseError::Configuration(_)));
    }

    #[test]
    fn any_source_passes_no_options() {
        let resolved = resolve_source(&LicenseSource::Any).expect("resolve");
        assert_eq!(resolved.options, LicenseOptions::default());
        assert_eq!(
            serde_json::to_value(&resolved.options).expect("serialize"),
            serde_json::json!({})
        );
        assert!(resolved.endpoint.is_none());
    }

    #[test]
    fn custom_source_is_verbatim() {
        let source = LicenseSource::Custom {
            value: "dongle,system".to_string(),
        };
        let resolved = resolve_source(&source).expect("resolve");
        assert_eq!(resolved.options.sources.as_deref(), Some("dongle,system"));
        assert!(resolved.endpoint.is_none());
    }

    #[test]
    fn dongle_needs_no_endpoint() {
        let resolved = resolve_source(&LicenseSource::Dongle).expect("resolve");
        assert_eq!(resolved.options.sources.as_deref(), Some("dongle"));
        assert!(resolved.endpoint.is_none());
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let parsed: Result<LicenseSource, _> = toml::from_str("kind = \"floppy\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn server_port_defaults_when_omitted() {
        let parsed: LicenseSource =
            toml::from_str("kind = \"server\"\nhost = \"nms\"").expect("parse");
        assert_eq!(
            parsed,
            LicenseSource::Server {
                host: "nms".to_string(),
                port: DEFAULT_SERVER_PORT,
            }
        );
    }
}
