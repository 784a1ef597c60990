//! Server connectivity checks consumed by the pipeline.

use async_trait::async_trait;

use crate::account::{Account, HostAuth, Policy};
use crate::setup::CheckSettingsMode;

/// Why a connectivity check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckErrorReason {
    /// Unclassified failure.
    Unknown,
    /// Login or password rejected.
    AuthenticationFailed,
    /// Server unreachable or the connection dropped.
    ConnectionFailed,
    /// Server asked for a client certificate.
    ClientCertificateRequired,
    /// Server speaks no protocol version we support.
    ProtocolVersionUnsupported,
    /// Server demands security policies the device cannot honour.
    PolicyNotSupported,
    /// Server denied access to this device.
    AccessDenied,
}

impl std::fmt::Display for CheckErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown error",
            Self::AuthenticationFailed => "authentication failed",
            Self::ConnectionFailed => "connection failed",
            Self::ClientCertificateRequired => "client certificate required",
            Self::ProtocolVersionUnsupported => "protocol version unsupported",
            Self::PolicyNotSupported => "security policy not supported",
            Self::AccessDenied => "access denied",
        })
    }
}

/// Outcome of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Servers accepted the settings, optionally imposing a policy.
    Ok {
        /// Policy the server requires.
        policy: Option<Policy>,
    },
    /// The user must accept or change the server certificate.
    SecurityRequired {
        /// Server that presented the certificate.
        host: String,
    },
    /// The check failed.
    Error {
        /// Failure category.
        reason: CheckErrorReason,
        /// Message from the server or transport.
        message: String,
    },
    /// Exchange autodiscover finished.
    AutoDiscover {
        /// Result code reported by autodiscover.
        code: i32,
        /// Discovered server settings, if any.
        host_auth: Option<HostAuth>,
    },
}

/// Service that tries the draft settings against the real servers.
///
/// Dropping the returned future cancels the check.
#[async_trait]
pub trait ConnectivityChecker: Send + Sync {
    /// Runs the checks selected by `mode` against `account`.
    async fn check(&self, mode: CheckSettingsMode, account: &Account) -> CheckResult;
}
