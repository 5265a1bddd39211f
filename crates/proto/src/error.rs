use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Handshake authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Connection registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Event routing error.
    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    /// Gateway transport/runtime error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Handshake authentication errors; always fatal to the connection attempt
/// and never retried by the gateway.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was supplied with the handshake.
    #[error("Authentication token required")]
    MissingToken,

    /// Token is malformed or fails signature/integrity checks.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token signature verified but the token has expired.
    #[error("Token expired")]
    ExpiredToken,

    /// No tenant ID (or an empty one) was supplied with the handshake.
    #[error("Tenant ID is required")]
    MissingTenant,
}

impl AuthError {
    /// Machine-readable close reason exposed to rejected clients.
    ///
    /// Expired and invalid tokens map to the same code so verification
    /// internals do not leak to clients.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken(_) | AuthError::ExpiredToken => "invalid_token",
            AuthError::MissingTenant => "missing_tenant",
        }
    }
}

/// Connection registry errors; logged and observable, never fatal to a
/// connection.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The shared store cannot be reached or returned a protocol failure.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    /// A stored descriptor could not be encoded or decoded.
    #[error("Descriptor encoding error: {0}")]
    Encoding(String),
}

/// Event routing errors; the offending frame is dropped, the connection
/// stays open.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Inbound frame payload did not parse as any known frame.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A room-scoped operation was attempted before the session was active.
    #[error("Session not active")]
    NotActive,
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Listener could not be bound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// Network/connection-level failure.
    #[error("Connection error: {0}")]
    Connection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_auth_error_variant() {
        let err = AuthError::MissingToken;
        assert!(err.to_string().contains("token required"));
    }

    #[test]
    fn reason_codes_distinguish_rejection_causes() {
        assert_eq!(AuthError::MissingToken.reason_code(), "missing_token");
        assert_eq!(AuthError::MissingTenant.reason_code(), "missing_tenant");
        assert_eq!(
            AuthError::InvalidToken("bad signature".into()).reason_code(),
            "invalid_token"
        );
    }

    #[test]
    fn expired_token_shares_the_invalid_reason_code() {
        assert_eq!(AuthError::ExpiredToken.reason_code(), "invalid_token");
    }

    #[test]
    fn wraps_auth_error_into_top_level_error() {
        let err: Error = AuthError::MissingTenant.into();
        assert!(err.to_string().contains("Auth error"));
    }

    #[test]
    fn wraps_registry_and_router_errors() {
        let registry_err: Error = RegistryError::Unavailable("refused".to_string()).into();
        assert!(registry_err.to_string().contains("Registry error"));

        let router_err: Error = RouterError::NotActive.into();
        assert!(router_err.to_string().contains("Router error"));
    }

    #[test]
    fn wraps_config_and_gateway_errors() {
        let config_err: Error = ConfigError::MissingField("auth.secret".to_string()).into();
        assert!(config_err.to_string().contains("Config error"));

        let gateway_err: Error = GatewayError::Bind("address in use".to_string()).into();
        assert!(gateway_err.to_string().contains("Gateway error"));
    }
}
