use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors reported by a venue gateway.
///
/// The variants map onto how the core reacts: rejections are final,
/// connectivity failures may be retried, invalid parameters are final.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("request rejected by venue: {0}")]
    Rejected(String),

    #[error("venue connectivity failure: {0}")]
    Connectivity(String),

    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    #[error("no data available: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Return true if the request may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Return true if the venue refused the request outright.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::InvalidParams(_))
    }
}

/// Risk management errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("combined position limit exceeded for {symbol}: projected {projected}, limit {limit}")]
    PositionLimitExceeded {
        symbol: String,
        projected: Decimal,
        limit: Decimal,
    },

    #[error("venue position limit exceeded for {symbol} on {venue}: projected {projected}, limit {limit}")]
    VenueLimitExceeded {
        symbol: String,
        venue: String,
        projected: Decimal,
        limit: Decimal,
    },

    #[error("position imbalance for {symbol}: combined {combined} exceeds {limit}")]
    ImbalanceExceeded {
        symbol: String,
        combined: Decimal,
        limit: Decimal,
    },
}

/// Position ledger bookkeeping errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("symbol not registered with ledger: {0}")]
    UnknownSymbol(String),

    #[error("reservation {0} is not pending")]
    UnknownReservation(u64),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connectivity_is_retryable() {
        assert!(GatewayError::Connectivity("timeout".into()).is_retryable());
        assert!(!GatewayError::Rejected("post-only".into()).is_retryable());
        assert!(!GatewayError::InvalidParams("size".into()).is_retryable());
        assert!(!GatewayError::Unavailable("book".into()).is_retryable());
    }

    #[test]
    fn rejection_covers_invalid_params() {
        assert!(GatewayError::Rejected("margin".into()).is_rejection());
        assert!(GatewayError::InvalidParams("tick".into()).is_rejection());
        assert!(!GatewayError::Connectivity("reset".into()).is_rejection());
    }

    #[test]
    fn gateway_error_converts_into_error() {
        let err: Error = GatewayError::Rejected("nope".into()).into();
        assert!(matches!(err, Error::Gateway(GatewayError::Rejected(_))));
    }
}
