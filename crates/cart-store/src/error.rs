//! # Cart Store Error Types
//!
//! Error types for the Cart aggregate and its collaborators.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / CoreError (cart-core)   StoreError (backend)        │
//! │       │                                         │                       │
//! │       └──────────────────┬──────────────────────┘                       │
//! │                          ▼                                              │
//! │               CartError (this module)                                   │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                Caller decides what to show                              │
//! │                                                                         │
//! │  Observer failures never reach this flow: they are logged and dropped. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cart_core::CoreError;
use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// Failures reported by a [`crate::store::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Reading a key failed.
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Writing a key failed.
    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },
}

impl StoreError {
    /// Creates a ReadFailed error.
    pub fn read(key: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::ReadFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a WriteFailed error.
    pub fn write(key: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::WriteFailed {
            key: key.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Cart Error
// =============================================================================

/// Everything a Cart operation can fail with.
#[derive(Debug, Error)]
pub enum CartError {
    /// Item, identity or validation failure from cart-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence backend failure.
    ///
    /// ## Note
    /// The in-memory mutation that preceded the write is kept.
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    /// A persisted blob could not be encoded or decoded.
    #[error("Cart blob is corrupt: {0}")]
    Serialization(String),

    /// Configuration values are out of range.
    #[error("Invalid cart configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        CartError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CartError {
    fn from(err: std::io::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CartError {
    fn from(err: toml::de::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CartError {
    fn from(err: toml::ser::Error) -> Self {
        CartError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CartError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CartError::InvalidConfig(_)
                | CartError::ConfigLoadFailed(_)
                | CartError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the store or the stored blob is at fault.
    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self,
            CartError::Store(_)
                | CartError::Serialization(_)
                | CartError::Core(CoreError::UnknownCouponKind(_))
        )
    }

    /// Returns true when the caller referenced a hash that isn't in the cart.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CartError::Core(CoreError::ItemNotFound(_)))
    }
}

/// Result type for cart operations.
pub type CartResult<T> = Result<T, CartError>;
