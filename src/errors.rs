use thiserror::Error;

/// All errors that can occur in PassVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong master password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid ciphertext envelope: {0}")]
    InvalidEnvelopeFormat(String),

    // --- Vault state errors ---
    #[error("Vault is locked — unlock it before performing crypto operations")]
    VaultLocked,

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    // --- Sync protocol errors ---
    #[error("Remote server unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("No remote account linked — run sync setup first")]
    NotLinked,

    #[error("OTP code is incorrect or expired")]
    OtpMismatch,

    #[error("Transfer token is invalid, expired, or already used")]
    TransferTokenInvalid,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
