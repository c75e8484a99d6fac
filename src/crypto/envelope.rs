//! Ciphertext envelopes — the serialized unit of encrypted data.
//!
//! Two wire shapes exist, decoded once here at the storage boundary so the
//! rest of the crate never sniffs JSON shapes:
//!
//! - **Versioned** (`{"data": "<hex>", "iv": "<hex>", "version": 2}`):
//!   AES-256-CBC with a fresh random IV stored in the envelope.  Every new
//!   encryption produces this shape.
//! - **Legacy** (bare hex string, or an object with neither `iv` nor
//!   `version`): the pre-versioning format whose IV is derived
//!   deterministically from the key.  Decode-only — kept so old vaults
//!   remain readable.
//!
//! Anything else fails with `InvalidEnvelopeFormat`.

use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Result, VaultError};

/// AES-CBC initialization vector length in bytes.
pub const IV_LEN: usize = 16;

/// Format version marker carried by versioned envelopes.
pub const FORMAT_VERSION: u32 = 2;

/// A decoded ciphertext envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherEnvelope {
    /// Versioned format: ciphertext plus its embedded random IV.
    Versioned {
        ciphertext: Vec<u8>,
        iv: [u8; IV_LEN],
    },

    /// Legacy format: ciphertext only, IV derived from the key.
    Legacy { ciphertext: Vec<u8> },
}

impl CipherEnvelope {
    /// `true` for the legacy (no stored IV) shape.
    pub fn is_legacy(&self) -> bool {
        matches!(self, CipherEnvelope::Legacy { .. })
    }

    /// Decode an envelope from an arbitrary JSON value.
    ///
    /// This is the entry point for data arriving over the bridge, where
    /// the caller hands us untyped JSON.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| VaultError::InvalidEnvelopeFormat(e.to_string()))
    }

    /// Encode the envelope back to a JSON value.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| VaultError::SerializationError(e.to_string()))
    }

    fn from_wire(wire: WireEnvelope) -> std::result::Result<Self, String> {
        match wire {
            WireEnvelope::Raw(data) => {
                let ciphertext =
                    hex::decode(&data).map_err(|_| "ciphertext is not valid hex".to_string())?;
                Ok(CipherEnvelope::Legacy { ciphertext })
            }
            WireEnvelope::Object { data, iv, version } => {
                let ciphertext =
                    hex::decode(&data).map_err(|_| "ciphertext is not valid hex".to_string())?;

                match (version, iv) {
                    (Some(FORMAT_VERSION), Some(iv_hex)) => {
                        let iv_bytes = hex::decode(&iv_hex)
                            .map_err(|_| "iv is not valid hex".to_string())?;
                        let iv: [u8; IV_LEN] = iv_bytes
                            .try_into()
                            .map_err(|_| format!("iv must be {IV_LEN} bytes"))?;
                        Ok(CipherEnvelope::Versioned { ciphertext, iv })
                    }
                    // Neither marker present: the legacy object shape.
                    (None, None) => Ok(CipherEnvelope::Legacy { ciphertext }),
                    (Some(FORMAT_VERSION), None) => {
                        Err("version 2 envelope is missing its iv".to_string())
                    }
                    (Some(v), _) => Err(format!("unsupported envelope version {v}")),
                    (None, Some(_)) => Err("envelope has an iv but no version".to_string()),
                }
            }
        }
    }
}

impl Serialize for CipherEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CipherEnvelope::Versioned { ciphertext, iv } => {
                let mut state = serializer.serialize_struct("CipherEnvelope", 3)?;
                state.serialize_field("data", &hex::encode(ciphertext))?;
                state.serialize_field("iv", &hex::encode(iv))?;
                state.serialize_field("version", &FORMAT_VERSION)?;
                state.end()
            }
            // Legacy envelopes round-trip as the bare string they arrived
            // as.  New ones are never constructed by the codec.
            CipherEnvelope::Legacy { ciphertext } => {
                serializer.serialize_str(&hex::encode(ciphertext))
            }
        }
    }
}

/// Raw wire shapes accepted off storage or the network.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireEnvelope {
    Object {
        data: String,
        #[serde(default)]
        iv: Option<String>,
        #[serde(default)]
        version: Option<u32>,
    },
    Raw(String),
}

impl<'de> Deserialize<'de> for CipherEnvelope {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let wire = WireEnvelope::deserialize(deserializer)
            .map_err(|_| D::Error::custom("value is not a ciphertext envelope"))?;
        CipherEnvelope::from_wire(wire).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_envelope_roundtrips_through_json() {
        let env = CipherEnvelope::Versioned {
            ciphertext: vec![0xAA, 0xBB, 0xCC],
            iv: [7u8; IV_LEN],
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["data"], "aabbcc");

        let back: CipherEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn bare_string_decodes_as_legacy() {
        let back: CipherEnvelope = serde_json::from_value(serde_json::json!("deadbeef")).unwrap();
        assert_eq!(
            back,
            CipherEnvelope::Legacy {
                ciphertext: vec![0xDE, 0xAD, 0xBE, 0xEF]
            }
        );
    }

    #[test]
    fn object_without_markers_decodes_as_legacy() {
        let back: CipherEnvelope =
            serde_json::from_value(serde_json::json!({ "data": "0102" })).unwrap();
        assert!(back.is_legacy());
    }

    #[test]
    fn version_without_iv_is_rejected() {
        let result: std::result::Result<CipherEnvelope, _> =
            serde_json::from_value(serde_json::json!({ "data": "0102", "version": 2 }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let result: std::result::Result<CipherEnvelope, _> = serde_json::from_value(
            serde_json::json!({ "data": "0102", "iv": "00000000000000000000000000000000", "version": 3 }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn legacy_envelope_serializes_as_bare_string() {
        let env = CipherEnvelope::Legacy {
            ciphertext: vec![0x01, 0x02],
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!("0102"));
    }
}
