//! Opaque cursor tokens for keyset pagination
//!
//! A token is URL-safe base64 of a JSON payload holding the sort keys,
//! the last row's values for them, and an HMAC-SHA256 signature of both
//! under a server-side `CursorKey`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ck_core::ValidationError;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use uuid::Uuid;

use crate::paginate::Record;
use crate::query::{OrderTerm, SeekKey};
use crate::registry::FieldValue;

const CURSOR_FIELD: &str = "cursor";

type HmacSha256 = Hmac<Sha256>;

/// Secret that signs and verifies cursor tokens.
///
/// Tokens only decode under the key that produced them.
#[derive(Clone)]
pub struct CursorKey {
    mac: HmacSha256,
}

impl CursorKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        // SHA-512 output is exactly one HMAC-SHA256 block
        let key = Sha512::digest(secret.as_ref());
        Self {
            mac: <HmacSha256 as KeyInit>::new(&key),
        }
    }

    /// Key that lives for this process only
    pub fn random() -> Self {
        let mut secret = Vec::with_capacity(32);
        secret.extend_from_slice(Uuid::new_v4().as_bytes());
        secret.extend_from_slice(Uuid::new_v4().as_bytes());
        Self::new(secret)
    }

    fn signer(&self, fields: &[String], values: &[FieldValue]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        for field in fields {
            Mac::update(&mut mac, field.as_bytes());
            Mac::update(&mut mac, &[0u8]);
        }
        Mac::update(&mut mac, &serde_json::to_vec(values).unwrap_or_default());
        mac
    }

    fn sign(&self, fields: &[String], values: &[FieldValue]) -> String {
        hex::encode(Mac::finalize(self.signer(fields, values)).into_bytes())
    }

    fn verify(&self, fields: &[String], values: &[FieldValue], signature: &str) -> bool {
        match hex::decode(signature) {
            Ok(bytes) => self.signer(fields, values).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for CursorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CursorKey(..)")
    }
}

/// Decoded cursor position
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub fields: Vec<String>,
    pub values: Vec<FieldValue>,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    f: Vec<String>,
    v: Vec<FieldValue>,
    s: String,
}

impl Cursor {
    /// Capture the sort key of `row` under `order`
    pub fn from_row<R: Record>(order: &[OrderTerm], row: &R) -> Result<Self, ValidationError> {
        let mut fields = Vec::with_capacity(order.len());
        let mut values = Vec::with_capacity(order.len());

        for term in order {
            let value = row.field_value(term.field.name).ok_or_else(|| {
                ValidationError::new(term.field.name, "has no value to position a cursor on")
            })?;
            fields.push(sort_key(term));
            values.push(value);
        }

        Ok(Self { fields, values })
    }

    pub fn encode(&self, key: &CursorKey) -> String {
        let payload = Payload {
            f: self.fields.clone(),
            v: self.values.clone(),
            s: key.sign(&self.fields, &self.values),
        };
        // Serializing owned strings and scalar values cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str, key: &CursorKey) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::new(CURSOR_FIELD, "is malformed");

        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| malformed())?;
        let payload: Payload = serde_json::from_slice(&bytes).map_err(|_| malformed())?;

        if payload.f.len() != payload.v.len() {
            return Err(malformed());
        }
        if !key.verify(&payload.f, &payload.v, &payload.s) {
            return Err(ValidationError::new(CURSOR_FIELD, "failed its integrity check"));
        }

        Ok(Self {
            fields: payload.f,
            values: payload.v,
        })
    }

    /// Pair the cursor's values with the query's ordering.
    ///
    /// The cursor must have been produced under exactly this ordering.
    pub fn seek_keys(&self, order: &[OrderTerm]) -> Result<Vec<SeekKey>, ValidationError> {
        let same_fields = self.fields.len() == order.len()
            && self
                .fields
                .iter()
                .zip(order)
                .all(|(key, term)| *key == sort_key(term));
        if !same_fields {
            return Err(ValidationError::new(
                CURSOR_FIELD,
                "does not match the requested sort order",
            ));
        }

        order
            .iter()
            .zip(&self.values)
            .map(|(term, value)| {
                term.field
                    .check_type(value)
                    .map_err(|_| ValidationError::new(CURSOR_FIELD, "is malformed"))?;
                Ok(SeekKey {
                    term: *term,
                    value: value.clone(),
                })
            })
            .collect()
    }
}

/// `field:direction`, so flipping a direction also invalidates the cursor
fn sort_key(term: &OrderTerm) -> String {
    format!("{}:{}", term.field.name, term.direction.as_str())
}
