//! SSH wire encoding of ed25519 public keys.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;

/// Algorithm name as it appears in authorized_keys lines.
pub const KEY_ALGORITHM: &str = "ssh-ed25519";

/// Length-prefixed algorithm name followed by the length field of the key.
pub const WIRE_PREFIX: [u8; 19] = [
    0, 0, 0, 11, // length of "ssh-ed25519"
    b's', b's', b'h', b'-', b'e', b'd', b'2', b'5', b'5', b'1', b'9',
    0, 0, 0, 32, // length of the public key
];

/// Raw public key length for ed25519.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the binary wire record.
pub const WIRE_LEN: usize = WIRE_PREFIX.len() + PUBLIC_KEY_LEN;

/// Length of the base64 encoded wire record (51 bytes never need padding).
pub const ENCODED_LEN: usize = WIRE_LEN / 3 * 4;

/// Number of encoded characters fixed by the header.
///
/// Character 24 still only carries header bits, so the first character an
/// operator can influence is at index 25.
pub const PAYLOAD_OFFSET: usize = 25;

/// Number of encoded characters after [`PAYLOAD_OFFSET`].
pub const PAYLOAD_LEN: usize = ENCODED_LEN - PAYLOAD_OFFSET;

/// Formats public keys into their base64 wire representation.
///
/// Owns its scratch buffers so the hot loop does not allocate per candidate.
#[derive(Debug, Clone)]
pub struct WireFormatter {
    raw: [u8; WIRE_LEN],
    encoded: String,
}

impl WireFormatter {
    pub fn new() -> Self {
        let mut raw = [0u8; WIRE_LEN];
        raw[..WIRE_PREFIX.len()].copy_from_slice(&WIRE_PREFIX);

        Self {
            raw,
            encoded: String::with_capacity(ENCODED_LEN),
        }
    }

    /// Encodes `public_key` and returns the base64 string.
    ///
    /// The returned slice is only valid until the next call.
    #[inline]
    pub fn encode(&mut self, public_key: &[u8; PUBLIC_KEY_LEN]) -> &str {
        self.raw[WIRE_PREFIX.len()..].copy_from_slice(public_key);
        self.encoded.clear();
        STANDARD_NO_PAD.encode_string(&self.raw, &mut self.encoded);
        &self.encoded
    }
}

impl Default for WireFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot variant of [`WireFormatter::encode`].
pub fn encode_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> String {
    WireFormatter::new().encode(public_key).to_owned()
}

/// Prepends the algorithm name, producing an authorized_keys line.
pub fn authorized_key_line(encoded: &str) -> String {
    format!("{} {}", KEY_ALGORITHM, encoded)
}
