use serde::Deserialize;

/// Rendering limits for decoded values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Byte values up to this length render in full.
    pub max_inline_bytes: usize,
    /// Hex characters kept when a byte value is shortened.
    pub bytes_preview_hex_chars: usize,
    /// Strings longer than this are shortened.
    pub max_string_chars: usize,
    /// Characters kept when a string is shortened.
    pub string_preview_chars: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_inline_bytes: 32,
            bytes_preview_hex_chars: 20,
            max_string_chars: 50,
            string_preview_chars: 47,
        }
    }
}
