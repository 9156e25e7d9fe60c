//! Plain, `Default`-implementing configuration structs for the encoder and
//! decoder — no external config-file format, per §6: "configuration
//! options are in-process, not file-based."

/// The nesting depth both the encoder and decoder refuse past (§4.7/§4.8:
/// "stack-depth guard ... 100 nesting levels").
pub(crate) const DEFAULT_MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// `enum_as_value` mirrors §6's configuration table: when set, the decoder
/// reports enum fields as their raw number instead of looking up the
/// constant's name.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub enum_as_value: bool,
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            enum_as_value: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
