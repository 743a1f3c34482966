//! Field fingerprints for parity checks.
//!
//! A fingerprint is a 64-bit FNV-1a hash over the raw bits of a field, plus
//! a count of non-finite values. Two runs with the same seed and
//! configuration must produce identical fingerprints for every field after
//! the same number of steps, on any hardware.
//!
//! Capture is driven by a [`Diagnostics`] context handed to the simulation at
//! construction: the simulation calls the sink after the configured step.

use std::fmt;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash arbitrary bytes. Used to turn the master seed string into RNG seeds.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| fnv1a_byte(h, b))
}

/// Derive a sub-seed for one consumer of the master seed.
pub fn derive_seed(master: &str, purpose: &str) -> u64 {
    let h = hash_bytes(master.as_bytes());
    // Separator keeps ("ab", "c") and ("a", "bc") apart.
    let h = fnv1a_byte(h, 0xff);
    purpose.bytes().fold(h, fnv1a_byte)
}

/// Identifies one internal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    /// Current state of agent layer `i`.
    AgentLayer(usize),
    Deposit,
    Trail,
    Landscape,
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::AgentLayer(i) => write!(f, "layer{}", i),
            FieldName::Deposit => write!(f, "deposit"),
            FieldName::Trail => write!(f, "trail"),
            FieldName::Landscape => write!(f, "landscape"),
        }
    }
}

/// Content hash of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFingerprint {
    pub field: FieldName,
    pub hash: u64,
    /// Number of elements in the field.
    pub len: usize,
    /// Number of NaN or infinite elements. Always 0 for integer fields.
    pub non_finite: usize,
}

impl FieldFingerprint {
    /// Fingerprint a float field.
    pub fn of_f32(field: FieldName, data: &[f32]) -> Self {
        let mut hash = FNV_OFFSET;
        let mut non_finite = 0;
        for &v in data {
            hash = fnv1a_u32(hash, v.to_bits());
            if !v.is_finite() {
                non_finite += 1;
            }
        }
        Self {
            field,
            hash,
            len: data.len(),
            non_finite,
        }
    }

    /// Fingerprint an integer field.
    pub fn of_i32(field: FieldName, data: &[i32]) -> Self {
        let hash = data
            .iter()
            .fold(FNV_OFFSET, |h, &v| fnv1a_u32(h, v as u32));
        Self {
            field,
            hash,
            len: data.len(),
            non_finite: 0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.non_finite == 0
    }
}

impl fmt::Display for FieldFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:016x}", self.field, self.hash)?;
        if self.non_finite > 0 {
            write!(f, " ({} non-finite of {})", self.non_finite, self.len)?;
        }
        Ok(())
    }
}

/// Callback receiving `(fingerprint, frame)`.
pub type FingerprintSink = Box<dyn FnMut(&FieldFingerprint, u64)>;

/// Fingerprint capture settings.
///
/// With `capture_at_frame` unset every step is captured; otherwise only the
/// step that reaches that frame.
pub struct Diagnostics {
    pub enabled: bool,
    pub capture_at_frame: Option<u64>,
    sink: Option<FingerprintSink>,
}

impl Diagnostics {
    /// No capture at all.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            capture_at_frame: None,
            sink: None,
        }
    }

    /// Capture every step into `sink`.
    pub fn new(sink: impl FnMut(&FieldFingerprint, u64) + 'static) -> Self {
        Self {
            enabled: true,
            capture_at_frame: None,
            sink: Some(Box::new(sink)),
        }
    }

    /// Only capture once `frame` is reached.
    pub fn capture_at(mut self, frame: u64) -> Self {
        self.capture_at_frame = Some(frame);
        self
    }

    pub fn should_capture(&self, frame: u64) -> bool {
        self.enabled
            && self.sink.is_some()
            && self.capture_at_frame.map_or(true, |f| f == frame)
    }

    pub(crate) fn emit(&mut self, fingerprint: &FieldFingerprint, frame: u64) {
        if let Some(sink) = self.sink.as_mut() {
            sink(fingerprint, frame);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("capture_at_frame", &self.capture_at_frame)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
