//! JSON boundary helpers.
//!
//! [`JsonSerializable`] is the string-level API the persistence layer
//! exposes to hosts: snapshots cross the save-system boundary as JSON
//! text, and the error type is chosen by the implementing layer via the
//! type parameter (see the blanket impl in
//! [`crate::controller`]'s persistence module).

/// Types that can round-trip through a JSON string with a layer-specific
/// error type.
pub trait JsonSerializable<E>: Sized {
    /// Serializes `self` to a JSON string.
    fn to_json_string(&self) -> Result<String, E>;

    /// Deserializes a value from a JSON string.
    fn from_json_str(s: &str) -> Result<Self, E>;
}
