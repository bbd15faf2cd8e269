//! Value objects: compared by value, validated on construction.

/// Marker trait for immutable, self-validating values.
///
/// A value object can only be obtained through a fallible constructor, so
/// holding one is proof the input passed validation. `Email` is the canonical
/// example: once parsed it is trimmed, lowercased and well-formed.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {
    /// Raw input accepted by the constructor.
    type Raw: ?Sized;

    /// Validate and normalize raw input.
    fn parse(raw: &Self::Raw) -> crate::DomainResult<Self>;
}
