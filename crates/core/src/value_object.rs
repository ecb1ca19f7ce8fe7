//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable domain values with no identity of their own:
/// two instances with the same attribute values are the same value. Billing
/// addresses, goods lines, and computed tax summaries are value objects; a
/// client or a quotation is an entity.
///
/// To "modify" a value object, build a new one. This keeps values safe to
/// copy into snapshots (e.g. the goods snapshot a ticket carries) without
/// aliasing surprises.
///
/// The trait requires `Clone + PartialEq + Debug` so values can be copied,
/// compared in tests, and logged.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
