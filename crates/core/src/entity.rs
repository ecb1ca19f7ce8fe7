//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stored records (quotations, clients, tickets) implement this so generic
/// infrastructure can address them by a strongly-typed id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the owning user's identifier.
    fn owner_id(&self) -> crate::UserId;
}
