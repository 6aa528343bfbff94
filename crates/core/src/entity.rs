//! Entity trait: records identified by a stable id rather than by value.

/// An identified marketplace record.
///
/// Stores are keyed by `Entity::Id`; `KIND` is used in not-found messages and
/// log fields.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    const KIND: &'static str;

    fn id(&self) -> Self::Id;
}
