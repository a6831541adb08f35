//! Aspects: immutable predicates over sets of component kinds.
//!
//! An [`Aspect`] is how systems query the entity store. It expresses
//! "needs A, may use B, and exactly one of {C, D}" without a boolean
//! expression tree:
//!
//! - `mandatory`: every kind must be attached.
//! - `optional`: never required, but included in a match's view if attached.
//! - `either_or`: groups of kinds; for every group exactly one member must be
//!   attached.
//!
//! Groups are not required to be disjoint. A kind that belongs to two groups
//! can satisfy both of them at once.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::component::ComponentName;

/// A query predicate over the set of component kinds attached to an entity.
#[derive(Debug, Clone, Default)]
pub struct Aspect {
    mandatory: BTreeSet<ComponentName>,
    optional: BTreeSet<ComponentName>,
    either_or: BTreeSet<BTreeSet<ComponentName>>,
}

impl Aspect {
    /// Create an aspect from its three parts.
    ///
    /// Empty either-or groups are discarded: no entity could ever have
    /// exactly one member of an empty group.
    #[must_use]
    pub fn new<M, O, G, N>(mandatory: M, optional: O, either_or: G) -> Self
    where
        M: IntoIterator<Item = N>,
        O: IntoIterator<Item = N>,
        G: IntoIterator,
        G::Item: IntoIterator<Item = N>,
        N: Into<ComponentName>,
    {
        Self {
            mandatory: mandatory.into_iter().map(Into::into).collect(),
            optional: optional.into_iter().map(Into::into).collect(),
            either_or: either_or
                .into_iter()
                .map(|group| group.into_iter().map(Into::into).collect::<BTreeSet<_>>())
                .filter(|group| !group.is_empty())
                .collect(),
        }
    }

    /// An aspect with only mandatory kinds.
    #[must_use]
    pub fn with<N: Into<ComponentName>>(mandatory: impl IntoIterator<Item = N>) -> Self {
        Self {
            mandatory: mandatory.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add optional kinds.
    #[must_use]
    pub fn optional<N: Into<ComponentName>>(mut self, kinds: impl IntoIterator<Item = N>) -> Self {
        self.optional.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Add one either-or group. An empty group is ignored.
    #[must_use]
    pub fn one_of<N: Into<ComponentName>>(mut self, group: impl IntoIterator<Item = N>) -> Self {
        let group: BTreeSet<ComponentName> = group.into_iter().map(Into::into).collect();
        if !group.is_empty() {
            self.either_or.insert(group);
        }
        self
    }

    #[must_use]
    pub fn mandatory(&self) -> &BTreeSet<ComponentName> {
        &self.mandatory
    }

    #[must_use]
    pub fn optionals(&self) -> &BTreeSet<ComponentName> {
        &self.optional
    }

    #[must_use]
    pub fn either_or(&self) -> &BTreeSet<BTreeSet<ComponentName>> {
        &self.either_or
    }

    /// Every kind named in any either-or group.
    #[must_use]
    pub fn flat_either_or(&self) -> BTreeSet<&ComponentName> {
        self.either_or.iter().flatten().collect()
    }

    /// Every kind this aspect references: mandatory, optional and either-or.
    #[must_use]
    pub fn all(&self) -> BTreeSet<&ComponentName> {
        self.mandatory
            .iter()
            .chain(&self.optional)
            .chain(self.either_or.iter().flatten())
            .collect()
    }

    /// Returns `true` if `attached` holds every mandatory kind and exactly one
    /// kind from each either-or group. Optional kinds play no part.
    #[must_use]
    pub fn is_matched(&self, attached: &BTreeSet<ComponentName>) -> bool {
        self.mandatory.is_subset(attached)
            && self
                .either_or
                .iter()
                .all(|group| group.intersection(attached).count() == 1)
    }

    /// For each either-or group with exactly one attached member, yields that
    /// member. Groups with zero or several attached members yield nothing, so
    /// callers must not assume one item per group.
    pub fn xor<'a>(
        &'a self,
        attached: &'a BTreeSet<ComponentName>,
    ) -> impl Iterator<Item = &'a ComponentName> + 'a {
        self.either_or.iter().filter_map(move |group| {
            let mut hits = group.intersection(attached);
            match (hits.next(), hits.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        })
    }

    /// Returns `true` if a matched entity's view should include `kind`.
    ///
    /// That is the case for mandatory and optional kinds, and for the
    /// resolved pick of each either-or group.
    #[must_use]
    pub fn selects(&self, kind: &ComponentName, attached: &BTreeSet<ComponentName>) -> bool {
        self.mandatory.contains(kind)
            || self.optional.contains(kind)
            || self.xor(attached).any(|pick| pick == kind)
    }

    /// The identity used by `Eq` and `Hash`: mandatory and optional kinds as
    /// one set, either-or groups kept as groups.
    fn identity(&self) -> (BTreeSet<&ComponentName>, &BTreeSet<BTreeSet<ComponentName>>) {
        (self.mandatory.union(&self.optional).collect(), &self.either_or)
    }
}

/// Two aspects are equal when their mandatory ∪ optional kinds coincide and
/// they have the same either-or groups. Moving a kind between mandatory and
/// optional therefore does not change identity, even though it changes what
/// matches. Caches keyed by aspect must account for this.
impl PartialEq for Aspect {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Aspect {}

impl Hash for Aspect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
