//! Open bag of cross-cutting declaration facts
//!
//! Facts like "this member is inherited" or "this name was
//! disambiguated after a clash" apply across declaration kinds but
//! only to some nodes. Rather than widening [`super::DeclarationNode`]
//! for each of them, they live in a typed heterogeneous map keyed by
//! fact type. Adding a new fact type requires no change to the node.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ident::DeclId;
use crate::platform::VariantId;

/// A fact that can be attached to a declaration node
///
/// Implementations must be plain data: they are shared between cloned
/// nodes and inspected by downcast.
pub trait ExtraFact: Any + fmt::Debug + Send + Sync {
    /// Upcast for downcasting to the concrete fact type
    fn as_any(&self) -> &dyn Any;
}

/// Typed heterogeneous fact map, at most one fact per type
#[derive(Default, Clone)]
pub struct Extra {
    facts: HashMap<TypeId, Arc<dyn ExtraFact>>,
}

impl Extra {
    /// Create an empty bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact, replacing any previous fact of the same type
    pub fn insert<T: ExtraFact>(&mut self, fact: T) {
        self.facts.insert(TypeId::of::<T>(), Arc::new(fact));
    }

    /// Builder form of [`Extra::insert`]
    #[must_use]
    pub fn with<T: ExtraFact>(mut self, fact: T) -> Self {
        self.insert(fact);
        self
    }

    /// Look up a fact by type
    #[must_use]
    pub fn get<T: ExtraFact>(&self) -> Option<&T> {
        self.facts
            .get(&TypeId::of::<T>())
            .and_then(|fact| fact.as_any().downcast_ref::<T>())
    }

    /// Whether a fact of the given type is present
    #[must_use]
    pub fn contains<T: ExtraFact>(&self) -> bool {
        self.facts.contains_key(&TypeId::of::<T>())
    }

    /// Number of facts in the bag
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the bag is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Union of two bags; facts from `other` win on type collision
    #[must_use]
    pub fn merged_with(&self, other: &Extra) -> Extra {
        let mut facts = self.facts.clone();
        for (type_id, fact) in &other.facts {
            facts.insert(*type_id, Arc::clone(fact));
        }
        Extra { facts }
    }
}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.facts.values()).finish()
    }
}

/// The declaration is a carried-over member authored elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedFrom(pub DeclId);

impl ExtraFact for InheritedFrom {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The member is boilerplate that tables may suppress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObviousMember;

impl ExtraFact for ObviousMember {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The declaration's display name was disambiguated after a clash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClashResolution {
    /// The disambiguated name to display
    pub display_name: String,
    /// Variants of the declarations it clashed with
    pub clashing_with: BTreeSet<VariantId>,
}

impl ExtraFact for ClashResolution {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
