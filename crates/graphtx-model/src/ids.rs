//! Newtype record identifiers.
//!
//! Every cross-record reference in the engine is a typed index, never a raw
//! integer or a pointer: chains are spliced by looking an id up in a staging
//! map, not by following an in-memory reference. See `graphtx-engine` for the
//! staging-map-first lookup this depends on.

use std::fmt;

macro_rules! id_type {
    ($name:ident, $repr:ty) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name(pub $repr);

        impl $name {
            pub const fn new(v: $repr) -> Self {
                Self(v)
            }

            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(v: $repr) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(NodeId, u64);
id_type!(RelationshipId, u64);
id_type!(PropertyRecordId, u64);
id_type!(DynamicRecordId, u64);
id_type!(PropertyIndexId, u32);
id_type!(RelationshipTypeId, u32);

/// The owning primitive of a property chain: either a node or a relationship.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Owner {
    Node(NodeId),
    Relationship(RelationshipId),
}

impl Owner {
    pub fn is_node(self) -> bool {
        matches!(self, Owner::Node(_))
    }
}
