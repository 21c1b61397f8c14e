use crate::ids::{NodeId, PropertyRecordId, RelationshipId, RelationshipTypeId};

/// One endpoint's two chain pointers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainLinks {
    pub prev: Option<RelationshipId>,
    pub next: Option<RelationshipId>,
}

/// Which endpoint of a relationship a node occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// A relationship record.
///
/// The four chain pointers form a doubly-linked list per endpoint
/// (spec.md §4.2). A self-loop (`first_node == second_node`) inhabits its
/// own chain twice: both `first` and `second` sides are live and must be
/// maintained independently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipRecord {
    pub id: RelationshipId,
    pub in_use: bool,
    pub first_node: NodeId,
    pub second_node: NodeId,
    pub rel_type: RelationshipTypeId,
    pub first: ChainLinks,
    pub second: ChainLinks,
    pub next_prop: Option<PropertyRecordId>,
}

impl RelationshipRecord {
    pub fn new(
        id: RelationshipId,
        rel_type: RelationshipTypeId,
        first_node: NodeId,
        second_node: NodeId,
    ) -> Self {
        Self {
            id,
            in_use: true,
            first_node,
            second_node,
            rel_type,
            first: ChainLinks::default(),
            second: ChainLinks::default(),
            next_prop: None,
        }
    }

    /// The side of `self` that faces `node`, if any. A self-loop faces the
    /// node on both sides.
    pub fn side_facing(&self, node: NodeId) -> Option<Side> {
        if self.first_node == node {
            Some(Side::First)
        } else if self.second_node == node {
            Some(Side::Second)
        } else {
            None
        }
    }

    pub fn links(&self, side: Side) -> ChainLinks {
        match side {
            Side::First => self.first,
            Side::Second => self.second,
        }
    }

    pub fn links_mut(&mut self, side: Side) -> &mut ChainLinks {
        match side {
            Side::First => &mut self.first,
            Side::Second => &mut self.second,
        }
    }

    pub fn endpoint(&self, side: Side) -> NodeId {
        match side {
            Side::First => self.first_node,
            Side::Second => self.second_node,
        }
    }
}
