use graphtx_model::{NodeId, NodeRecord, PropertyIndexRecord, PropertyRecord, RelationshipRecord, RelationshipTypeRecord};

/// Whether a command records a creation, an in-place modification, or a
/// deletion of the carried record. Commit order (spec.md §4.1) groups by
/// this axis within each record kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One mutated store record, carried by the logical log at prepare time
/// and replayed at commit time (spec.md §6 "Command stream").
///
/// Design Note (spec.md §9, resolved in DESIGN.md): the original's log
/// format did not record a deleted relationship's endpoints, forcing
/// recovery to invalidate both endpoints unconditionally. This rendition
/// always carries `first_node`/`second_node` on every `Relationship`
/// command, created or deleted, so recovery can invalidate precisely.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    RelationshipType {
        kind: ChangeKind,
        record: RelationshipTypeRecord,
    },
    PropertyIndex {
        kind: ChangeKind,
        record: PropertyIndexRecord,
    },
    Node {
        kind: ChangeKind,
        record: NodeRecord,
    },
    Relationship {
        kind: ChangeKind,
        record: RelationshipRecord,
        first_node: NodeId,
        second_node: NodeId,
    },
    Property {
        kind: ChangeKind,
        record: PropertyRecord,
    },
}

impl Command {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Command::RelationshipType { kind, .. }
            | Command::PropertyIndex { kind, .. }
            | Command::Node { kind, .. }
            | Command::Relationship { kind, .. }
            | Command::Property { kind, .. } => *kind,
        }
    }
}

/// A batch of commands that were prepared and committed together, as they
/// appear in the logical log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoggedTransaction {
    pub tx_id: i64,
    pub commands: Vec<Command>,
}
