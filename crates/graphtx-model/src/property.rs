use crate::ids::{DynamicRecordId, Owner, PropertyIndexId, PropertyRecordId};

/// Fixed overhead charged against `payload_cap` for every block regardless
/// of its value: a type tag plus the property-index id.
pub const BLOCK_HEADER_BYTES: usize = 1 + 4;

/// Which kind of dynamic chain a [`DynamicRef`] points into. Needed at
/// rollback time to free the chain's ids from the right free list
/// (spec.md §4.1 Rollback: "classified by block type").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DynamicChainKind {
    StringValue,
    ArrayValue,
    PropertyIndexKey,
    RelationshipTypeName,
}

/// A reference to a dynamic (variable-length) value chain. The chain's
/// bytes live in the out-of-scope dynamic-block store; what the engine
/// tracks is the head id, a cached logical length (for payload-cap
/// accounting without loading the chain), and whether it has been loaded
/// ("heavy") yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynamicRef {
    /// Not yet materialized: we know the head and the byte length but
    /// haven't walked the chain.
    Light { head: DynamicRecordId, byte_len: u32 },
    /// Materialized bytes, e.g. after `loadProperties`.
    Loaded { head: DynamicRecordId, bytes: Vec<u8> },
}

impl DynamicRef {
    pub fn head(&self) -> DynamicRecordId {
        match self {
            DynamicRef::Light { head, .. } => *head,
            DynamicRef::Loaded { head, .. } => *head,
        }
    }

    pub fn byte_len(&self) -> u32 {
        match self {
            DynamicRef::Light { byte_len, .. } => *byte_len,
            DynamicRef::Loaded { bytes, .. } => bytes.len() as u32,
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self, DynamicRef::Light { .. })
    }
}

/// The value carried by a [`PropertyBlock`]. `Bool`/`Int`/`Float` are
/// stored inline; `String`/`Array` live in a dynamic chain (spec.md §3:
/// "If type ∈ {STRING, ARRAY} the value lives in a dynamic chain").
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(DynamicRef),
    Array(DynamicRef),
}

impl PropertyValue {
    /// Bytes this value contributes to its block's on-record footprint.
    /// Dynamic values only pay for the pointer to their chain head; the
    /// chain's own bytes are accounted for in the dynamic-block store, not
    /// the payload cap of spec.md §4.3.
    pub fn inline_size(&self) -> usize {
        match self {
            PropertyValue::Bool(_) => 1,
            PropertyValue::Int(_) => 8,
            PropertyValue::Float(_) => 8,
            PropertyValue::String(_) | PropertyValue::Array(_) => 8,
        }
    }

    pub fn dynamic_chain_kind(&self) -> Option<DynamicChainKind> {
        match self {
            PropertyValue::String(_) => Some(DynamicChainKind::StringValue),
            PropertyValue::Array(_) => Some(DynamicChainKind::ArrayValue),
            _ => None,
        }
    }

    pub fn dynamic_head(&self) -> Option<DynamicRecordId> {
        match self {
            PropertyValue::String(r) | PropertyValue::Array(r) => Some(r.head()),
            _ => None,
        }
    }
}

/// One key/value slot inside a [`PropertyRecord`].
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyBlock {
    pub key_index_id: PropertyIndexId,
    pub value: PropertyValue,
    pub in_use: bool,
}

impl PropertyBlock {
    pub fn new(key_index_id: PropertyIndexId, value: PropertyValue) -> Self {
        Self {
            key_index_id,
            value,
            in_use: true,
        }
    }

    /// Bytes this block contributes to `payload_cap` while live. A block
    /// marked `!in_use` stays in place in `PropertyRecord::blocks` — this
    /// rendition never physically compacts a record — and contributes 0.
    pub fn size(&self) -> usize {
        if !self.in_use {
            return 0;
        }
        BLOCK_HEADER_BYTES + self.value.inline_size()
    }
}

/// A property record: a packed run of [`PropertyBlock`]s, one link in the
/// singly-linked property chain of a node or relationship (spec.md §3/§4.3).
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRecord {
    pub id: PropertyRecordId,
    pub in_use: bool,
    pub prev_prop: Option<PropertyRecordId>,
    pub next_prop: Option<PropertyRecordId>,
    pub owner: Option<Owner>,
    pub blocks: Vec<PropertyBlock>,
}

impl PropertyRecord {
    pub fn new(id: PropertyRecordId, owner: Owner) -> Self {
        Self {
            id,
            in_use: true,
            prev_prop: None,
            next_prop: None,
            owner: Some(owner),
            blocks: Vec::new(),
        }
    }

    /// Total bytes occupied by still-live blocks.
    pub fn live_size(&self) -> usize {
        self.blocks.iter().map(PropertyBlock::size).sum()
    }

    pub fn has_live_blocks(&self) -> bool {
        self.blocks.iter().any(|b| b.in_use)
    }

    pub fn find_block(&self, key: PropertyIndexId) -> Option<&PropertyBlock> {
        self.blocks.iter().find(|b| b.in_use && b.key_index_id == key)
    }

    pub fn find_block_mut(&mut self, key: PropertyIndexId) -> Option<&mut PropertyBlock> {
        self.blocks.iter_mut().find(|b| b.in_use && b.key_index_id == key)
    }
}

/// A property-index entry: the durable mapping from a property key name to
/// a small integer id. Immutable once created (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyIndexRecord {
    pub id: PropertyIndexId,
    pub in_use: bool,
    pub key: String,
}

/// A relationship-type entry, immutable once created (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipTypeRecord {
    pub id: crate::ids::RelationshipTypeId,
    pub in_use: bool,
    pub name: String,
}

/// A reference to exactly one block within a [`PropertyRecord`], as handed
/// back by `addProperty` and consumed by `changeProperty`/`removeProperty`
/// (spec.md §4.1 public contract). Cheap to copy; does not itself carry the
/// value, only enough to find the block again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyHandle {
    pub record_id: PropertyRecordId,
    pub key_index_id: PropertyIndexId,
}

/// The result of walking a primitive's property chain to materialize its
/// contents for a caller-side cache (spec.md §4.1 `nodeDelete`/`relDelete`,
/// §4.3 "Delete chain").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyData {
    pub entries: std::collections::BTreeMap<PropertyIndexId, PropertyValue>,
}
