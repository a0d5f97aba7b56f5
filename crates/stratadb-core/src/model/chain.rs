use crate::model::{InvalidProperty, PropertyKind, PropertyModel, RecordModel};
use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr,
    sync::Arc,
};

///
/// ChainSegment
///
/// One step of a chained property: the traversed property plus the
/// outer-join marker for this use of it.
///

#[derive(Clone, Copy)]
pub struct ChainSegment {
    pub property: &'static PropertyModel,
    pub outer: bool,
}

impl ChainSegment {
    #[must_use]
    pub const fn new(property: &'static PropertyModel) -> Self {
        Self { property, outer: false }
    }

    #[must_use]
    pub const fn outer(property: &'static PropertyModel) -> Self {
        Self { property, outer: true }
    }

    #[must_use]
    pub const fn is_join(&self) -> bool {
        self.property.kind.is_join()
    }
}

impl PartialEq for ChainSegment {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.property, other.property) && self.outer == other.outer
    }
}

impl Eq for ChainSegment {}

impl Hash for ChainSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::from_ref(self.property).hash(state);
        self.outer.hash(state);
    }
}

impl fmt::Debug for ChainSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outer {
            write!(f, "({})", self.property.name)
        } else {
            write!(f, "{}", self.property.name)
        }
    }
}

///
/// ChainedProperty
///
/// A non-empty path through the record type graph, rooted at one record
/// type. Value-typed: equality and hashing are structural over segment
/// identity, never over spelling.
///
/// Invariants:
/// - every segment except the last traverses a join property
/// - the last segment never carries an outer-join marker
///

#[derive(Clone)]
pub struct ChainedProperty {
    record: &'static RecordModel,
    segments: Arc<[ChainSegment]>,
}

impl PartialEq for ChainedProperty {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.record, other.record) && self.segments == other.segments
    }
}

impl Eq for ChainedProperty {}

impl ChainedProperty {
    /// Build a chain from explicit segments, enforcing chain invariants.
    pub fn new(
        record: &'static RecordModel,
        segments: Vec<ChainSegment>,
    ) -> Result<Self, InvalidProperty> {
        let Some((last, inner)) = segments.split_last() else {
            return Err(InvalidProperty::EmptyChain);
        };

        let mut owner = record;
        for segment in inner {
            let Some(target) = segment.property.join_target() else {
                return Err(InvalidProperty::NotAJoin {
                    record: owner.name,
                    property: segment.property.name,
                });
            };
            owner = target;
        }

        if last.outer {
            return Err(InvalidProperty::OuterOnLastSegment { property: last.property.name });
        }

        Ok(Self { record, segments: segments.into() })
    }

    /// Resolve a dotted path (`a.b.c`) against a record model.
    ///
    /// Outer-join markers have no dotted spelling here; they come from the
    /// parser or explicit segment construction.
    pub fn resolve(record: &'static RecordModel, path: &str) -> Result<Self, InvalidProperty> {
        let mut segments = Vec::new();
        let mut owner = record;

        for name in path.split('.') {
            let property =
                owner.property(name).ok_or_else(|| InvalidProperty::NotFound {
                    record: owner.name,
                    property: name.to_string(),
                })?;
            segments.push(ChainSegment::new(property));
            owner = property.join_target().unwrap_or(owner);
        }

        Self::new(record, segments)
    }

    #[must_use]
    pub const fn record(&self) -> &'static RecordModel {
        self.record
    }

    #[must_use]
    pub fn segments(&self) -> &[ChainSegment] {
        &self.segments
    }

    #[must_use]
    pub fn first(&self) -> ChainSegment {
        self.segments[0]
    }

    #[must_use]
    pub fn last(&self) -> ChainSegment {
        *self.segments.last().expect("chain is never empty")
    }

    /// Declared value kind of the chain (the last segment's kind).
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.last().property.kind
    }

    #[must_use]
    pub fn has_joins(&self) -> bool {
        self.segments.iter().any(ChainSegment::is_join)
    }

    /// Whether traversal can produce no row: any nullable or outer segment.
    #[must_use]
    pub fn admits_null(&self) -> bool {
        self.segments.iter().any(|s| s.property.nullable || s.outer)
    }

    /// Record type the last join targets, if the chain ends on a join.
    #[must_use]
    pub fn join_target(&self) -> Option<&'static RecordModel> {
        self.last().property.join_target()
    }

    /// Prepend a join chain, producing a chain over the join's record type.
    ///
    /// The join chain's last segment must target this chain's record type.
    pub fn prepend(&self, join: &Self) -> Result<Self, InvalidProperty> {
        let Some(target) = join.join_target() else {
            return Err(InvalidProperty::NotAJoin {
                record: join.record.name,
                property: join.last().property.name,
            });
        };
        debug_assert!(target.same_as(self.record), "join target/chain record mismatch");

        let mut segments = join.segments.to_vec();
        segments.extend_from_slice(&self.segments);
        Self::new(join.record, segments)
    }

    /// Strip a leading join chain, producing the remainder over the joined
    /// record type. Returns `None` when `join` is not a prefix.
    #[must_use]
    pub fn strip_prefix(&self, join: &Self) -> Option<Self> {
        if self.segments.len() <= join.segments.len() {
            return None;
        }
        let matches = self
            .segments
            .iter()
            .zip(join.segments.iter())
            .all(|(a, b)| ptr::eq(a.property, b.property));
        if !matches {
            return None;
        }

        let target = join.join_target()?;
        let rest = self.segments[join.segments.len()..].to_vec();
        Self::new(target, rest).ok()
    }

    /// Flip inner/outer markers on every join segment except the last
    /// segment. Used when a property test is negated.
    #[must_use]
    pub fn toggle_outer_joins(&self) -> Self {
        if self.segments.len() < 2 {
            return self.clone();
        }

        let mut segments = self.segments.to_vec();
        let last = segments.len() - 1;
        for segment in &mut segments[..last] {
            if segment.is_join() {
                segment.outer = !segment.outer;
            }
        }

        Self { record: self.record, segments: segments.into() }
    }
}

impl Hash for ChainedProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::from_ref(self.record).hash(state);
        self.segments.hash(state);
    }
}

impl fmt::Display for ChainedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if segment.outer {
                write!(f, "({})", segment.property.name)?;
            } else {
                f.write_str(segment.property.name)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChainedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{self}", self.record.name)
    }
}
