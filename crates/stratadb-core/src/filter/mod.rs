//! Canonical, immutable query-filter algebra.
//!
//! Every filter is interned through a process-wide weak-valued canonical
//! set: two structurally equal filters are the same allocation, so `==` is
//! pointer identity and still means structural equality. Construction paths
//! (builders, the parser, normalization) all funnel through the set.

mod bind;
mod canon;
mod display;
mod join;
mod list;
mod normalize;
mod parse;
mod values;

#[cfg(test)]
mod tests;

pub use list::{ListEntry, PropertyFilterList};
pub use parse::ParseError;
pub use values::FilterValues;

use crate::{
    model::{ChainedProperty, InvalidProperty, RecordModel},
    value::{Value, ValueError},
};
use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU8, Ordering},
    },
};
use thiserror::Error as ThisError;

///
/// RelOp
///
/// Relational operator of one property test.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// Operator satisfied exactly when `self` is not.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for RelOp {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            _ => Err(ParseError {
                message: format!("unknown relational operator '{text}'"),
                offset: 0,
                excerpt: text.chars().take(20).collect(),
            }),
        }
    }
}

///
/// Binding
///
/// Parameter slot state of one property test.
///
/// A positive bind-id identifies a parameter slot across occurrences of the
/// same `(property, operator)` pair; a constant carries its literal and is
/// never assigned a parameter.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Binding {
    Unbound,
    Bound(u32),
    Constant(Value),
}

impl Binding {
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

///
/// PropertyTest
///
/// Leaf test `chain op ?` or `chain op constant`.
///
/// Canonical equality covers the bind-id: the same chain and operator with
/// different bind-ids are distinct filters.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PropertyTest {
    pub chain: ChainedProperty,
    pub op: RelOp,
    pub binding: Binding,
}

///
/// FilterError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FilterError {
    #[error(transparent)]
    Property(#[from] InvalidProperty),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("filters range over different record types: '{left}' and '{right}'")]
    MixedRecordTypes { left: &'static str, right: &'static str },

    #[error("chain '{chain}' does not end on a join property")]
    NotAJoinChain { chain: String },

    #[error("sub-filter ranges over '{found}', the join targets '{expected}'")]
    SubFilterRecordMismatch { expected: &'static str, found: &'static str },

    #[error("filter must be bound before values are supplied")]
    NotBound,

    #[error("value supplied but no blank parameter remains")]
    NoBlankParameter,

    #[error("parameter for '{property}' has no supplied value")]
    MissingValue { property: String },

    #[error("filter invariant violated: {message}")]
    InvariantViolation { message: String },
}

// Memo bits on binary nodes: one atomic word carrying known/value pairs for
// each derived flag. Racing writers recompute the same answer, so lost
// updates are harmless; publication is release/acquire.
const MEMO_BOUND_KNOWN: u8 = 1 << 0;
const MEMO_BOUND: u8 = 1 << 1;
const MEMO_REDUCED_KNOWN: u8 = 1 << 2;
const MEMO_REDUCED: u8 = 1 << 3;
const MEMO_DNF_KNOWN: u8 = 1 << 4;
const MEMO_DNF: u8 = 1 << 5;
const MEMO_CNF_KNOWN: u8 = 1 << 6;
const MEMO_CNF: u8 = 1 << 7;

///
/// Node
///
/// One interned filter node. Identity of the allocation is canonical
/// identity; the memo word and list cache are derived state only.
///

pub(crate) struct Node {
    pub(crate) record: &'static RecordModel,
    pub(crate) kind: Kind,
    memo: AtomicU8,
    list: OnceLock<Arc<PropertyFilterList>>,
}

pub(crate) enum Kind {
    Open,
    Closed,
    Property(PropertyTest),
    And { left: Filter, right: Filter },
    Or { left: Filter, right: Filter },
    Exists { chain: ChainedProperty, sub: Filter, negated: bool },
}

impl Node {
    pub(crate) fn new(record: &'static RecordModel, kind: Kind) -> Self {
        Self { record, kind, memo: AtomicU8::new(0), list: OnceLock::new() }
    }

    // Structural equality over canonical children: child comparison is
    // pointer comparison because children are already interned.
    pub(crate) fn structural_eq(&self, other: &Self) -> bool {
        if !ptr::eq(self.record, other.record) {
            return false;
        }
        match (&self.kind, &other.kind) {
            (Kind::Open, Kind::Open) | (Kind::Closed, Kind::Closed) => true,
            (Kind::Property(a), Kind::Property(b)) => a == b,
            (Kind::And { left: al, right: ar }, Kind::And { left: bl, right: br })
            | (Kind::Or { left: al, right: ar }, Kind::Or { left: bl, right: br }) => {
                al == bl && ar == br
            }
            (
                Kind::Exists { chain: ac, sub: asub, negated: an },
                Kind::Exists { chain: bc, sub: bsub, negated: bn },
            ) => an == bn && asub == bsub && ac == bc,
            _ => false,
        }
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        let mut hasher = std::hash::DefaultHasher::new();
        ptr::from_ref(self.record).hash(&mut hasher);
        match &self.kind {
            Kind::Open => 0u8.hash(&mut hasher),
            Kind::Closed => 1u8.hash(&mut hasher),
            Kind::Property(test) => {
                2u8.hash(&mut hasher);
                test.hash(&mut hasher);
            }
            Kind::And { left, right } => {
                3u8.hash(&mut hasher);
                left.hash(&mut hasher);
                right.hash(&mut hasher);
            }
            Kind::Or { left, right } => {
                4u8.hash(&mut hasher);
                left.hash(&mut hasher);
                right.hash(&mut hasher);
            }
            Kind::Exists { chain, sub, negated } => {
                5u8.hash(&mut hasher);
                chain.hash(&mut hasher);
                sub.hash(&mut hasher);
                negated.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    fn memo_get(&self, known: u8, value: u8) -> Option<bool> {
        let word = self.memo.load(Ordering::Acquire);
        if word & known == 0 { None } else { Some(word & value != 0) }
    }

    fn memo_set(&self, known: u8, value: u8, flag: bool) {
        let bits = if flag { known | value } else { known };
        self.memo.fetch_or(bits, Ordering::Release);
    }
}

///
/// FilterRef
///
/// Borrowed view of one node for callers that match on shape. The source's
/// double-dispatch visitors become `match`es over this sum.
///

pub enum FilterRef<'a> {
    Open,
    Closed,
    Property(&'a PropertyTest),
    And(&'a Filter, &'a Filter),
    Or(&'a Filter, &'a Filter),
    Exists { chain: &'a ChainedProperty, sub: &'a Filter, negated: bool },
}

///
/// Filter
///
/// Shared handle to one canonical filter node.
///

#[derive(Clone)]
pub struct Filter(pub(crate) Arc<Node>);

impl Filter {
    /// The always-true filter; identity of `and`.
    #[must_use]
    pub fn open(record: &'static RecordModel) -> Self {
        canon::canonicalize(Node::new(record, Kind::Open))
    }

    /// The always-false filter; identity of `or`.
    #[must_use]
    pub fn closed(record: &'static RecordModel) -> Self {
        canon::canonicalize(Node::new(record, Kind::Closed))
    }

    /// Parse, canonicalize, and memoize a filter by `(record, expr)`.
    pub fn filter_for(record: &'static RecordModel, expr: &str) -> Result<Self, FilterError> {
        canon::filter_for(record, expr)
    }

    /// Unbound property test over a dotted path.
    pub fn property(
        record: &'static RecordModel,
        path: &str,
        op: RelOp,
    ) -> Result<Self, FilterError> {
        let chain = ChainedProperty::resolve(record, path)?;
        Ok(Self::property_test(record, chain, op, Binding::Unbound))
    }

    /// Constant property test over a dotted path. The value is adapted to
    /// the property's declared kind up front.
    pub fn property_value(
        record: &'static RecordModel,
        path: &str,
        op: RelOp,
        value: Value,
    ) -> Result<Self, FilterError> {
        let chain = ChainedProperty::resolve(record, path)?;
        let value = value.adapt_to(chain.last().property)?;
        Ok(Self::property_test(record, chain, op, Binding::Constant(value)))
    }

    pub(crate) fn property_test(
        record: &'static RecordModel,
        chain: ChainedProperty,
        op: RelOp,
        binding: Binding,
    ) -> Self {
        canon::canonicalize(Node::new(
            record,
            Kind::Property(PropertyTest { chain, op, binding }),
        ))
    }

    /// Conjunction. `open` and `closed` are identity and absorbing elements.
    pub fn and(&self, other: &Self) -> Result<Self, FilterError> {
        self.check_same_record(other)?;
        Ok(match (self.shape(), other.shape()) {
            (FilterRef::Open, _) => other.clone(),
            (_, FilterRef::Open) => self.clone(),
            (FilterRef::Closed, _) | (_, FilterRef::Closed) => Self::closed(self.record()),
            _ => canon::canonicalize(Node::new(
                self.record(),
                Kind::And { left: self.clone(), right: other.clone() },
            )),
        })
    }

    /// Disjunction. `closed` and `open` are identity and absorbing elements.
    pub fn or(&self, other: &Self) -> Result<Self, FilterError> {
        self.check_same_record(other)?;
        Ok(match (self.shape(), other.shape()) {
            (FilterRef::Closed, _) => other.clone(),
            (_, FilterRef::Closed) => self.clone(),
            (FilterRef::Open, _) | (_, FilterRef::Open) => Self::open(self.record()),
            _ => canon::canonicalize(Node::new(
                self.record(),
                Kind::Or { left: self.clone(), right: other.clone() },
            )),
        })
    }

    /// Shortcut: `self & property(path op ?)`.
    pub fn and_property(&self, path: &str, op: RelOp) -> Result<Self, FilterError> {
        let leaf = Self::property(self.record(), path, op)?;
        self.and(&leaf)
    }

    /// Shortcut: `self | property(path op ?)`.
    pub fn or_property(&self, path: &str, op: RelOp) -> Result<Self, FilterError> {
        let leaf = Self::property(self.record(), path, op)?;
        self.or(&leaf)
    }

    /// Shortcut: `self & property(path op value)`.
    pub fn and_value(&self, path: &str, op: RelOp, value: Value) -> Result<Self, FilterError> {
        let leaf = Self::property_value(self.record(), path, op, value)?;
        self.and(&leaf)
    }

    /// Shortcut: `self | property(path op value)`.
    pub fn or_value(&self, path: &str, op: RelOp, value: Value) -> Result<Self, FilterError> {
        let leaf = Self::property_value(self.record(), path, op, value)?;
        self.or(&leaf)
    }

    /// Existential quantifier over a join chain.
    ///
    /// Collapse and rewrite rules:
    /// - a `closed` sub-filter collapses the whole node to `closed`
    ///   (`open` when negated);
    /// - a many-to-one last join with a non-open sub-filter flattens to the
    ///   sub-filter joined through the chain.
    pub fn exists(
        record: &'static RecordModel,
        chain: ChainedProperty,
        sub: &Self,
        negated: bool,
    ) -> Result<Self, FilterError> {
        let Some(target) = chain.join_target() else {
            return Err(FilterError::NotAJoinChain { chain: chain.to_string() });
        };
        if !target.same_as(sub.record()) {
            return Err(FilterError::SubFilterRecordMismatch {
                expected: target.name,
                found: sub.record().name,
            });
        }

        if sub.is_closed() {
            return Ok(if negated { Self::open(record) } else { Self::closed(record) });
        }

        let last = chain.last().property;
        if !last.kind.is_to_many_join() && !sub.is_open() {
            let joined = join::as_joined_from(sub, &chain)?;
            return Ok(if negated { joined.not() } else { joined });
        }

        Ok(canon::canonicalize(Node::new(
            record,
            Kind::Exists { chain, sub: sub.clone(), negated },
        )))
    }

    /// Negation, pushed into the leaves: De Morgan over `and`/`or`,
    /// operator reversal (plus inner/outer toggling) on property tests,
    /// flag toggling on `exists`.
    #[must_use]
    pub fn not(&self) -> Self {
        match self.shape() {
            FilterRef::Open => Self::closed(self.record()),
            FilterRef::Closed => Self::open(self.record()),
            FilterRef::Property(test) => {
                let chain = if test.chain.has_joins() {
                    test.chain.toggle_outer_joins()
                } else {
                    test.chain.clone()
                };
                Self::property_test(self.record(), chain, test.op.reverse(), test.binding.clone())
            }
            FilterRef::And(left, right) => {
                left.not().or(&right.not()).expect("children share a record type")
            }
            FilterRef::Or(left, right) => {
                left.not().and(&right.not()).expect("children share a record type")
            }
            FilterRef::Exists { chain, sub, negated } => canon::canonicalize(Node::new(
                self.record(),
                Kind::Exists { chain: chain.clone(), sub: sub.clone(), negated: !negated },
            )),
        }
    }

    #[must_use]
    pub fn record(&self) -> &'static RecordModel {
        self.0.record
    }

    #[must_use]
    pub fn shape(&self) -> FilterRef<'_> {
        match &self.0.kind {
            Kind::Open => FilterRef::Open,
            Kind::Closed => FilterRef::Closed,
            Kind::Property(test) => FilterRef::Property(test),
            Kind::And { left, right } => FilterRef::And(left, right),
            Kind::Or { left, right } => FilterRef::Or(left, right),
            Kind::Exists { chain, sub, negated } => {
                FilterRef::Exists { chain, sub, negated: *negated }
            }
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.0.kind, Kind::Open)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.0.kind, Kind::Closed)
    }

    /// Whether every property test carries a bind-id or constant.
    /// Memoized on binary nodes.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        match &self.0.kind {
            Kind::Open | Kind::Closed => true,
            Kind::Property(test) => !matches!(test.binding, Binding::Unbound),
            Kind::Exists { sub, .. } => sub.is_bound(),
            Kind::And { left, right } | Kind::Or { left, right } => {
                if let Some(flag) = self.0.memo_get(MEMO_BOUND_KNOWN, MEMO_BOUND) {
                    return flag;
                }
                let flag = left.is_bound() && right.is_bound();
                self.0.memo_set(MEMO_BOUND_KNOWN, MEMO_BOUND, flag);
                flag
            }
        }
    }

    /// Assign bind-ids to every unbound property test.
    pub fn bind(&self) -> Result<Self, FilterError> {
        bind::bind(self)
    }

    /// Reset every bind-id to the unbound state.
    #[must_use]
    pub fn unbind(&self) -> Self {
        bind::unbind(self)
    }

    /// Left-normalized, absorption-reduced equivalent.
    #[must_use]
    pub fn reduce(&self) -> Self {
        normalize::reduce(self)
    }

    #[must_use]
    pub fn is_reduced(&self) -> bool {
        normalize::is_reduced(self)
    }

    /// Disjunctive normal form.
    #[must_use]
    pub fn dnf(&self) -> Self {
        normalize::dnf(self)
    }

    #[must_use]
    pub fn is_dnf(&self) -> bool {
        normalize::is_dnf(self)
    }

    /// Conjunctive normal form.
    #[must_use]
    pub fn cnf(&self) -> Self {
        normalize::cnf(self)
    }

    #[must_use]
    pub fn is_cnf(&self) -> bool {
        normalize::is_cnf(self)
    }

    /// Lift this filter through a join: every chain gains `join` as prefix
    /// and the result ranges over the join's record type.
    pub fn as_joined_from(&self, join: &ChainedProperty) -> Result<Self, FilterError> {
        join::as_joined_from(self, join)
    }

    /// Split into `(not_joined, remainder)` such that
    /// `not_joined.as_joined_from(join) & remainder == self`.
    pub fn not_joined_from(&self, join: &ChainedProperty) -> Result<(Self, Self), FilterError> {
        join::not_joined_from(self, join)
    }

    /// Leaf property tests in left-to-right tree order, cached on this node.
    #[must_use]
    pub fn property_list(&self) -> Arc<PropertyFilterList> {
        self.0.list.get_or_init(|| Arc::new(PropertyFilterList::build(self))).clone()
    }

    /// Empty value snapshot over a bound filter.
    pub fn initial_values(&self) -> Result<FilterValues, FilterError> {
        FilterValues::new(self)
    }

    fn check_same_record(&self, other: &Self) -> Result<(), FilterError> {
        if self.record().same_as(other.record()) {
            Ok(())
        } else {
            Err(FilterError::MixedRecordTypes {
                left: self.record().name,
                right: other.record().name,
            })
        }
    }

    pub(crate) fn memo_reduced(&self) -> Option<bool> {
        self.0.memo_get(MEMO_REDUCED_KNOWN, MEMO_REDUCED)
    }

    pub(crate) fn memo_set_reduced(&self, flag: bool) {
        self.0.memo_set(MEMO_REDUCED_KNOWN, MEMO_REDUCED, flag);
    }

    pub(crate) fn memo_dnf(&self) -> Option<bool> {
        self.0.memo_get(MEMO_DNF_KNOWN, MEMO_DNF)
    }

    pub(crate) fn memo_set_dnf(&self, flag: bool) {
        self.0.memo_set(MEMO_DNF_KNOWN, MEMO_DNF, flag);
    }

    pub(crate) fn memo_cnf(&self) -> Option<bool> {
        self.0.memo_get(MEMO_CNF_KNOWN, MEMO_CNF)
    }

    pub(crate) fn memo_set_cnf(&self, flag: bool) {
        self.0.memo_set(MEMO_CNF_KNOWN, MEMO_CNF, flag);
    }
}

// Canonical identity: interning makes pointer equality and structural
// equality the same relation.
impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({}: {self})", self.record().name)
    }
}
