//! Immutable value snapshots over bound filters.
//!
//! Snapshots form a cons list: `with` extends the chain, so two callers can
//! branch from a common prefix without copying. Lookup walks the chain, or
//! a lazily built map once the chain is long enough to matter.

use crate::{
    filter::{Binding, Filter, FilterError, FilterRef, PropertyFilterList},
    value::Value,
};
use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

// Chain length beyond which lookups materialize the map.
const MAP_THRESHOLD: usize = 8;

///
/// FilterValues
///
/// One immutable snapshot of supplied parameter values for a bound filter.
///

#[derive(Clone)]
pub struct FilterValues {
    cell: Arc<Cell>,
}

struct Cell {
    filter: Filter,
    list: Arc<PropertyFilterList>,
    /// Parameters supplied up to and including this cell.
    supplied: usize,
    assignment: Option<(usize, Value)>,
    prev: Option<Arc<Cell>>,
    map: OnceLock<HashMap<usize, Value>>,
}

impl FilterValues {
    pub(crate) fn new(filter: &Filter) -> Result<Self, FilterError> {
        if !filter.is_bound() {
            return Err(FilterError::NotBound);
        }

        let list = filter.property_list();
        Ok(Self {
            cell: Arc::new(Cell {
                filter: filter.clone(),
                list,
                supplied: 0,
                assignment: None,
                prev: None,
                map: OnceLock::new(),
            }),
        })
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.cell.filter
    }

    /// Parameters supplied so far.
    #[must_use]
    pub fn supplied_count(&self) -> usize {
        self.cell.supplied
    }

    /// Supply the next still-blank parameter, in property order. Constants
    /// are pre-filled and skipped. The value is adapted to the property's
    /// declared kind.
    pub fn with(&self, value: Value) -> Result<Self, FilterError> {
        let index = self.cell.supplied;
        let entry =
            self.cell.list.parameter(index).ok_or(FilterError::NoBlankParameter)?;
        let value = value.adapt_to(entry.test().chain.last().property)?;

        Ok(Self {
            cell: Arc::new(Cell {
                filter: self.cell.filter.clone(),
                list: self.cell.list.clone(),
                supplied: index + 1,
                assignment: Some((index, value)),
                prev: Some(self.cell.clone()),
                map: OnceLock::new(),
            }),
        })
    }

    /// Supply several values in order.
    pub fn with_values<I>(&self, values: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut snapshot = self.clone();
        for value in values {
            snapshot = snapshot.with(value)?;
        }
        Ok(snapshot)
    }

    /// Value of one parameter slot, if supplied.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        if self.cell.supplied > MAP_THRESHOLD {
            return self.map().get(&index).cloned();
        }

        let mut cell = Some(&self.cell);
        while let Some(current) = cell {
            if let Some((slot, value)) = &current.assignment {
                if *slot == index {
                    return Some(value.clone());
                }
            }
            cell = current.prev.as_ref();
        }
        None
    }

    /// All parameter values in declared property order.
    ///
    /// The chain is walked newest-first against the cached property list,
    /// so no map materializes here.
    pub fn get_values(&self) -> Result<Vec<Value>, FilterError> {
        let count = self.cell.list.parameter_count();
        let mut out: Vec<Option<Value>> = vec![None; count];

        let mut cell = Some(&self.cell);
        while let Some(current) = cell {
            if let Some((slot, value)) = &current.assignment {
                if out[*slot].is_none() {
                    out[*slot] = Some(value.clone());
                }
            }
            cell = current.prev.as_ref();
        }

        out.into_iter()
            .enumerate()
            .map(|(index, value)| {
                value.ok_or_else(|| FilterError::MissingValue {
                    property: self
                        .cell
                        .list
                        .parameter(index)
                        .map_or_else(String::new, |entry| entry.test().chain.to_string()),
                })
            })
            .collect()
    }

    /// Values supplied so far, in declared property order; constants and
    /// blank slots are omitted.
    #[must_use]
    pub fn get_supplied_values(&self) -> Vec<Value> {
        (0..self.cell.supplied).filter_map(|index| self.get(index)).collect()
    }

    /// Portable form: the filter's textual spelling plus supplied values.
    #[must_use]
    pub fn to_parts(&self) -> (String, Vec<Value>) {
        (self.cell.filter.to_string(), self.get_supplied_values())
    }

    /// Rehydrate a snapshot: parse, bind, and replay the supplied values.
    pub fn from_parts(
        record: &'static crate::model::RecordModel,
        expr: &str,
        values: Vec<Value>,
    ) -> Result<Self, FilterError> {
        let filter = Filter::filter_for(record, expr)?.bind()?;
        filter.initial_values()?.with_values(values)
    }

    /// Filter with every supplied parameter replaced by its constant.
    #[must_use]
    pub fn substituted(&self) -> Filter {
        let mut supplied: Vec<Option<Value>> = vec![None; self.cell.list.parameter_count()];
        let mut cell = Some(&self.cell);
        while let Some(current) = cell {
            if let Some((slot, value)) = &current.assignment {
                if supplied[*slot].is_none() {
                    supplied[*slot] = Some(value.clone());
                }
            }
            cell = current.prev.as_ref();
        }

        let mut counter = 0;
        substitute(&self.cell.filter, &supplied, &mut counter)
    }

    fn map(&self) -> &HashMap<usize, Value> {
        self.cell.map.get_or_init(|| {
            let mut map = HashMap::new();
            let mut cell = Some(&self.cell);
            while let Some(current) = cell {
                if let Some((slot, value)) = &current.assignment {
                    map.entry(*slot).or_insert_with(|| value.clone());
                }
                cell = current.prev.as_ref();
            }
            map
        })
    }
}

// Rebuild the filter with supplied parameters turned into constants; the
// counter advances in the same order the property list was collected.
fn substitute(filter: &Filter, supplied: &[Option<Value>], counter: &mut usize) -> Filter {
    match filter.shape() {
        FilterRef::Open | FilterRef::Closed => filter.clone(),

        FilterRef::Property(test) => {
            if test.binding.is_constant() {
                return filter.clone();
            }
            let slot = *counter;
            *counter += 1;
            match supplied.get(slot).and_then(Clone::clone) {
                Some(value) => Filter::property_test(
                    filter.record(),
                    test.chain.clone(),
                    test.op,
                    Binding::Constant(value),
                ),
                None => filter.clone(),
            }
        }

        FilterRef::And(left, right) => {
            let left = substitute(left, supplied, counter);
            let right = substitute(right, supplied, counter);
            left.and(&right).expect("children share a record type")
        }

        FilterRef::Or(left, right) => {
            let left = substitute(left, supplied, counter);
            let right = substitute(right, supplied, counter);
            left.or(&right).expect("children share a record type")
        }

        FilterRef::Exists { chain, sub, negated } => {
            let sub = substitute(sub, supplied, counter);
            Filter::exists(filter.record(), chain.clone(), &sub, negated)
                .expect("exists shape is already validated")
        }
    }
}

impl PartialEq for FilterValues {
    fn eq(&self, other: &Self) -> bool {
        self.cell.filter == other.cell.filter
            && self.get_supplied_values() == other.get_supplied_values()
    }
}

impl Eq for FilterValues {}

impl Hash for FilterValues {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cell.filter.hash(state);
        self.get_supplied_values().hash(state);
    }
}

impl fmt::Display for FilterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.substituted())
    }
}

impl fmt::Debug for FilterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterValues")
            .field("filter", &self.cell.filter)
            .field("supplied", &self.get_supplied_values())
            .finish()
    }
}
