//! Placeholder numbering.
//!
//! Fixed point: every distinct occurrence of a `(property, operator)` pair
//! receives a distinct positive bind-id, stable across repeated binds.
//! The walk keeps per-pair state `(highest, seen)`; a fresh leaf takes
//! `highest + 1`, and a bound leaf whose id was already seen in its pair
//! group is re-bound the same way.

use crate::{
    filter::{Binding, Filter, FilterError, FilterRef, RelOp},
    model::ChainedProperty,
};
use std::collections::{HashMap, HashSet};

type PairKey = (ChainedProperty, RelOp);

#[derive(Default)]
struct PairState {
    highest: u32,
    seen: HashSet<u32>,
}

impl PairState {
    fn fresh(&mut self) -> u32 {
        self.highest += 1;
        self.seen.insert(self.highest);
        self.highest
    }

    fn observe(&mut self, id: u32) -> Option<u32> {
        if self.seen.insert(id) {
            self.highest = self.highest.max(id);
            None
        } else {
            Some(self.fresh())
        }
    }
}

pub(crate) fn bind(filter: &Filter) -> Result<Filter, FilterError> {
    let mut state: HashMap<PairKey, PairState> = HashMap::new();
    bind_walk(filter, &mut state)
}

fn bind_walk(
    filter: &Filter,
    state: &mut HashMap<PairKey, PairState>,
) -> Result<Filter, FilterError> {
    match filter.shape() {
        FilterRef::Open | FilterRef::Closed => Ok(filter.clone()),

        FilterRef::Property(test) => {
            let pair = state.entry((test.chain.clone(), test.op)).or_default();
            let id = match &test.binding {
                Binding::Constant(_) => return Ok(filter.clone()),
                Binding::Unbound => pair.fresh(),
                Binding::Bound(id) => match pair.observe(*id) {
                    None => return Ok(filter.clone()),
                    Some(rebound) => rebound,
                },
            };
            Ok(Filter::property_test(
                filter.record(),
                test.chain.clone(),
                test.op,
                Binding::Bound(id),
            ))
        }

        FilterRef::And(left, right) => {
            let bound_left = bind_walk(left, state)?;
            let bound_right = bind_walk(right, state)?;
            if bound_left == *left && bound_right == *right {
                Ok(filter.clone())
            } else {
                bound_left.and(&bound_right)
            }
        }

        FilterRef::Or(left, right) => {
            let bound_left = bind_walk(left, state)?;
            let bound_right = bind_walk(right, state)?;
            if bound_left == *left && bound_right == *right {
                Ok(filter.clone())
            } else {
                bound_left.or(&bound_right)
            }
        }

        FilterRef::Exists { chain, sub, negated } => {
            // The sub-filter binds through the same state so parameter
            // identities propagate across nested scopes.
            let bound_sub = bind_walk(sub, state)?;
            check_exists_remainder(&bound_sub, chain)?;

            if bound_sub == *sub {
                Ok(filter.clone())
            } else {
                Filter::exists(filter.record(), chain.clone(), &bound_sub, negated)
            }
        }
    }
}

// A bound sub-filter must strip cleanly back through its own join; a
// non-open remainder indicates broken sub-filter construction and is
// surfaced, never swallowed.
fn check_exists_remainder(sub: &Filter, chain: &ChainedProperty) -> Result<(), FilterError> {
    let joined = sub.as_joined_from(chain)?;
    let (_, remainder) = joined.not_joined_from(chain)?;

    if remainder.is_open() {
        Ok(())
    } else {
        Err(FilterError::InvariantViolation {
            message: format!(
                "exists sub-filter over '{chain}' left a non-open remainder: {remainder}"
            ),
        })
    }
}

pub(crate) fn unbind(filter: &Filter) -> Filter {
    match filter.shape() {
        FilterRef::Open | FilterRef::Closed => filter.clone(),

        FilterRef::Property(test) => match &test.binding {
            Binding::Unbound | Binding::Constant(_) => filter.clone(),
            Binding::Bound(_) => Filter::property_test(
                filter.record(),
                test.chain.clone(),
                test.op,
                Binding::Unbound,
            ),
        },

        FilterRef::And(left, right) => {
            let left = unbind(left);
            let right = unbind(right);
            left.and(&right).expect("children share a record type")
        }

        FilterRef::Or(left, right) => {
            let left = unbind(left);
            let right = unbind(right);
            left.or(&right).expect("children share a record type")
        }

        FilterRef::Exists { chain, sub, negated } => {
            let sub = unbind(sub);
            Filter::exists(filter.record(), chain.clone(), &sub, negated)
                .expect("exists shape is already validated")
        }
    }
}
