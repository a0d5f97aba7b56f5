//! Join rewriting: lifting filters through joins and stripping them back.

use crate::{
    filter::{Filter, FilterError, FilterRef},
    model::{ChainedProperty, RecordModel},
};

/// Prepend `join` to every chain inside `filter`, producing a filter over
/// the join's record type. For `exists` nodes the prefix lands on the
/// node's own chain; sub-filters are untouched.
pub(crate) fn as_joined_from(
    filter: &Filter,
    join: &ChainedProperty,
) -> Result<Filter, FilterError> {
    let target = join_target(join)?;
    if !target.same_as(filter.record()) {
        return Err(FilterError::SubFilterRecordMismatch {
            expected: target.name,
            found: filter.record().name,
        });
    }

    joined_walk(filter, join)
}

fn joined_walk(filter: &Filter, join: &ChainedProperty) -> Result<Filter, FilterError> {
    let outer = join.record();
    match filter.shape() {
        FilterRef::Open => Ok(Filter::open(outer)),
        FilterRef::Closed => Ok(Filter::closed(outer)),

        FilterRef::Property(test) => {
            let chain = test.chain.prepend(join)?;
            Ok(Filter::property_test(outer, chain, test.op, test.binding.clone()))
        }

        FilterRef::And(left, right) => {
            let left = joined_walk(left, join)?;
            let right = joined_walk(right, join)?;
            left.and(&right)
        }

        FilterRef::Or(left, right) => {
            let left = joined_walk(left, join)?;
            let right = joined_walk(right, join)?;
            left.or(&right)
        }

        FilterRef::Exists { chain, sub, negated } => {
            let chain = chain.prepend(join)?;
            Filter::exists(outer, chain, sub, negated)
        }
    }
}

/// Split `filter` into `(not_joined, remainder)` over the CNF conjuncts:
/// conjuncts whose chains all start with `join` strip onto the joined type,
/// the rest stay. `not_joined.as_joined_from(join) & remainder == filter`,
/// and a DNF input yields DNF outputs.
pub(crate) fn not_joined_from(
    filter: &Filter,
    join: &ChainedProperty,
) -> Result<(Filter, Filter), FilterError> {
    let target = join_target(join)?;
    if !filter.record().same_as(join.record()) {
        return Err(FilterError::MixedRecordTypes {
            left: filter.record().name,
            right: join.record().name,
        });
    }

    let was_dnf = filter.is_dnf();
    let cnf = filter.cnf();

    let mut conjuncts = Vec::new();
    collect_conjuncts(&cnf, &mut conjuncts);

    let mut not_joined = Filter::open(target);
    let mut remainder = Filter::open(filter.record());

    for conjunct in conjuncts {
        match strip_tree(&conjunct, join, target) {
            Some(stripped) => not_joined = not_joined.and(&stripped)?,
            None => remainder = remainder.and(&conjunct)?,
        }
    }

    if was_dnf {
        not_joined = not_joined.dnf();
        remainder = remainder.dnf();
    }

    Ok((not_joined, remainder))
}

fn join_target(join: &ChainedProperty) -> Result<&'static RecordModel, FilterError> {
    join.join_target().ok_or_else(|| FilterError::NotAJoinChain { chain: join.to_string() })
}

fn collect_conjuncts(filter: &Filter, out: &mut Vec<Filter>) {
    if let FilterRef::And(left, right) = filter.shape() {
        collect_conjuncts(left, out);
        collect_conjuncts(right, out);
    } else {
        out.push(filter.clone());
    }
}

// Strip the join prefix from every chain in one conjunct, or report that
// the conjunct does not belong to the joined type.
fn strip_tree(
    filter: &Filter,
    join: &ChainedProperty,
    target: &'static RecordModel,
) -> Option<Filter> {
    match filter.shape() {
        FilterRef::Open => Some(Filter::open(target)),
        FilterRef::Closed => Some(Filter::closed(target)),

        FilterRef::Property(test) => {
            let chain = test.chain.strip_prefix(join)?;
            Some(Filter::property_test(target, chain, test.op, test.binding.clone()))
        }

        FilterRef::And(left, right) => {
            let left = strip_tree(left, join, target)?;
            let right = strip_tree(right, join, target)?;
            left.and(&right).ok()
        }

        FilterRef::Or(left, right) => {
            let left = strip_tree(left, join, target)?;
            let right = strip_tree(right, join, target)?;
            left.or(&right).ok()
        }

        FilterRef::Exists { chain, sub, negated } => {
            let chain = chain.strip_prefix(join)?;
            Filter::exists(target, chain, sub, negated).ok()
        }
    }
}
