//! Normal forms over the canonical algebra.
//!
//! Reduction groups contiguous same-operator nodes, removes absorbed
//! members, and merges groups back left-leaning. DNF/CNF distribute one
//! operator across the other after reducing. All three memoize their
//! outcome on binary nodes.

use crate::filter::{Filter, FilterRef};

#[derive(Clone, Copy, Eq, PartialEq)]
enum GroupOp {
    And,
    Or,
}

impl GroupOp {
    const fn dual(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

// Internal combinators: operands always come from one tree, so the record
// types agree by construction.
fn conj(left: &Filter, right: &Filter) -> Filter {
    left.and(right).expect("conjunction operands share a record type")
}

fn disj(left: &Filter, right: &Filter) -> Filter {
    left.or(right).expect("disjunction operands share a record type")
}

fn group_op(filter: &Filter) -> Option<(GroupOp, Filter, Filter)> {
    match filter.shape() {
        FilterRef::And(l, r) => Some((GroupOp::And, l.clone(), r.clone())),
        FilterRef::Or(l, r) => Some((GroupOp::Or, l.clone(), r.clone())),
        _ => None,
    }
}

pub(crate) fn reduce(filter: &Filter) -> Filter {
    if is_reduced(filter) {
        return filter.clone();
    }

    let result = reduce_inner(filter);
    result.memo_set_reduced(true);
    result
}

pub(crate) fn is_reduced(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::And(..) | FilterRef::Or(..) => {
            if let Some(flag) = filter.memo_reduced() {
                return flag;
            }
            let flag = reduce_inner(filter) == *filter;
            filter.memo_set_reduced(flag);
            flag
        }
        _ => true,
    }
}

fn reduce_inner(filter: &Filter) -> Filter {
    let Some((op, ..)) = group_op(filter) else {
        return filter.clone();
    };

    let mut members = Vec::new();
    collect_group(filter, op, &mut members);
    absorb(op, &mut members);

    let mut iter = members.into_iter();
    let first = iter.next().expect("reduced group keeps at least one member");
    iter.fold(first, |acc, member| match op {
        GroupOp::And => conj(&acc, &member),
        GroupOp::Or => disj(&acc, &member),
    })
}

// Flatten contiguous same-operator nodes into an insertion-ordered member
// set, reducing each member along the way.
fn collect_group(filter: &Filter, op: GroupOp, out: &mut Vec<Filter>) {
    if let Some((node_op, left, right)) = group_op(filter) {
        if node_op == op {
            collect_group(&left, op, out);
            collect_group(&right, op, out);
            return;
        }
    }

    let member = reduce(filter);
    if let Some((member_op, ..)) = group_op(&member) {
        if member_op == op {
            collect_group(&member, op, out);
            return;
        }
    }

    // Canonical identity makes duplicate detection a pointer check.
    if !out.contains(&member) {
        out.push(member);
    }
}

// Remove members absorbed by another member of the same group:
// `(x & y) | y => y` and `(x | y) & y => y`. A member absorbs another when
// it appears inside it through dual-operator nodes only.
fn absorb(op: GroupOp, members: &mut Vec<Filter>) {
    let snapshot = members.clone();
    let mut removed = vec![false; snapshot.len()];

    for (i, member) in snapshot.iter().enumerate() {
        for (j, absorber) in snapshot.iter().enumerate() {
            if i == j || removed[j] {
                continue;
            }
            if contains_through(member, absorber, op.dual()) {
                removed[i] = true;
                break;
            }
        }
    }

    let mut index = 0;
    members.retain(|_| {
        let keep = !removed[index];
        index += 1;
        keep
    });
}

// Scan for `needle` inside `hay`, recursing only through `through` nodes.
fn contains_through(hay: &Filter, needle: &Filter, through: GroupOp) -> bool {
    if hay == needle {
        return true;
    }
    match (group_op(hay), through) {
        (Some((GroupOp::And, left, right)), GroupOp::And)
        | (Some((GroupOp::Or, left, right)), GroupOp::Or) => {
            contains_through(&left, needle, through) || contains_through(&right, needle, through)
        }
        _ => false,
    }
}

pub(crate) fn dnf(filter: &Filter) -> Filter {
    let base = reduce(filter);
    let result = if is_dnf(&base) { base } else { dnf_convert(&base) };
    result.memo_set_dnf(true);
    result.memo_set_reduced(true);
    result
}

pub(crate) fn is_dnf(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::And(..) | FilterRef::Or(..) => {
            if let Some(flag) = filter.memo_dnf() {
                return flag;
            }
            let flag = check_dnf(filter);
            filter.memo_set_dnf(flag);
            flag
        }
        _ => true,
    }
}

fn check_dnf(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::Or(left, right) => is_dnf(left) && is_dnf(right),
        FilterRef::And(left, right) => no_disjunction(left) && no_disjunction(right),
        _ => true,
    }
}

fn no_disjunction(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::Or(..) => false,
        FilterRef::And(left, right) => no_disjunction(left) && no_disjunction(right),
        _ => true,
    }
}

fn dnf_convert(filter: &Filter) -> Filter {
    match filter.shape() {
        FilterRef::And(left, right) => {
            let left = dnf_convert(left);
            let right = dnf_convert(right);

            if let FilterRef::Or(a, b) = left.shape() {
                let first = dnf_convert(&conj(a, &right));
                let second = dnf_convert(&conj(b, &right));
                return reduce(&disj(&first, &second));
            }
            if let FilterRef::Or(a, b) = right.shape() {
                let first = dnf_convert(&conj(&left, a));
                let second = dnf_convert(&conj(&left, b));
                return reduce(&disj(&first, &second));
            }
            reduce(&conj(&left, &right))
        }
        FilterRef::Or(left, right) => {
            let left = dnf_convert(left);
            let right = dnf_convert(right);
            reduce(&disj(&left, &right))
        }
        _ => filter.clone(),
    }
}

pub(crate) fn cnf(filter: &Filter) -> Filter {
    let base = reduce(filter);
    let result = if is_cnf(&base) { base } else { cnf_convert(&base) };
    result.memo_set_cnf(true);
    result.memo_set_reduced(true);
    result
}

pub(crate) fn is_cnf(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::And(..) | FilterRef::Or(..) => {
            if let Some(flag) = filter.memo_cnf() {
                return flag;
            }
            let flag = check_cnf(filter);
            filter.memo_set_cnf(flag);
            flag
        }
        _ => true,
    }
}

fn check_cnf(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::And(left, right) => is_cnf(left) && is_cnf(right),
        FilterRef::Or(left, right) => no_conjunction(left) && no_conjunction(right),
        _ => true,
    }
}

fn no_conjunction(filter: &Filter) -> bool {
    match filter.shape() {
        FilterRef::And(..) => false,
        FilterRef::Or(left, right) => no_conjunction(left) && no_conjunction(right),
        _ => true,
    }
}

fn cnf_convert(filter: &Filter) -> Filter {
    match filter.shape() {
        FilterRef::Or(left, right) => {
            let left = cnf_convert(left);
            let right = cnf_convert(right);

            if let FilterRef::And(a, b) = left.shape() {
                let first = cnf_convert(&disj(a, &right));
                let second = cnf_convert(&disj(b, &right));
                return reduce(&conj(&first, &second));
            }
            if let FilterRef::And(a, b) = right.shape() {
                let first = cnf_convert(&disj(&left, a));
                let second = cnf_convert(&disj(&left, b));
                return reduce(&conj(&first, &second));
            }
            reduce(&disj(&left, &right))
        }
        FilterRef::And(left, right) => {
            let left = cnf_convert(left);
            let right = cnf_convert(right);
            reduce(&conj(&left, &right))
        }
        _ => filter.clone(),
    }
}
