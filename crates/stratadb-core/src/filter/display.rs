//! Canonical textual form. Output is parseable input: `|` < `&` < `!` <
//! atom, `&`/`|` spelled once, bound placeholders printed losslessly as
//! `?[n]`.

use crate::filter::{Binding, Filter, FilterRef};
use std::fmt;

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_filter(f, self)
    }
}

fn write_filter(f: &mut fmt::Formatter<'_>, filter: &Filter) -> fmt::Result {
    match filter.shape() {
        FilterRef::Open => f.write_str("open"),
        FilterRef::Closed => f.write_str("closed"),
        FilterRef::Property(test) => {
            write!(f, "{} {} ", test.chain, test.op)?;
            match &test.binding {
                Binding::Unbound => f.write_str("?"),
                Binding::Bound(id) => write!(f, "?[{id}]"),
                Binding::Constant(value) => write!(f, "{value}"),
            }
        }
        FilterRef::And(left, right) => {
            write_operand(f, left, Prec::And, false)?;
            f.write_str(" & ")?;
            write_operand(f, right, Prec::And, true)
        }
        FilterRef::Or(left, right) => {
            write_operand(f, left, Prec::Or, false)?;
            f.write_str(" | ")?;
            write_operand(f, right, Prec::Or, true)
        }
        FilterRef::Exists { chain, sub, negated } => {
            if negated {
                f.write_str("!")?;
            }
            write!(f, "{chain}({sub})")
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Prec {
    Or,
    And,
}

// The parser is left-associative, so a right-hand child at the same
// precedence level needs parentheses to survive a round trip.
fn write_operand(
    f: &mut fmt::Formatter<'_>,
    child: &Filter,
    parent: Prec,
    right_side: bool,
) -> fmt::Result {
    let needs_parens = match (child.shape(), parent) {
        (FilterRef::Or(..), Prec::And) => true,
        (FilterRef::Or(..), Prec::Or) | (FilterRef::And(..), Prec::And) => right_side,
        _ => false,
    };

    if needs_parens {
        f.write_str("(")?;
        write_filter(f, child)?;
        f.write_str(")")
    } else {
        write_filter(f, child)
    }
}
