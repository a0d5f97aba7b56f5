//! Bounded scan over a sorted key/value space.
//!
//! `RawCursor` drives a `CursorOps` capability through the state machine
//! `Uninitialized → TryNext ↔ HasNext → Closed`. Bounds are byte keys with
//! per-side inclusivity; the shared start/end prefix is cached and checked
//! after every move. Any fetch failure closes the cursor and surfaces.

#[cfg(test)]
mod tests;

use crate::store::{CursorOps, FetchError};
use thiserror::Error as ThisError;

///
/// CursorError
///

#[derive(Debug, ThisError)]
pub enum CursorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("scan bound must be inclusive when absent")]
    ExclusiveUnbounded,

    #[error("cursor has no current record")]
    NoCurrent,
}

///
/// ScanBounds
///
/// Key-space window of one scan: optional start/end byte keys with
/// per-side inclusivity, scan direction, and the cap on the cached common
/// prefix. An absent bound must be inclusive.
///

#[derive(Clone, Debug, Default)]
pub struct ScanBounds {
    start: Option<Vec<u8>>,
    exclusive_start: bool,
    end: Option<Vec<u8>>,
    exclusive_end: bool,
    reverse: bool,
    max_prefix: Option<usize>,
}

impl ScanBounds {
    /// Unbounded forward scan.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_start(mut self, key: impl Into<Vec<u8>>, inclusive: bool) -> Self {
        self.start = Some(key.into());
        self.exclusive_start = !inclusive;
        self
    }

    #[must_use]
    pub fn with_end(mut self, key: impl Into<Vec<u8>>, inclusive: bool) -> Self {
        self.end = Some(key.into());
        self.exclusive_end = !inclusive;
        self
    }

    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    #[must_use]
    pub const fn with_max_prefix(mut self, max_prefix: usize) -> Self {
        self.max_prefix = Some(max_prefix);
        self
    }

    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        self.reverse
    }

    fn validate(&self) -> Result<(), CursorError> {
        if (self.start.is_none() && self.exclusive_start)
            || (self.end.is_none() && self.exclusive_end)
        {
            return Err(CursorError::ExclusiveUnbounded);
        }
        Ok(())
    }

    // Longest shared byte prefix of the two bounds, capped by max_prefix.
    fn common_prefix(&self) -> Vec<u8> {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return Vec::new();
        };

        let shared = start
            .iter()
            .zip(end.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let capped = self.max_prefix.map_or(shared, |cap| shared.min(cap));
        start[..capped].to_vec()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Uninitialized,
    TryNext,
    HasNext,
    Closed,
}

///
/// RawCursor
///
/// Single-threaded from the caller's perspective; callers serialize access
/// externally. The cursor schedules nothing and holds no locks itself.
///

pub struct RawCursor<O: CursorOps> {
    ops: O,
    bounds: ScanBounds,
    prefix: Vec<u8>,
    state: State,
}

impl<O: CursorOps> RawCursor<O> {
    pub fn new(ops: O, bounds: ScanBounds) -> Result<Self, CursorError> {
        bounds.validate()?;
        let prefix = bounds.common_prefix();
        Ok(Self { ops, bounds, prefix, state: State::Uninitialized })
    }

    /// Position on the next in-bounds record, reporting whether one exists.
    /// Reaching either end closes the cursor.
    pub fn has_next(&mut self) -> Result<bool, CursorError> {
        loop {
            match self.state {
                State::HasNext => return Ok(true),
                State::Closed => return Ok(false),
                State::Uninitialized => {
                    let found = self.checked(Self::to_bounded_edge)?;
                    if found && self.checked(Self::within_bounds)? {
                        self.state = State::HasNext;
                    } else {
                        self.close();
                        return Ok(false);
                    }
                }
                State::TryNext => {
                    let found = self.checked(Self::step)?;
                    if found && self.checked(Self::within_bounds)? {
                        self.state = State::HasNext;
                    } else {
                        self.close();
                        return Ok(false);
                    }
                }
            }
        }
    }

    /// Materialize the current record and fall back to `TryNext`.
    pub fn next(&mut self) -> Result<O::Record, CursorError> {
        if !self.has_next()? {
            return Err(CursorError::NoCurrent);
        }
        let record = self.checked(|cursor| cursor.ops.instantiate_current())?;
        self.state = State::TryNext;
        Ok(record)
    }

    /// Key of the current record.
    pub fn current_key(&mut self) -> Result<Vec<u8>, CursorError> {
        if self.state != State::HasNext {
            return Err(CursorError::NoCurrent);
        }
        self.checked(|cursor| cursor.ops.current_key())
    }

    /// Value of the current record.
    pub fn current_value(&mut self) -> Result<Vec<u8>, CursorError> {
        if self.state != State::HasNext {
            return Err(CursorError::NoCurrent);
        }
        self.checked(|cursor| cursor.ops.current_value())
    }

    /// Skip up to `count` records, reporting how many were skipped. When no
    /// terminal bound or prefix needs checking, key/value materialization
    /// is hinted off for the duration.
    pub fn skip(&mut self, count: usize) -> Result<usize, CursorError> {
        if count == 0 || self.state == State::Closed {
            return Ok(0);
        }

        let unchecked = self.skip_is_unchecked();
        if unchecked {
            self.ops.disable_key_and_value();
        }

        let mut skipped = 0;
        while skipped < count {
            match self.has_next() {
                Ok(true) => {
                    self.state = State::TryNext;
                    skipped += 1;
                }
                Ok(false) => break,
                Err(err) => {
                    if unchecked {
                        self.ops.enable_key_and_value();
                    }
                    return Err(err);
                }
            }
        }

        if unchecked {
            self.ops.enable_key_and_value();
        }
        Ok(skipped)
    }

    /// Materialize up to `count` records.
    pub fn fetch_next(&mut self, count: usize) -> Result<Vec<O::Record>, CursorError> {
        let mut out = Vec::new();
        while out.len() < count && self.has_next()? {
            out.push(self.next()?);
        }
        Ok(out)
    }

    /// Idempotent; safe to call from any state.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    // Run one fetch step; any failure closes the cursor before surfacing.
    fn checked<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, FetchError>,
    ) -> Result<T, CursorError> {
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.close();
                Err(err.into())
            }
        }
    }

    // First positioning: seek to the scan's leading bound, then step past
    // any key equal to an exclusive bound.
    fn to_bounded_edge(&mut self) -> Result<bool, FetchError> {
        if self.bounds.reverse {
            let mut found = match &self.bounds.end {
                Some(end) => self.ops.to_last_at(end),
                None => self.ops.to_last(),
            }?;
            if self.bounds.exclusive_end {
                while found && self.at_bound(self.bounds.end.as_deref())? {
                    found = self.ops.to_previous()?;
                }
            }
            Ok(found)
        } else {
            let mut found = match &self.bounds.start {
                Some(start) => self.ops.to_first_at(start),
                None => self.ops.to_first(),
            }?;
            if self.bounds.exclusive_start {
                while found && self.at_bound(self.bounds.start.as_deref())? {
                    found = self.ops.to_next()?;
                }
            }
            Ok(found)
        }
    }

    fn at_bound(&self, bound: Option<&[u8]>) -> Result<bool, FetchError> {
        let Some(bound) = bound else {
            return Ok(false);
        };
        Ok(self.ops.current_key()? == bound)
    }

    fn step(&mut self) -> Result<bool, FetchError> {
        if self.bounds.reverse { self.ops.to_previous() } else { self.ops.to_next() }
    }

    // Cheap post-move check: shared prefix first, then the terminal bound.
    fn within_bounds(&mut self) -> Result<bool, FetchError> {
        if self.prefix.is_empty() && self.terminal_bound().is_none() {
            return Ok(true);
        }

        let key = self.ops.current_key()?;
        if !self.prefix.is_empty() && !key.starts_with(&self.prefix) {
            return Ok(false);
        }

        let Some((bound, exclusive)) = self.terminal_bound() else {
            return Ok(true);
        };

        let ordering = key.as_slice().cmp(bound);
        let past = if self.bounds.reverse {
            ordering.is_lt() || (exclusive && ordering.is_eq())
        } else {
            ordering.is_gt() || (exclusive && ordering.is_eq())
        };
        Ok(!past)
    }

    fn terminal_bound(&self) -> Option<(&[u8], bool)> {
        if self.bounds.reverse {
            self.bounds.start.as_deref().map(|b| (b, self.bounds.exclusive_start))
        } else {
            self.bounds.end.as_deref().map(|b| (b, self.bounds.exclusive_end))
        }
    }

    fn skip_is_unchecked(&self) -> bool {
        self.prefix.is_empty() && self.terminal_bound().is_none()
    }
}
