//! # stratadb
//!
//! `stratadb` is the **public facade crate** for the StrataDB storage cores.
//! It is the recommended dependency for downstream projects.
//!
//! This crate exposes:
//! - the canonical query-filter algebra (`filter`),
//! - the order-preserving key/value codec (`codec`),
//! - the bounded raw cursor (`cursor`),
//! - and the record descriptor surface (`model`, `value`) consumed by all
//!   three.
//!
//! Engine internals live in `stratadb-core`; this facade re-exports the
//! stable module surface and the opinionated `prelude`.

pub use stratadb_core::{codec, cursor, error, filter, model, store, value};

pub use stratadb_core::prelude;
