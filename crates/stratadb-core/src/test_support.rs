//! Shared fixtures: a small static record graph and an in-memory store
//! double for cursor and support tests.

use crate::{
    codec::CodecError,
    model::{Direction, KeyPart, PropertyKind, PropertyModel, RecordModel},
    store::{CursorOps, FetchError, RawSupport},
    value::Value,
};
use std::collections::BTreeMap;

pub(crate) const fn prop(name: &'static str, kind: PropertyKind) -> PropertyModel {
    PropertyModel { name, kind, nullable: false, derived: false }
}

pub(crate) const fn nullable_prop(name: &'static str, kind: PropertyKind) -> PropertyModel {
    PropertyModel { name, kind, nullable: true, derived: false }
}

pub(crate) const fn join_prop(
    name: &'static str,
    target: &'static RecordModel,
    to_many: bool,
) -> PropertyModel {
    PropertyModel {
        name,
        kind: PropertyKind::Join { target, to_many },
        nullable: false,
        derived: false,
    }
}

const fn key(property: &'static str, direction: Direction) -> KeyPart {
    KeyPart { property, direction }
}

///
/// Fixture record graph
///
/// Label 1─* Album 1─* Track, with many-to-one back joins.
///

pub(crate) static LABEL: RecordModel = RecordModel {
    name: "Label",
    properties: &[
        prop("label_id", PropertyKind::U64),
        prop("name", PropertyKind::Text),
        prop("city", PropertyKind::Text),
        join_prop("albums", &ALBUM, true),
    ],
    primary_key: &[key("label_id", Direction::Ascending)],
};

pub(crate) static ALBUM: RecordModel = RecordModel {
    name: "Album",
    properties: &[
        prop("album_id", PropertyKind::U64),
        prop("title", PropertyKind::Text),
        prop("year", PropertyKind::I32),
        nullable_prop("rating", PropertyKind::F64),
        join_prop("label", &LABEL, false),
        join_prop("tracks", &TRACK, true),
    ],
    primary_key: &[key("album_id", Direction::Ascending)],
};

pub(crate) static TRACK: RecordModel = RecordModel {
    name: "Track",
    properties: &[
        prop("track_id", PropertyKind::U64),
        prop("title", PropertyKind::Text),
        prop("seconds", PropertyKind::I32),
        nullable_prop("rating", PropertyKind::I32),
        join_prop("album", &ALBUM, false),
    ],
    primary_key: &[key("track_id", Direction::Ascending)],
};

///
/// Sample
///
/// Codec fixture: a composite key with a descending column and a data
/// payload exercising every primitive family.
///

pub(crate) static SAMPLE: RecordModel = RecordModel {
    name: "Sample",
    properties: &[
        prop("device", PropertyKind::U32),
        prop("offset", PropertyKind::I64),
        prop("factor", PropertyKind::F64),
        nullable_prop("flag", PropertyKind::Bool),
        nullable_prop("note", PropertyKind::Text),
        prop("payload", PropertyKind::Blob),
        prop("tag", PropertyKind::Char),
        prop("attachment", PropertyKind::Lob),
    ],
    primary_key: &[key("device", Direction::Ascending), key("offset", Direction::Descending)],
};

///
/// MemoryCursor
///
/// CursorOps double over a sorted snapshot, with fetch-failure injection
/// and hint accounting.
///

pub(crate) struct MemoryCursor {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
    materialize: bool,
    pub(crate) fail_moves_after: Option<usize>,
    pub(crate) fail_key_fetch_while_disabled: bool,
    moves: usize,
}

impl MemoryCursor {
    pub(crate) fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        let mut entries = entries;
        entries.sort();
        Self {
            entries,
            pos: None,
            materialize: true,
            fail_moves_after: None,
            fail_key_fetch_while_disabled: false,
            moves: 0,
        }
    }

    pub(crate) fn from_keys(keys: &[&str]) -> Self {
        Self::new(
            keys.iter()
                .map(|k| (k.as_bytes().to_vec(), format!("value-{k}").into_bytes()))
                .collect(),
        )
    }

    fn count_move(&mut self) -> Result<(), FetchError> {
        self.moves += 1;
        match self.fail_moves_after {
            Some(limit) if self.moves > limit => Err(FetchError::new("injected move failure")),
            _ => Ok(()),
        }
    }
}

impl CursorOps for MemoryCursor {
    type Record = (Vec<u8>, Vec<u8>);

    fn to_first(&mut self) -> Result<bool, FetchError> {
        self.count_move()?;
        self.pos = if self.entries.is_empty() { None } else { Some(0) };
        Ok(self.pos.is_some())
    }

    fn to_first_at(&mut self, key: &[u8]) -> Result<bool, FetchError> {
        self.count_move()?;
        let index = self.entries.partition_point(|(k, _)| k.as_slice() < key);
        self.pos = (index < self.entries.len()).then_some(index);
        Ok(self.pos.is_some())
    }

    fn to_last(&mut self) -> Result<bool, FetchError> {
        self.count_move()?;
        self.pos = self.entries.len().checked_sub(1);
        Ok(self.pos.is_some())
    }

    fn to_last_at(&mut self, key: &[u8]) -> Result<bool, FetchError> {
        self.count_move()?;
        let index = self.entries.partition_point(|(k, _)| k.as_slice() <= key);
        self.pos = index.checked_sub(1);
        Ok(self.pos.is_some())
    }

    fn to_next(&mut self) -> Result<bool, FetchError> {
        self.count_move()?;
        match self.pos {
            Some(index) if index + 1 < self.entries.len() => {
                self.pos = Some(index + 1);
                Ok(true)
            }
            _ => {
                self.pos = None;
                Ok(false)
            }
        }
    }

    fn to_previous(&mut self) -> Result<bool, FetchError> {
        self.count_move()?;
        self.pos = self.pos.and_then(|index| index.checked_sub(1));
        Ok(self.pos.is_some())
    }

    fn current_key(&self) -> Result<Vec<u8>, FetchError> {
        if !self.materialize && self.fail_key_fetch_while_disabled {
            return Err(FetchError::new("key fetch while materialization is disabled"));
        }
        let index = self.pos.ok_or_else(|| FetchError::new("no current position"))?;
        Ok(self.entries[index].0.clone())
    }

    fn current_value(&self) -> Result<Vec<u8>, FetchError> {
        let index = self.pos.ok_or_else(|| FetchError::new("no current position"))?;
        Ok(self.entries[index].1.clone())
    }

    fn instantiate_current(&self) -> Result<Self::Record, FetchError> {
        let index = self.pos.ok_or_else(|| FetchError::new("no current position"))?;
        Ok(self.entries[index].clone())
    }

    fn disable_key_and_value(&mut self) {
        self.materialize = false;
    }

    fn enable_key_and_value(&mut self) {
        self.materialize = true;
    }
}

///
/// MemoryStore
///
/// RawSupport double over a BTreeMap, decoding evolved rows through
/// per-generation layouts.
///

pub(crate) struct MemoryStore {
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
    layouts: std::collections::HashMap<u32, crate::codec::RowLayout>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self { rows: BTreeMap::new(), layouts: std::collections::HashMap::new() }
    }

    pub(crate) fn with_layout(mut self, generation: u32, layout: crate::codec::RowLayout) -> Self {
        self.layouts.insert(generation, layout);
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

impl RawSupport for MemoryStore {
    type Record = Vec<Value>;

    fn try_load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, FetchError> {
        Ok(self.rows.get(key).cloned())
    }

    fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool, FetchError> {
        if self.rows.contains_key(key) {
            return Ok(false);
        }
        self.rows.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<(), FetchError> {
        self.rows.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn try_delete(&mut self, key: &[u8]) -> Result<bool, FetchError> {
        Ok(self.rows.remove(key).is_some())
    }

    fn decode(
        &self,
        dest: &mut Self::Record,
        generation: u32,
        data: &[u8],
    ) -> Result<(), CodecError> {
        let layout = self.layouts.get(&generation).ok_or_else(|| {
            CodecError::corrupt(format!("no layout for generation {generation}"))
        })?;
        *dest = layout.decode(data)?;
        Ok(())
    }
}
