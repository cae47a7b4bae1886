use crate::surface::RenderSurface;
use seatile_core::SeatileError;
use seatile_geo::GeoBounds;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(level: u8, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.level, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = SeatileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SeatileError::invalid_input(format!("invalid tile key {value:?}"));
        let mut parts = value.split('_');
        let (Some(level), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self {
            level: level.parse().map_err(|_| invalid())?,
            x: x.parse().map_err(|_| invalid())?,
            y: y.parse().map_err(|_| invalid())?,
        })
    }
}

/// Identity of one cache insertion. A key that is evicted and loaded again
/// gets a new id, so completions for the old insertion can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct TileRecord<H> {
    pub key: TileKey,
    pub id: RecordId,
    pub bounds: GeoBounds,
    pub last_access: Instant,
    handle: H,
}

impl<H> TileRecord<H> {
    pub fn level(&self) -> u8 {
        self.key.level
    }

    pub fn tile_x(&self) -> u32 {
        self.key.x
    }

    pub fn tile_y(&self) -> u32 {
        self.key.y
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// Displayed tiles, at most one record per key. The cache owns every
/// renderable handle and gives it back to the surface only on removal.
#[derive(Debug)]
pub struct TileCache<H> {
    records: HashMap<TileKey, TileRecord<H>>,
    next_id: u64,
}

impl<H> Default for TileCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TileCache<H> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, key: &TileKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileRecord<H>> {
        self.records.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TileKey> {
        self.records.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &TileRecord<H>> {
        self.records.values()
    }

    /// Stores a new record. An occupied key hands the handle back untouched
    /// so the caller can release it.
    pub fn insert(
        &mut self,
        key: TileKey,
        handle: H,
        bounds: GeoBounds,
        now: Instant,
    ) -> Result<RecordId, H> {
        if self.records.contains_key(&key) {
            return Err(handle);
        }
        self.next_id = self.next_id.wrapping_add(1);
        let id = RecordId(self.next_id);
        self.records.insert(
            key,
            TileRecord {
                key,
                id,
                bounds,
                last_access: now,
                handle,
            },
        );
        Ok(id)
    }

    pub fn touch(&mut self, key: &TileKey, now: Instant) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.last_access = now;
                true
            }
            None => false,
        }
    }

    /// Drops every record not on `current_level` or idle longer than
    /// `max_age`, releasing its renderable. Returns the number removed.
    pub fn evict<S>(
        &mut self,
        surface: &mut S,
        current_level: u8,
        max_age: Duration,
        now: Instant,
    ) -> usize
    where
        S: RenderSurface<Handle = H>,
    {
        let stale: Vec<TileKey> = self
            .records
            .values()
            .filter(|record| {
                record.level() != current_level
                    || now.saturating_duration_since(record.last_access) > max_age
            })
            .map(|record| record.key)
            .collect();
        for key in stale.iter() {
            if let Some(record) = self.records.remove(key) {
                surface.remove(record.handle);
            }
        }
        stale.len()
    }

    pub fn clear_all<S>(&mut self, surface: &mut S) -> usize
    where
        S: RenderSurface<Handle = H>,
    {
        let count = self.records.len();
        for (_, record) in self.records.drain() {
            surface.remove(record.handle);
        }
        count
    }
}
