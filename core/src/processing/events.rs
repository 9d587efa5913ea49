use crate::math::narrow::{narrow_to, value_range, EventValue};
use crate::prelude::{CoreError, CoreResult, StorageWidth};
use crate::store::files::write_atomic;
use crate::telemetry::EntityLog;
use ndarray::{Array2, ArrayView1, Axis};
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_MAGIC: &[u8; 8] = b"ERDEVT01";
const CACHE_HEADER_LEN: usize = 8 + 1 + 8;

/// Raw (ToF, energy) events as a 2xN array stored in the narrowest width
/// that holds the largest value. Row 0 is x, row 1 is y.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    U8(Array2<u8>),
    U16(Array2<u16>),
    U32(Array2<u32>),
}

impl EventData {
    /// Narrows raw values to the smallest width that holds their maximum.
    pub fn from_raw(raw: &Array2<i64>) -> CoreResult<Self> {
        if raw.nrows() != 2 {
            return Err(CoreError::Consistency(format!(
                "event array needs 2 rows, found {}",
                raw.nrows()
            )));
        }
        let (min, max) = value_range(raw).unwrap_or((0, 0));
        if min < 0 {
            return Err(CoreError::Range {
                value: min,
                width: StorageWidth::U32,
            });
        }
        let width = StorageWidth::smallest_for(max as u64).ok_or(CoreError::Range {
            value: max,
            width: StorageWidth::U32,
        })?;
        Ok(match width {
            StorageWidth::U8 => EventData::U8(narrow_to(raw)?),
            StorageWidth::U16 => EventData::U16(narrow_to(raw)?),
            StorageWidth::U32 => EventData::U32(narrow_to(raw)?),
        })
    }

    pub fn width(&self) -> StorageWidth {
        match self {
            EventData::U8(_) => StorageWidth::U8,
            EventData::U16(_) => StorageWidth::U16,
            EventData::U32(_) => StorageWidth::U32,
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        match self {
            EventData::U8(data) => data.ncols(),
            EventData::U16(data) => data.ncols(),
            EventData::U32(data) => data.ncols(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event at 0-based `index`.
    pub fn point(&self, index: usize) -> Option<(u32, u32)> {
        fn get<T: EventValue>(data: &Array2<T>, index: usize) -> Option<(u32, u32)> {
            let x: u64 = (*data.get([0, index])?).into();
            let y: u64 = (*data.get([1, index])?).into();
            Some((x as u32, y as u32))
        }
        match self {
            EventData::U8(data) => get(data, index),
            EventData::U16(data) => get(data, index),
            EventData::U32(data) => get(data, index),
        }
    }

    fn to_cache_bytes(&self) -> Vec<u8> {
        fn rows<T: EventValue>(data: &Array2<T>, bytes: &mut Vec<u8>) {
            for row in data.axis_iter(Axis(0)) {
                for value in row.iter() {
                    bytes.extend(value.to_le_bytes_vec());
                }
            }
        }
        let mut bytes = Vec::with_capacity(CACHE_HEADER_LEN + self.len() * 8);
        bytes.extend_from_slice(CACHE_MAGIC);
        bytes.push(width_bytes(self.width()) as u8);
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        match self {
            EventData::U8(data) => rows(data, &mut bytes),
            EventData::U16(data) => rows(data, &mut bytes),
            EventData::U32(data) => rows(data, &mut bytes),
        }
        bytes
    }

    fn from_cache_bytes(path: &Path, bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < CACHE_HEADER_LEN || &bytes[..8] != CACHE_MAGIC {
            return Err(CoreError::parse(path, "not an event cache file"));
        }
        let width = match bytes[8] {
            1 => StorageWidth::U8,
            2 => StorageWidth::U16,
            4 => StorageWidth::U32,
            other => return Err(CoreError::parse(path, format!("bad value width {}", other))),
        };
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[9..CACHE_HEADER_LEN]);
        let count = usize::try_from(u64::from_le_bytes(count))
            .map_err(|_| CoreError::parse(path, "event count out of range"))?;
        let expected = count
            .checked_mul(2)
            .and_then(|values| values.checked_mul(width_bytes(width)))
            .ok_or_else(|| CoreError::parse(path, "event cache is truncated"))?;
        let body = &bytes[CACHE_HEADER_LEN..];
        if body.len() != expected {
            return Err(CoreError::parse(path, "event cache is truncated"));
        }

        fn decode<T: EventValue>(path: &Path, body: &[u8], count: usize) -> CoreResult<Array2<T>> {
            let values = body
                .chunks_exact(width_bytes(T::WIDTH))
                .map(T::from_le_slice)
                .collect();
            Array2::from_shape_vec((2, count), values).map_err(|err| CoreError::parse(path, err))
        }
        Ok(match width {
            StorageWidth::U8 => EventData::U8(decode(path, body, count)?),
            StorageWidth::U16 => EventData::U16(decode(path, body, count)?),
            StorageWidth::U32 => EventData::U32(decode(path, body, count)?),
        })
    }
}

fn width_bytes(width: StorageWidth) -> usize {
    match width {
        StorageWidth::U8 => 1,
        StorageWidth::U16 => 2,
        StorageWidth::U32 => 4,
    }
}

/// Borrowed x and y rows of a typed event array.
pub fn rows<T: EventValue>(data: &Array2<T>) -> (ArrayView1<'_, T>, ArrayView1<'_, T>) {
    (data.row(0), data.row(1))
}

/// Parses an `.asc` event list: whitespace separated integer columns of
/// which the first two are used. Blank lines are ignored.
pub fn parse_asc(path: &Path, text: &str) -> CoreResult<Array2<i64>> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let second = fields.next().ok_or_else(|| {
            CoreError::parse(path, format!("line {} has only one column", number + 1))
        })?;
        let parse = |field: &str| {
            field
                .parse::<i64>()
                .map_err(|err| CoreError::parse(path, format!("line {}: {}", number + 1, err)))
        };
        xs.push(parse(first)?);
        ys.push(parse(second)?);
    }
    let count = xs.len();
    xs.extend(ys);
    Array2::from_shape_vec((2, count), xs).map_err(|err| CoreError::parse(path, err))
}

pub fn read_asc(path: &Path) -> CoreResult<Array2<i64>> {
    let text = fs::read_to_string(path).map_err(|err| CoreError::io(path, err))?;
    parse_asc(path, &text)
}

pub fn cache_path(asc: &Path) -> PathBuf {
    asc.with_extension("events")
}

pub fn read_cache(path: &Path) -> CoreResult<EventData> {
    let bytes = fs::read(path).map_err(|err| CoreError::io(path, err))?;
    EventData::from_cache_bytes(path, &bytes)
}

pub fn write_cache(path: &Path, data: &EventData) -> CoreResult<()> {
    write_atomic(path, &data.to_cache_bytes())
}

fn cache_is_fresh(asc: &Path, cache: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(asc), modified(cache)) {
        (Some(source), Some(cached)) => cached >= source,
        _ => false,
    }
}

/// Loads the events of `asc`, preferring an up to date `.events` cache next
/// to it. Cache failures are logged and never fail the load.
pub fn load_events(asc: &Path, log: &EntityLog) -> CoreResult<EventData> {
    let cache = cache_path(asc);
    if cache_is_fresh(asc, &cache) {
        match read_cache(&cache) {
            Ok(data) => return Ok(data),
            Err(err) => log.warn(&format!("Ignoring event cache: {}", err)),
        }
    }

    let data = EventData::from_raw(&read_asc(asc)?)?;
    log.info(&format!(
        "Loaded {} events from {} as {}.",
        data.len(),
        asc.display(),
        data.width()
    ));
    if let Err(err) = write_cache(&cache, &data) {
        log.warn(&format!("Could not write event cache: {}", err));
    }
    Ok(data)
}
