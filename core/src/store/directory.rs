use crate::prelude::{CoreError, CoreResult};
use crate::store::entity_id::{EntityId, EntityKind};
use crate::telemetry::{Counts, EntityLog, OperationCounters};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// First serial handed out under a fresh parent.
pub const FIRST_SERIAL: u32 = 1;

/// Per-parent running serial number. Serials only ever increase, so a
/// number is never handed out twice even after its entity is removed.
#[derive(Debug)]
pub struct SerialCounter {
    next: Mutex<u32>,
}

impl SerialCounter {
    pub fn new() -> Self {
        Self::starting_at(FIRST_SERIAL)
    }

    pub fn starting_at(next: u32) -> Self {
        Self {
            next: Mutex::new(next),
        }
    }

    pub fn peek(&self) -> u32 {
        self.next.lock().map(|next| *next).unwrap_or(FIRST_SERIAL)
    }

    /// Runs `create` with the current serial while holding the counter lock
    /// and increments the counter only when `create` succeeds.
    pub fn allocate_with<R>(&self, create: impl FnOnce(u32) -> CoreResult<R>) -> CoreResult<(u32, R)> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| CoreError::Consistency("serial counter lock poisoned".into()))?;
        let serial = *next;
        let created = create(serial)?;
        *next += 1;
        Ok((serial, created))
    }

    /// Moves the counter past `highest` without ever lowering it.
    pub fn observe(&self, highest: u32) {
        if let Ok(mut next) = self.next.lock() {
            *next = (*next).max(highest.saturating_add(1));
        }
    }
}

impl Default for SerialCounter {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CoreError::Consistency(format!(
            "'{}' is not a valid entity name",
            name
        )));
    }
    Ok(())
}

/// Allocates the next serial under `counter` and creates the entity
/// directory `<parent>/<Prefix><NN>-<name>`.
pub fn allocate(
    parent: &Path,
    counter: &SerialCounter,
    kind: EntityKind,
    name: &str,
) -> CoreResult<(EntityId, PathBuf)> {
    validate_name(name)?;
    let (serial, path) = counter.allocate_with(|serial| {
        let path = parent.join(EntityId::new(kind, serial).dir_name(name));
        fs::create_dir_all(&path).map_err(|err| CoreError::io(&path, err))?;
        Ok(path)
    })?;
    EntityLog::request().info(&format!("Created a directory {}.", path.display()));
    Ok((EntityId::new(kind, serial), path))
}

/// Child directory found by [`scan`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedEntry {
    pub id: EntityId,
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of scanning a parent directory.
#[derive(Debug, Clone)]
pub struct Scan {
    pub entries: Vec<ScannedEntry>,
    pub counts: Counts,
}

/// Enumerates the `kind` child directories of `parent` ordered by serial.
///
/// Names whose serial field does not parse are logged and skipped. When at
/// least one child parses, `counter` is moved past the highest serial found.
pub fn scan(parent: &Path, kind: EntityKind, counter: &SerialCounter) -> CoreResult<Scan> {
    let log = EntityLog::request();
    let counters = OperationCounters::new();

    let mut names = Vec::new();
    for entry in fs::read_dir(parent).map_err(|err| CoreError::io(parent, err))? {
        let entry = entry.map_err(|err| CoreError::io(parent, err))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(kind.prefix()) {
            names.push(name);
        }
    }
    names.sort();

    let mut entries = Vec::new();
    for dir_name in names {
        match EntityId::parse(kind, &dir_name) {
            Ok((id, name)) => {
                counters.record_processed();
                entries.push(ScannedEntry {
                    id,
                    name,
                    path: parent.join(&dir_name),
                });
            }
            Err(err) => {
                counters.record_skipped();
                log.warn(&format!("Skipping directory {}: {}", dir_name, err));
            }
        }
    }

    entries.sort_by_key(|entry| entry.id.serial);
    if let Some(highest) = entries.iter().map(|entry| entry.id.serial).max() {
        counter.observe(highest);
    }

    Ok(Scan {
        entries,
        counts: counters.snapshot(),
    })
}

/// Renames an entity directory so that it carries `new_name`, keeping its serial.
pub fn rename_directory(current: &Path, id: EntityId, new_name: &str) -> CoreResult<PathBuf> {
    validate_name(new_name)?;
    let parent = current.parent().unwrap_or_else(|| Path::new(""));
    let target = parent.join(id.dir_name(new_name));
    if target == current {
        return Ok(target);
    }
    if target.exists() {
        return Err(CoreError::Io {
            path: target.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ),
        });
    }
    fs::rename(current, &target).map_err(|err| CoreError::io(current, err))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn allocation_is_strictly_increasing_across_removals() {
        let dir = TempDir::new().unwrap();
        let counter = SerialCounter::new();
        let (first, first_path) = allocate(dir.path(), &counter, EntityKind::Sample, "a").unwrap();
        fs::remove_dir_all(&first_path).unwrap();
        let (second, _) = allocate(dir.path(), &counter, EntityKind::Sample, "b").unwrap();
        let (third, third_path) = allocate(dir.path(), &counter, EntityKind::Sample, "c").unwrap();
        assert_eq!((first.serial, second.serial, third.serial), (1, 2, 3));
        assert!(third_path.ends_with("Sample_03-c"));
    }

    #[test]
    fn scan_skips_garbage_and_advances_counter() {
        let dir = TempDir::new().unwrap();
        for name in ["Sample_03-b", "Sample_01-a", "Sample_xx-bad", "garbage"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let counter = SerialCounter::new();
        let scan = scan(dir.path(), EntityKind::Sample, &counter).unwrap();
        let names: Vec<&str> = scan.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(scan.counts.skipped, 1);
        assert_eq!(counter.peek(), 4);
    }

    #[test]
    fn empty_scan_leaves_counter_alone() {
        let dir = TempDir::new().unwrap();
        let counter = SerialCounter::new();
        scan(dir.path(), EntityKind::Measurement, &counter).unwrap();
        assert_eq!(counter.peek(), FIRST_SERIAL);
    }

    #[test]
    fn scan_never_lowers_the_counter() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Sample_02-a")).unwrap();
        let counter = SerialCounter::starting_at(9);
        scan(dir.path(), EntityKind::Sample, &counter).unwrap();
        assert_eq!(counter.peek(), 9);
    }

    #[test]
    fn failed_creation_does_not_consume_a_serial() {
        let dir = TempDir::new().unwrap();
        let counter = SerialCounter::new();
        assert!(allocate(dir.path(), &counter, EntityKind::Sample, "a/b").is_err());
        assert_eq!(counter.peek(), FIRST_SERIAL);
    }

    #[test]
    fn rename_keeps_serial() {
        let dir = TempDir::new().unwrap();
        let counter = SerialCounter::new();
        let (id, path) = allocate(dir.path(), &counter, EntityKind::Measurement, "old").unwrap();
        let renamed = rename_directory(&path, id, "new").unwrap();
        assert!(renamed.ends_with("Measurement_01-new"));
        assert!(renamed.is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_allocation_hands_out_each_serial_once() {
        const THREADS: u32 = 16;
        let dir = TempDir::new().unwrap();
        let counter = SerialCounter::new();
        let mut serials: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|worker| {
                    let counter = &counter;
                    let parent = dir.path();
                    scope.spawn(move || {
                        allocate(parent, counter, EntityKind::Sample, &format!("w{}", worker))
                            .unwrap()
                            .0
                            .serial
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        serials.sort_unstable();
        assert_eq!(serials, (1..=THREADS).collect::<Vec<_>>());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), THREADS as usize);
        assert_eq!(counter.peek(), THREADS + 1);
    }

    #[test]
    fn scan_orders_three_digit_serials_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["Sample_100-c", "Sample_11-b", "Sample_02-a"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let counter = SerialCounter::new();
        let scan = scan(dir.path(), EntityKind::Sample, &counter).unwrap();
        let serials: Vec<u32> = scan.entries.iter().map(|e| e.id.serial).collect();
        assert_eq!(serials, vec![2, 11, 100]);
        assert_eq!(scan.entries[2].name, "c");
        assert_eq!(counter.peek(), 101);
    }
}
