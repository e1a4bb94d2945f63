use crate::store::keys;
use crate::store::operations::learning_history::HistoryEntry;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_history_indexes", m002_history_indexes),
    ]
}

/// Applies every migration newer than the persisted version.
///
/// Each migration must be idempotent: the process can stop after a migration
/// body succeeds but before its version is recorded, and it will run again on
/// the next start. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("stored version has {} bytes, expected 4", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {current} to {version}"),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rewrites the `seq:` and `user:` keys from the stored records and drops
/// index keys whose record is gone.
fn m002_history_indexes(store: &Store) -> Result<(), StoreError> {
    let mut rebuilt = 0usize;
    for item in store
        .learning_history
        .scan_prefix(keys::HISTORY_RECORD_PREFIX.as_bytes())
    {
        let (_, value) = item?;
        let entry: HistoryEntry = Store::deserialize(&value)?;
        let record_id = entry.record.id.as_bytes();
        let order_key = keys::history_order_key(entry.seq);
        let user_key = keys::history_user_index_key(&entry.record.user_id, entry.seq)?;
        store.learning_history.insert(order_key.as_bytes(), record_id)?;
        store.learning_history.insert(user_key.as_bytes(), record_id)?;
        rebuilt += 1;
    }

    let mut dangling = Vec::new();
    for prefix in [keys::HISTORY_ORDER_PREFIX, "user:"] {
        for item in store.learning_history.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            let record_id = String::from_utf8_lossy(&value);
            if store.get_history_entry(&record_id)?.is_none() {
                dangling.push(key);
            }
        }
    }
    let removed = dangling.len();
    for key in dangling {
        store.learning_history.remove(key)?;
    }

    tracing::info!(rebuilt, removed, "History indexes rebuilt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::store::operations::learning_history::{
        InteractionKind, LearningHistoryRecord, LearningHistoryRepository,
    };

    #[test]
    fn migration_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        run(&store).unwrap();
        let first = get_current_version(&store).unwrap();
        run(&store).unwrap();
        let second = get_current_version(&store).unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 2);
    }

    #[test]
    fn downgrade_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db2");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        set_version(&store, 3).unwrap();
        let err = set_version(&store, 2).unwrap_err();
        assert!(matches!(err, StoreError::Migration { .. }));
    }

    #[test]
    fn history_index_rebuild_restores_lost_keys() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db3").to_str().unwrap()).unwrap();

        let record = LearningHistoryRecord::new("a", "1", InteractionKind::ChoiceTest);
        store.create_history(&record).unwrap();
        let user_prefix = keys::history_user_prefix("a").unwrap();
        let user_keys: Vec<_> = store
            .learning_history
            .scan_prefix(user_prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()
            .unwrap();
        for key in user_keys {
            store.learning_history.remove(key).unwrap();
        }
        store.learning_history.insert("seq:99999999999999999999", "ghost").unwrap();
        assert!(store.list_history_by_user("a").unwrap().is_empty());

        m002_history_indexes(&store).unwrap();

        assert_eq!(store.list_history_by_user("a").unwrap(), vec![record]);
        assert_eq!(store.list_history().unwrap().len(), 1);
    }
}
