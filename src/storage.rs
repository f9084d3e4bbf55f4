use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::mines::MinesSession;

pub type UserId = i64;

pub const STARTING_COINS: i64 = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub coins: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bonus: Option<NaiveDate>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            coins: STARTING_COINS,
            last_bonus: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct Db {
    #[serde(default)]
    users: HashMap<UserId, Account>,
    #[serde(default)]
    sessions: HashMap<UserId, MinesSession>,
}

/// Per-user atomic access to the account record and the (at most one)
/// mines session. `f` sees and mutates both as a single unit; the store
/// persists the result before it becomes observable, and a persistence
/// failure aborts the whole update.
pub trait Store: Send + Sync {
    fn update<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut Account, &mut Option<MinesSession>) -> R,
    ) -> Result<R, StoreError>;
}

fn apply<R>(
    db: &Db,
    user: UserId,
    f: impl FnOnce(&mut Account, &mut Option<MinesSession>) -> R,
) -> (R, bool, Account, Option<MinesSession>) {
    let known = db.users.contains_key(&user);
    let mut account = db.users.get(&user).cloned().unwrap_or_default();
    let mut session = db.sessions.get(&user).cloned();
    let unchanged = (account.clone(), session.clone());
    let ret = f(&mut account, &mut session);
    let dirty = !known || (account.clone(), session.clone()) != unchanged;
    (ret, dirty, account, session)
}

fn commit(db: &mut Db, user: UserId, account: Account, session: Option<MinesSession>) {
    db.users.insert(user, account);
    match session {
        Some(s) => db.sessions.insert(user, s),
        None => db.sessions.remove(&user),
    };
}

/// Flat-file JSON database, written through on every mutation.
pub struct JsonStore {
    path: PathBuf,
    db: Mutex<Db>,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let db = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Db::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            db: Mutex::new(db),
        })
    }

    fn persist(&self, db: &Db) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(db)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn update<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut Account, &mut Option<MinesSession>) -> R,
    ) -> Result<R, StoreError> {
        let mut db = self.db.lock().unwrap();
        let (ret, dirty, account, session) = apply(&db, user, f);
        if dirty {
            // mutate a scratch copy so a failed write leaves memory untouched
            let mut next = db.clone();
            commit(&mut next, user, account, session);
            self.persist(&next)?;
            *db = next;
        }
        Ok(ret)
    }
}

/// In-memory store, used by tests and available as an injectable fake.
#[derive(Default)]
pub struct MemStore {
    db: Mutex<Db>,
}

impl Store for MemStore {
    fn update<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut Account, &mut Option<MinesSession>) -> R,
    ) -> Result<R, StoreError> {
        let mut db = self.db.lock().unwrap();
        let (ret, dirty, account, session) = apply(&db, user, f);
        if dirty {
            commit(&mut db, user, account, session);
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mines::MinesSession;

    #[test]
    fn account_created_on_first_reference() {
        let store = MemStore::default();
        let coins = store.update(7, |account, _| account.coins).unwrap();
        assert_eq!(coins, STARTING_COINS);
        // and it is still there, unchanged, on the next access
        let coins = store.update(7, |account, _| account.coins).unwrap();
        assert_eq!(coins, STARTING_COINS);
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonStore::open(&path).unwrap();
        store
            .update(42, |account, session| {
                account.coins = 250;
                *session = Some(MinesSession {
                    owner: 42,
                    bet: 50,
                    mines: 3,
                    mine_positions: vec![1, 2, 3].into_iter().collect(),
                    opened: vec![10, 11],
                });
            })
            .unwrap();
        drop(store);

        let store = JsonStore::open(&path).unwrap();
        let (coins, session) = store
            .update(42, |account, session| (account.coins, session.clone()))
            .unwrap();
        assert_eq!(coins, 250);
        let session = session.unwrap();
        assert_eq!(session.bet, 50);
        assert_eq!(session.opened, vec![10, 11]);
    }

    #[test]
    fn session_removal_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonStore::open(&path).unwrap();
        store
            .update(1, |_, session| {
                *session = Some(MinesSession {
                    owner: 1,
                    bet: 10,
                    mines: 1,
                    mine_positions: vec![25].into_iter().collect(),
                    opened: vec![],
                });
            })
            .unwrap();
        store.update(1, |_, session| *session = None).unwrap();
        drop(store);

        let store = JsonStore::open(&path).unwrap();
        let session = store.update(1, |_, session| session.clone()).unwrap();
        assert!(session.is_none());
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("data");
        fs::create_dir(&sub).unwrap();

        let store = JsonStore::open(sub.join("db.json")).unwrap();
        store
            .update(3, |account, session| {
                account.coins = 800;
                *session = Some(MinesSession {
                    owner: 3,
                    bet: 80,
                    mines: 2,
                    mine_positions: vec![1, 2].into_iter().collect(),
                    opened: vec![],
                });
            })
            .unwrap();

        // knock the directory out from under the store
        fs::remove_dir_all(&sub).unwrap();
        let result = store.update(3, |account, session| {
            account.coins = 0;
            *session = None;
        });
        assert!(matches!(result, Err(StoreError::Io(_))));

        // the rejected mutation must not be observable afterwards
        let (coins, session) = store
            .update(3, |account, session| (account.coins, session.clone()))
            .unwrap();
        assert_eq!(coins, 800);
        assert_eq!(session.unwrap().bet, 80);
    }

    #[test]
    fn unchanged_update_does_not_rewrite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonStore::open(&path).unwrap();
        store.update(5, |account, _| account.coins).unwrap();
        let stamp = fs::metadata(&path).unwrap().modified().unwrap();
        store.update(5, |account, _| account.coins).unwrap();
        assert_eq!(stamp, fs::metadata(&path).unwrap().modified().unwrap());
    }
}
