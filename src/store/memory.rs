//! In-process store behind a single mutex.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::access::Permissions;
use crate::store::{Message, PermissionStore, Space, SpaceStore, StoreError, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, String>,
    spaces: BTreeMap<u64, Space>,
    messages: BTreeMap<u64, Message>,
    grants: HashMap<(u64, String), Permissions>,
    space_seq: u64,
    message_seq: u64,
}

/// Inverse of a write, replayed when a transaction rolls back.
#[derive(Debug)]
enum Undo {
    InsertSpace(u64),
    InsertMessage(u64),
    PutGrant((u64, String), Option<Permissions>),
}

/// A set of writes that commit together or not at all.
///
/// Writes apply to the tables immediately while the store lock is held;
/// on failure they are undone in reverse order before the lock is
/// released, so no other caller ever observes a partial transaction.
/// Sequence values are not reused after a rollback.
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    undo: Vec<Undo>,
}

impl Transaction<'_> {
    /// Insert a space and return its freshly allocated id.
    pub fn insert_space(&mut self, name: &str, owner: &str) -> Result<u64, StoreError> {
        self.tables.space_seq += 1;
        let id = self.tables.space_seq;
        if self.tables.spaces.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("space {id}")));
        }
        self.tables.spaces.insert(
            id,
            Space {
                id,
                name: name.to_string(),
                owner: owner.to_string(),
            },
        );
        self.undo.push(Undo::InsertSpace(id));
        Ok(id)
    }

    /// Insert a grant that must not already exist.
    pub fn insert_grant(&mut self, space_id: u64, user_id: &str, perms: Permissions) -> Result<(), StoreError> {
        let key = (space_id, user_id.to_string());
        if self.tables.grants.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("grant for {user_id} on space {space_id}")));
        }
        self.put_grant(space_id, user_id, perms)
    }

    /// Create or replace a grant.
    pub fn put_grant(&mut self, space_id: u64, user_id: &str, perms: Permissions) -> Result<(), StoreError> {
        let key = (space_id, user_id.to_string());
        let previous = self.tables.grants.insert(key.clone(), perms);
        self.undo.push(Undo::PutGrant(key, previous));
        Ok(())
    }

    pub fn insert_message(
        &mut self,
        space_id: u64,
        author: &str,
        time: DateTime<Utc>,
        text: &str,
    ) -> Result<Message, StoreError> {
        if !self.tables.spaces.contains_key(&space_id) {
            return Err(StoreError::NotFound);
        }
        self.tables.message_seq += 1;
        let message = Message {
            space_id,
            id: self.tables.message_seq,
            author: author.to_string(),
            time,
            text: text.to_string(),
        };
        self.tables.messages.insert(message.id, message.clone());
        self.undo.push(Undo::InsertMessage(message.id));
        Ok(message)
    }

    fn rollback(self) {
        for undo in self.undo.into_iter().rev() {
            match undo {
                Undo::InsertSpace(id) => {
                    self.tables.spaces.remove(&id);
                }
                Undo::InsertMessage(id) => {
                    self.tables.messages.remove(&id);
                }
                Undo::PutGrant(key, Some(previous)) => {
                    self.tables.grants.insert(key, previous);
                }
                Undo::PutGrant(key, None) => {
                    self.tables.grants.remove(&key);
                }
            }
        }
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `body` as one atomic unit.
    pub fn with_transaction<T, F>(&self, body: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut tables = self.lock()?;
        let mut tx = Transaction {
            tables: &mut *tables,
            undo: Vec::new(),
        };
        match body(&mut tx) {
            Ok(value) => Ok(value),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Number of messages across all spaces.
    pub fn message_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.messages.len())
    }
}

impl SpaceStore for MemoryStore {
    fn create_space(&self, name: &str, owner: &str) -> Result<Space, StoreError> {
        self.with_transaction(|tx| {
            let id = tx.insert_space(name, owner)?;
            tx.insert_grant(id, owner, Permissions::ALL)?;
            Ok(Space {
                id,
                name: name.to_string(),
                owner: owner.to_string(),
            })
        })
    }

    fn space(&self, space_id: u64) -> Result<Option<Space>, StoreError> {
        Ok(self.lock()?.spaces.get(&space_id).cloned())
    }

    fn insert_message(
        &self,
        space_id: u64,
        author: &str,
        time: DateTime<Utc>,
        text: &str,
    ) -> Result<Message, StoreError> {
        self.with_transaction(|tx| tx.insert_message(space_id, author, time, text))
    }

    fn messages_since(&self, space_id: u64, since: DateTime<Utc>) -> Result<Vec<Message>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .messages
            .values()
            .filter(|m| m.space_id == space_id && m.time >= since)
            .cloned()
            .collect())
    }

    fn message(&self, space_id: u64, msg_id: u64) -> Result<Message, StoreError> {
        let tables = self.lock()?;
        tables
            .messages
            .get(&msg_id)
            .filter(|m| m.space_id == space_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete_message(&self, space_id: u64, msg_id: u64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tables.messages.get(&msg_id) {
            Some(m) if m.space_id == space_id => {
                tables.messages.remove(&msg_id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

impl PermissionStore for MemoryStore {
    fn get_grant(&self, space_id: u64, user_id: &str) -> Result<Option<Permissions>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.grants.get(&(space_id, user_id.to_string())).copied())
    }

    fn put_grant(&self, space_id: u64, user_id: &str, perms: Permissions) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            if !tx.tables.spaces.contains_key(&space_id) {
                return Err(StoreError::NotFound);
            }
            tx.put_grant(space_id, user_id, perms)
        })
    }
}

impl UserStore for MemoryStore {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.users.contains_key(username) {
            return Err(StoreError::Duplicate(format!("user {username}")));
        }
        tables.users.insert(username.to_string(), password_hash.to_string());
        Ok(())
    }

    fn password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.users.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(s: &str) -> Permissions {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_space_grants_owner_everything() {
        let store = MemoryStore::new();
        let space = store.create_space("acme", "alice").unwrap();
        assert_eq!(space.id, 1);
        assert_eq!(store.get_grant(1, "alice").unwrap(), Some(Permissions::ALL));
        assert_eq!(store.get_grant(1, "bob").unwrap(), None);
    }

    #[test]
    fn test_failure_between_inserts_leaves_nothing() {
        let store = MemoryStore::new();
        let result: Result<(), _> = store.with_transaction(|tx| {
            let id = tx.insert_space("acme", "alice")?;
            assert_eq!(id, 1);
            Err(StoreError::Aborted("simulated crash before grant insert".into()))
        });

        assert!(matches!(result, Err(StoreError::Aborted(_))));
        assert_eq!(store.space(1).unwrap(), None);
        assert_eq!(store.get_grant(1, "alice").unwrap(), None);
    }

    #[test]
    fn test_rollback_restores_overwritten_grant() {
        let store = MemoryStore::new();
        store.create_space("acme", "alice").unwrap();
        store.put_grant(1, "bob", perms("r")).unwrap();

        let _ = store.with_transaction(|tx| {
            tx.put_grant(1, "bob", perms("rwd"))?;
            Err::<(), _>(StoreError::Aborted("nope".into()))
        });
        assert_eq!(store.get_grant(1, "bob").unwrap(), Some(perms("r")));
    }

    #[test]
    fn test_put_grant_replaces_full_mask() {
        let store = MemoryStore::new();
        store.create_space("acme", "alice").unwrap();
        store.put_grant(1, "bob", perms("rw")).unwrap();
        store.put_grant(1, "bob", perms("d")).unwrap();
        assert_eq!(store.get_grant(1, "bob").unwrap(), Some(perms("d")));
    }

    #[test]
    fn test_put_grant_requires_space() {
        let store = MemoryStore::new();
        assert!(matches!(store.put_grant(9, "bob", perms("r")), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_duplicate_owner_grant_fails_whole_unit() {
        let store = MemoryStore::new();
        let result = store.with_transaction(|tx| {
            let id = tx.insert_space("acme", "alice")?;
            tx.insert_grant(id, "alice", Permissions::ALL)?;
            tx.insert_grant(id, "alice", Permissions::ALL)
        });
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(store.space(1).unwrap(), None);
        assert_eq!(store.get_grant(1, "alice").unwrap(), None);
    }

    #[test]
    fn test_messages_scoped_to_space() {
        let store = MemoryStore::new();
        store.create_space("a", "alice").unwrap();
        store.create_space("b", "alice").unwrap();
        let now = Utc::now();
        let m = store.insert_message(1, "alice", now, "hello").unwrap();

        assert_eq!(store.message(1, m.id).unwrap().text, "hello");
        assert!(matches!(store.message(2, m.id), Err(StoreError::NotFound)));
        assert!(matches!(store.delete_message(2, m.id), Err(StoreError::NotFound)));
        assert_eq!(store.messages_since(1, now).unwrap().len(), 1);
        assert!(store.messages_since(1, now + chrono::TimeDelta::seconds(1)).unwrap().is_empty());

        store.delete_message(1, m.id).unwrap();
        assert_eq!(store.message_count().unwrap(), 0);
    }

    #[test]
    fn test_message_needs_existing_space() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert_message(3, "alice", Utc::now(), "hi"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_usernames_are_unique() {
        let store = MemoryStore::new();
        store.create_user("alice", "hash-1").unwrap();
        assert!(matches!(store.create_user("alice", "hash-2"), Err(StoreError::Duplicate(_))));
        assert_eq!(store.password_hash("alice").unwrap().as_deref(), Some("hash-1"));
        assert_eq!(store.password_hash("carol").unwrap(), None);
    }
}
