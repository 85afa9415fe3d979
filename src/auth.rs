//! Placeholder login gate. One fixed credential pair; the logged-in user is
//! remembered in the store so it survives a restart.

use crate::model::UserRecord;
use crate::store::KvStore;

pub const USER_KEY: &str = "user";
pub const USERS_KEY: &str = "users";

const USERNAME: &str = "teacher1";
const PASSWORD: &str = "qweqwe";

pub struct AuthGate<'a> {
    store: &'a KvStore,
}

impl<'a> AuthGate<'a> {
    pub fn new(store: &'a KvStore) -> Self {
        Self { store }
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.store.load(USER_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn login(&self, username: &str, password: &str) -> bool {
        if username != USERNAME || password != PASSWORD {
            tracing::info!(username, "login rejected");
            return false;
        }
        self.store.save(
            USER_KEY,
            &UserRecord {
                username: username.to_string(),
            },
        );
        tracing::info!(username, "logged in");
        true
    }

    pub fn logout(&self) {
        self.store.remove(USER_KEY);
    }

    pub fn list_users(&self) -> Vec<UserRecord> {
        self.store.load(USERS_KEY).unwrap_or_default()
    }
}
