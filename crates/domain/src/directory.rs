//! Ports onto the user directory and address book, which live outside checkout.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A customer as known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: full_name.into(),
        }
    }
}

/// Looks users up by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Option<User>;
}

/// Resolves a user's saved addresses to a single formatted line.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Returns the formatted address, or `None` if the id is unknown or
    /// belongs to another user.
    async fn resolve(&self, user_id: UserId, address_id: AddressId) -> Option<String>;
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id, user);
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Option<User> {
        self.users.read().ok()?.get(&id).cloned()
    }
}

/// A saved address in the in-memory address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Formats the address as a single line, e.g. `1 Main St, Springfield, IL 62701, US`.
    pub fn formatted(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

/// In-memory address book.
#[derive(Debug, Default)]
pub struct InMemoryAddressBook {
    addresses: RwLock<HashMap<AddressId, (UserId, Address)>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves an address for a user and returns its id.
    pub fn insert(&self, user_id: UserId, address: Address) -> AddressId {
        let id = AddressId::new();
        if let Ok(mut addresses) = self.addresses.write() {
            addresses.insert(id, (user_id, address));
        }
        id
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn resolve(&self, user_id: UserId, address_id: AddressId) -> Option<String> {
        let addresses = self.addresses.read().ok()?;
        let (owner, address) = addresses.get(&address_id)?;
        (*owner == user_id).then(|| address.formatted())
    }
}
