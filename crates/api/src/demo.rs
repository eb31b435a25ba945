//! Sample shopper and catalog so the server is usable without external systems.

use std::sync::Arc;

use common::{Money, UserId};
use domain::{Address, InMemoryAddressBook, InMemoryUserDirectory, User};
use store::Product;
use uuid::Uuid;

/// Fixed id of the demo shopper, stable across restarts.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x0d3e_7a1c_5b4f_4c2e_9a6d_1f2b_3c4d_5e6f);

pub fn demo_user() -> User {
    User::new(
        UserId::from_uuid(DEMO_USER_ID),
        "demo@foodanddrink.com",
        "Demo Shopper",
    )
}

/// Builds a directory holding the demo shopper and one saved address.
pub fn directory() -> (Arc<InMemoryUserDirectory>, Arc<InMemoryAddressBook>) {
    let users = Arc::new(InMemoryUserDirectory::new());
    let addresses = Arc::new(InMemoryAddressBook::new());

    let user = demo_user();
    let address_id = addresses.insert(
        user.id,
        Address {
            street: "12 Market Street".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            postal_code: "62701".into(),
            country: "USA".into(),
        },
    );
    tracing::info!(user_id = %user.id, address_id = %address_id, "demo shopper registered");
    users.insert(user);

    (users, addresses)
}

/// Products loaded into the in-memory store at startup.
pub fn catalog() -> Vec<Product> {
    vec![
        Product::new("ESPRESSO", "Espresso", Money::from_cents(350), 100),
        Product::new("LATTE", "Caffe Latte", Money::from_cents(450), 100)
            .with_discount(Money::from_cents(400)),
        Product::new("CROISSANT", "Butter Croissant", Money::from_cents(300), 24),
        Product::new("BAGEL", "Sesame Bagel", Money::from_cents(275), 0),
    ]
}
