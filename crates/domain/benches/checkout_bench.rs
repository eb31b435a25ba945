use std::sync::Arc;

use common::{Money, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CartService, CheckoutService, InMemoryAddressBook, InMemoryUserDirectory, NoopPublisher,
    PlaceOrder, ShippingDestination, User,
};
use store::{InMemoryStore, PaymentMethod, Product};

const LINES: usize = 5;

struct Fixture {
    users: Arc<InMemoryUserDirectory>,
    carts: CartService<InMemoryStore>,
    checkout: CheckoutService<InMemoryStore>,
}

fn fixture(rt: &tokio::runtime::Runtime) -> Fixture {
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..LINES {
            store
                .put_product(Product::new(
                    format!("SKU-{i:03}"),
                    format!("Product {i}"),
                    Money::from_cents(100 * (i as i64 + 1)),
                    u32::MAX,
                ))
                .await
                .unwrap();
        }
    });

    let users = Arc::new(InMemoryUserDirectory::new());
    Fixture {
        carts: CartService::new(store.clone(), users.clone()),
        checkout: CheckoutService::new(
            store,
            users.clone(),
            Arc::new(InMemoryAddressBook::new()),
            Arc::new(NoopPublisher),
        ),
        users,
    }
}

async fn fill_cart(f: &Fixture) -> UserId {
    let user = UserId::new();
    f.users.insert(User::new(user, "bench@example.com", "Bench"));
    for i in 0..LINES {
        f.carts
            .add_line(user, format!("SKU-{i:03}").into(), 1)
            .await
            .unwrap();
    }
    user
}

fn bench_fill_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let f = fixture(&rt);

    c.bench_function("checkout/fill_cart_5_lines", |b| {
        b.iter(|| {
            rt.block_on(fill_cart(&f));
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let f = fixture(&rt);

    c.bench_function("checkout/cart_to_order_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = fill_cart(&f).await;
                f.checkout
                    .place_order(PlaceOrder::new(
                        user,
                        ShippingDestination::inline("1 Bench St"),
                        PaymentMethod::Cod,
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_fill_cart, bench_place_order);
criterion_main!(benches);
