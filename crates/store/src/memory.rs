use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    CartId, OrderId, ProductId, Result, StoreError, UserId,
    model::{Cart, Order, Product},
    store::{Store, StoreTx},
};

/// Identifies a lockable row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Product(ProductId),
    ActiveCart(UserId),
    Order(OrderId),
}

impl RowKey {
    fn kind(&self) -> &'static str {
        match self {
            RowKey::Product(_) => "product",
            RowKey::ActiveCart(_) => "cart",
            RowKey::Order(_) => "order",
        }
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowKey::Product(id) => write!(f, "product {id}"),
            RowKey::ActiveCart(user) => write!(f, "active cart of user {user}"),
            RowKey::Order(id) => write!(f, "order {id}"),
        }
    }
}

#[derive(Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<OrderId, Order>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<Mutex<()>>>>,
    lock_timeout: Option<Duration>,
}

impl Inner {
    async fn acquire(&self, key: &RowKey) -> Result<OwnedMutexGuard<()>> {
        let row = {
            let mut locks = self.row_locks.lock().await;
            // Only the map holds an idle row's mutex
            locks.retain(|_, row| Arc::strong_count(row) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        let started = Instant::now();
        let guard = match self.lock_timeout {
            Some(limit) => tokio::time::timeout(limit, row.lock_owned())
                .await
                .map_err(|_| StoreError::LockTimeout(key.to_string()))?,
            None => row.lock_owned().await,
        };
        metrics::histogram!("store_lock_wait_seconds", "row" => key.kind())
            .record(started.elapsed().as_secs_f64());

        Ok(guard)
    }

    #[cfg(test)]
    async fn tracked_rows(&self) -> usize {
        self.row_locks.lock().await.len()
    }
}

/// In-memory store for tests and local runs.
///
/// Committed rows live in plain tables. Each row also has an async mutex that
/// stands in for the database's exclusive row lock: a transaction keeps the
/// owned guard until it ends and stages its writes, which are applied to the
/// tables on commit before the guards are released.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Creates a new empty store whose lock waits are unbounded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store that gives up on a row lock after `timeout`.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                lock_timeout: Some(timeout),
                ..Inner::default()
            }),
        }
    }

    /// Inserts or replaces a product, as a catalog edit would.
    ///
    /// Waits for any transaction holding the product's lock.
    pub async fn put_product(&self, product: Product) -> Result<()> {
        let _guard = self
            .inner
            .acquire(&RowKey::Product(product.id.clone()))
            .await?;
        self.inner
            .tables
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
        Ok(())
    }

    /// Returns every cart, in any status, that belongs to a user.
    pub async fn carts_for_user(&self, user_id: UserId) -> Vec<Cart> {
        self.inner
            .tables
            .read()
            .await
            .carts
            .values()
            .filter(|cart| cart.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.inner.tables.read().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        Ok(InMemoryTx {
            inner: Arc::clone(&self.inner),
            held: HashMap::new(),
            products: HashMap::new(),
            carts: HashMap::new(),
            orders: HashMap::new(),
        })
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.inner.tables.read().await.products.get(id).cloned())
    }

    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self
            .inner
            .tables
            .read()
            .await
            .carts
            .values()
            .find(|cart| cart.user_id == user_id && cart.is_active())
            .cloned())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.tables.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.inner.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTx {
    inner: Arc<Inner>,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<OrderId, Order>,
}

impl InMemoryTx {
    async fn hold(&mut self, key: RowKey) -> Result<()> {
        if !self.held.contains_key(&key) {
            let guard = self.inner.acquire(&key).await?;
            self.held.insert(key, guard);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        self.hold(RowKey::ActiveCart(user_id)).await?;

        if let Some(cart) = self
            .carts
            .values()
            .find(|cart| cart.user_id == user_id && cart.is_active())
        {
            return Ok(Some(cart.clone()));
        }

        let tables = self.inner.tables.read().await;
        Ok(tables
            .carts
            .values()
            .find(|cart| {
                cart.user_id == user_id && cart.is_active() && !self.carts.contains_key(&cart.id)
            })
            .cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        self.hold(RowKey::ActiveCart(cart.user_id)).await?;
        self.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn lock_product(&mut self, id: &ProductId) -> Result<Option<Product>> {
        self.hold(RowKey::Product(id.clone())).await?;

        if let Some(product) = self.products.get(id) {
            return Ok(Some(product.clone()));
        }
        Ok(self.inner.tables.read().await.products.get(id).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        self.hold(RowKey::Product(product.id.clone())).await?;
        self.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.hold(RowKey::Order(order.id)).await?;
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.hold(RowKey::Order(id)).await?;

        if let Some(order) = self.orders.get(&id) {
            return Ok(Some(order.clone()));
        }
        Ok(self.inner.tables.read().await.orders.get(&id).cloned())
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        self.hold(RowKey::Order(order.id)).await?;

        let staged = match self.orders.remove(&order.id) {
            Some(staged) => Some(staged),
            None => self.inner.tables.read().await.orders.get(&order.id).cloned(),
        };
        if let Some(mut staged) = staged {
            staged.order_status = order.order_status;
            staged.payment_status = order.payment_status;
            staged.transaction_id = order.transaction_id.clone();
            staged.updated_at = order.updated_at;
            self.orders.insert(order.id, staged);
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTx {
            inner,
            held,
            products,
            carts,
            orders,
        } = self;

        {
            let mut tables = inner.tables.write().await;
            tables.products.extend(products);
            tables.carts.extend(carts);
            tables.orders.extend(orders);
        }

        // Locks are released only after the writes are visible.
        drop(held);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        tracing::debug!(locks = self.held.len(), "rolling back in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    use crate::model::{OrderStatus, PaymentMethod};

    fn burger(stock: u32) -> Product {
        Product::new("SKU-A", "Burger", Money::from_cents(1000), stock)
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let store = InMemoryStore::new();
        store.put_product(burger(3)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut product = tx.lock_product(&"SKU-A".into()).await.unwrap().unwrap();
        assert!(product.decrement_stock(2));
        tx.save_product(&product).await.unwrap();

        // Not visible before commit
        let committed = store.find_product(&"SKU-A".into()).await.unwrap().unwrap();
        assert_eq!(committed.stock_quantity, 3);

        tx.commit().await.unwrap();

        let committed = store.find_product(&"SKU-A".into()).await.unwrap().unwrap();
        assert_eq!(committed.stock_quantity, 1);
    }

    #[tokio::test]
    async fn test_dropping_a_transaction_rolls_back() {
        let store = InMemoryStore::new();
        store.put_product(burger(3)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut product = tx.lock_product(&"SKU-A".into()).await.unwrap().unwrap();
            product.decrement_stock(3);
            tx.save_product(&product).await.unwrap();
            tx.insert_order(&Order::new(UserId::new(), "x", PaymentMethod::Cod))
                .await
                .unwrap();
        }

        let committed = store.find_product(&"SKU-A".into()).await.unwrap().unwrap();
        assert_eq!(committed.stock_quantity, 3);
        assert_eq!(store.order_count().await, 0);

        // The lock was released by the drop
        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_product(&"SKU-A".into()).await.unwrap().is_some());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_locker_waits_for_commit() {
        let store = InMemoryStore::new();
        store.put_product(burger(3)).await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut product = first.lock_product(&"SKU-A".into()).await.unwrap().unwrap();

        let contender = store.clone();
        let waiter = tokio::spawn(async move {
            let mut tx = contender.begin().await.unwrap();
            let seen = tx.lock_product(&"SKU-A".into()).await.unwrap().unwrap();
            tx.commit().await.unwrap();
            seen.stock_quantity
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        product.decrement_stock(1);
        first.save_product(&product).await.unwrap();
        first.commit().await.unwrap();

        assert_eq!(waiter.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lock_timeout() {
        let store = InMemoryStore::with_lock_timeout(Duration::from_millis(20));
        store.put_product(burger(1)).await.unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.lock_product(&"SKU-A".into()).await.unwrap();

        let mut other = store.begin().await.unwrap();
        let result = other.lock_product(&"SKU-A".into()).await;
        assert!(matches!(result, Err(StoreError::LockTimeout(_))));

        holder.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_row_locks_are_pruned() {
        let store = InMemoryStore::new();
        for n in 0..50 {
            store
                .put_product(Product::new(format!("SKU-{n}"), "Burger", Money::from_cents(1000), 1))
                .await
                .unwrap();
        }
        assert!(store.inner.tracked_rows().await <= 1);

        let mut holder = store.begin().await.unwrap();
        holder.lock_product(&"SKU-7".into()).await.unwrap();
        store.put_product(burger(2)).await.unwrap();

        // The held row survives pruning and still blocks other lockers
        assert_eq!(store.inner.tracked_rows().await, 2);
        let contender = store.clone();
        let waiter = tokio::spawn(async move {
            let mut tx = contender.begin().await.unwrap();
            tx.lock_product(&"SKU-7".into()).await.unwrap();
            tx.commit().await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        holder.commit().await.unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_checked_out_cart_is_not_active_inside_the_transaction() {
        let store = InMemoryStore::new();
        let user = UserId::new();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_active_cart(user).await.unwrap().is_none());
        let mut cart = Cart::new(user);
        cart.add_quantity("SKU-A".into(), 1);
        tx.save_cart(&cart).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut cart = tx.lock_active_cart(user).await.unwrap().unwrap();
        cart.mark_checked_out();
        tx.save_cart(&cart).await.unwrap();
        assert!(tx.lock_active_cart(user).await.unwrap().is_none());
        tx.commit().await.unwrap();

        assert!(store.find_active_cart(user).await.unwrap().is_none());
        assert_eq!(store.carts_for_user(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_order_status_keeps_lines() {
        let store = InMemoryStore::new();
        let mut order = Order::new(UserId::new(), "1 Main St", PaymentMethod::Cod);
        order.add_line(crate::model::OrderLine {
            product_id: "SKU-A".into(),
            product_name: "Burger".to_string(),
            quantity: 1,
            price_at_purchase: Money::from_cents(1000),
        });

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_order(order.id()).await.unwrap().unwrap();
        locked.set_order_status(OrderStatus::Processing);
        tx.save_order_status(&locked).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.find_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.order_status(), OrderStatus::Processing);
        assert_eq!(stored.lines(), order.lines());
    }

    #[tokio::test]
    async fn test_orders_for_user_newest_first() {
        let store = InMemoryStore::new();
        let user = UserId::new();

        let first = Order::new(user, "a", PaymentMethod::Cod);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = Order::new(user, "b", PaymentMethod::Cod);
        let other = Order::new(UserId::new(), "c", PaymentMethod::Cod);

        let mut tx = store.begin().await.unwrap();
        for order in [&first, &second, &other] {
            tx.insert_order(order).await.unwrap();
        }
        tx.commit().await.unwrap();

        let ids: Vec<_> = store
            .orders_for_user(user)
            .await
            .unwrap()
            .iter()
            .map(Order::id)
            .collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }
}
