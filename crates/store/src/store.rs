use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};

use crate::Result;
use crate::model::{Cart, Order, Product};

/// Shared handle to the checkout database.
///
/// Reads on the handle see committed data and never wait on row locks.
/// Anything that writes goes through a transaction from [`Store::begin`].
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// The transaction type produced by this store.
    type Tx: StoreTx;

    /// Starts a unit of work.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Reads a product without locking it.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Reads the user's active cart without locking it.
    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Reads an order without locking it.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns every order a user has placed, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// A single atomic unit of work.
///
/// Every `lock_*` call takes an exclusive lock on the row that is held until
/// the transaction ends. A second transaction locking the same row waits.
/// Dropping a transaction without calling [`StoreTx::commit`] rolls it back.
///
/// Callers must take locks in a consistent order: the user's cart slot first,
/// then products in ascending id order.
#[async_trait]
pub trait StoreTx: Send + Sized {
    /// Locks the user's active-cart slot and returns the active cart, if any.
    ///
    /// The slot is locked even when no active cart exists yet, so a cart
    /// created and saved in this transaction cannot race another creator.
    async fn lock_active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>>;

    /// Inserts or updates a cart together with its lines.
    async fn save_cart(&mut self, cart: &Cart) -> Result<()>;

    /// Locks a product row for update.
    async fn lock_product(&mut self, id: &ProductId) -> Result<Option<Product>>;

    /// Writes a product row.
    async fn save_product(&mut self, product: &Product) -> Result<()>;

    /// Inserts a new order with its lines.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Locks an order row for update.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Writes the mutable part of an order: status pair and transaction id.
    async fn save_order_status(&mut self, order: &Order) -> Result<()>;

    /// Makes every write visible and releases all locks.
    async fn commit(self) -> Result<()>;

    /// Discards every write and releases all locks.
    async fn rollback(self) -> Result<()>;
}
