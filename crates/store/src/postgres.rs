use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CartId, Money, OrderId, ProductId, Result, StoreError, UserId,
    model::{Cart, CartLine, Order, OrderLine, Product},
    store::{Store, StoreTx},
};

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, discount_price_cents, stock_quantity, active";

const ORDER_COLUMNS: &str = "id, user_id, created_at, updated_at, shipping_address, \
     subtotal_cents, shipping_cost_cents, discount_amount_cents, total_cents, \
     payment_method, order_status, payment_status, transaction_id";

/// PostgreSQL-backed store.
///
/// Row locks are PostgreSQL's own: `SELECT … FOR UPDATE` for products and
/// orders, and a transaction-scoped advisory lock keyed by user for the
/// active-cart slot.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store whose lock waits are unbounded.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bounds every lock wait inside this store's transactions.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a product, as a catalog edit would.
    pub async fn put_product(&self, product: &Product) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_product(&mut conn, product).await
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let mut tx = self.pool.begin().await?;

        if let Some(limit) = self.lock_timeout {
            // SET does not accept bind parameters
            let statement = format!("SET LOCAL lock_timeout = '{}ms'", limit.as_millis());
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        Ok(PgTx { tx })
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id, false).await
    }

    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_cart(&mut conn, user_id, false).await
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id, false).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&mut *conn)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let mut order = row_to_order(&row)?;
            order.lines = fetch_order_lines(&mut conn, order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }
}

/// Transaction over a [`PostgresStore`].
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        let started = Instant::now();
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| lock_error(e, format!("active cart of user {user_id}")))?;
        metrics::histogram!("store_lock_wait_seconds", "row" => "cart")
            .record(started.elapsed().as_secs_f64());

        fetch_active_cart(&mut self.tx, user_id, true).await
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, status, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(cart.status.as_str())
        .bind(cart.created_at)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for (position, line) in cart.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO cart_lines (cart_id, position, product_id, quantity) VALUES ($1, $2, $3, $4)",
            )
            .bind(cart.id.as_uuid())
            .bind(to_i32(position, "cart_lines.position")?)
            .bind(line.product_id.as_str())
            .bind(to_i32(line.quantity, "cart_lines.quantity")?)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn lock_product(&mut self, id: &ProductId) -> Result<Option<Product>> {
        let started = Instant::now();
        let product = fetch_product(&mut self.tx, id, true).await?;
        metrics::histogram!("store_lock_wait_seconds", "row" => "product")
            .record(started.elapsed().as_secs_f64());
        Ok(product)
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        upsert_product(&mut self.tx, product).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.user_id.as_uuid())
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(&order.shipping_address)
            .bind(order.subtotal.cents())
            .bind(order.shipping_cost.cents())
            .bind(order.discount_amount.cents())
            .bind(order.total.cents())
            .bind(order.payment_method.as_str())
            .bind(order.order_status.as_str())
            .bind(order.payment_status.as_str())
            .bind(&order.transaction_id)
            .execute(&mut *self.tx)
            .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines
                    (order_id, position, product_id, product_name, quantity, price_at_purchase_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(to_i32(position, "order_lines.position")?)
            .bind(line.product_id.as_str())
            .bind(&line.product_name)
            .bind(to_i32(line.quantity, "order_lines.quantity")?)
            .bind(line.price_at_purchase.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut self.tx, id, true).await
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2, payment_status = $3, transaction_id = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.transaction_id)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn lock_clause(for_update: bool) -> &'static str {
    if for_update { " FOR UPDATE" } else { "" }
}

fn lock_error(err: sqlx::Error, what: String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE)
    {
        return StoreError::LockTimeout(what);
    }
    StoreError::Database(err)
}

fn to_i32<T: TryInto<i32>>(value: T, column: &'static str) -> Result<i32> {
    value.try_into().map_err(|_| StoreError::OutOfRange(column))
}

fn to_u32(value: i32, column: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::OutOfRange(column))
}

async fn upsert_product(conn: &mut PgConnection, product: &Product) -> Result<()> {
    let sql = format!(
        "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, price_cents = EXCLUDED.price_cents, \
         discount_price_cents = EXCLUDED.discount_price_cents, \
         stock_quantity = EXCLUDED.stock_quantity, active = EXCLUDED.active"
    );
    sqlx::query(&sql)
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.discount_price.map(|m| m.cents()))
        .bind(to_i32(product.stock_quantity, "products.stock_quantity")?)
        .bind(product.active)
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_product(
    conn: &mut PgConnection,
    id: &ProductId,
    for_update: bool,
) -> Result<Option<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1{}",
        lock_clause(for_update)
    );
    let row = sqlx::query(&sql)
        .bind(id.as_str())
        .fetch_optional(conn)
        .await
        .map_err(|e| lock_error(e, format!("product {id}")))?;

    row.map(|row| row_to_product(&row)).transpose()
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        discount_price: row
            .try_get::<Option<i64>, _>("discount_price_cents")?
            .map(Money::from_cents),
        stock_quantity: to_u32(row.try_get("stock_quantity")?, "products.stock_quantity")?,
        active: row.try_get("active")?,
    })
}

async fn fetch_active_cart(
    conn: &mut PgConnection,
    user_id: UserId,
    for_update: bool,
) -> Result<Option<Cart>> {
    let sql = format!(
        "SELECT id, user_id, status, created_at FROM carts \
         WHERE user_id = $1 AND status = 'ACTIVE'{}",
        lock_clause(for_update)
    );
    let Some(row) = sqlx::query(&sql)
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let mut cart = Cart {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        status: row.try_get::<String, _>("status")?.parse()?,
        lines: Vec::new(),
        created_at: row.try_get("created_at")?,
    };

    let lines = sqlx::query(
        "SELECT product_id, quantity FROM cart_lines WHERE cart_id = $1 ORDER BY position ASC",
    )
    .bind(cart.id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    for line in lines {
        cart.lines.push(CartLine {
            product_id: ProductId::new(line.try_get::<String, _>("product_id")?),
            quantity: to_u32(line.try_get("quantity")?, "cart_lines.quantity")?,
        });
    }

    Ok(Some(cart))
}

async fn fetch_order(
    conn: &mut PgConnection,
    id: OrderId,
    for_update: bool,
) -> Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}",
        lock_clause(for_update)
    );
    let Some(row) = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| lock_error(e, format!("order {id}")))?
    else {
        return Ok(None);
    };

    let mut order = row_to_order(&row)?;
    order.lines = fetch_order_lines(conn, order.id).await?;
    Ok(Some(order))
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        shipping_address: row.try_get("shipping_address")?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        shipping_cost: Money::from_cents(row.try_get("shipping_cost_cents")?),
        discount_amount: Money::from_cents(row.try_get("discount_amount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        payment_method: row.try_get::<String, _>("payment_method")?.parse()?,
        order_status: row.try_get::<String, _>("order_status")?.parse()?,
        payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
        transaction_id: row.try_get("transaction_id")?,
        lines: Vec::new(),
    })
}

async fn fetch_order_lines(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderLine>> {
    let rows = sqlx::query(
        r#"
        SELECT product_id, product_name, quantity, price_at_purchase_cents
        FROM order_lines
        WHERE order_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(order_id.as_uuid())
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(OrderLine {
                product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                product_name: row.try_get("product_name")?,
                quantity: to_u32(row.try_get("quantity")?, "order_lines.quantity")?,
                price_at_purchase: Money::from_cents(row.try_get("price_at_purchase_cents")?),
            })
        })
        .collect()
}
