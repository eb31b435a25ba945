use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Fulfilment status of an order.
///
/// Lifecycle:
/// ```text
/// Pending ──► Processing ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// The diagram describes the intended flow only. Administrators may set any
/// status; see [`OrderStatus::follows_lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order placed, not yet picked up by staff.
    #[default]
    Pending,

    /// Order is being prepared.
    Processing,

    /// Order delivered (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if moving to `next` is an edge of the lifecycle diagram.
    pub fn follows_lifecycle(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Processing) => true,
            (OrderStatus::Processing, OrderStatus::Completed) => true,
            (current, OrderStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant::new("order status", other)),
        }
    }
}

/// Payment status. Recorded only; no gateway is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }
}

/// How the buyer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    BankTransfer,
    CreditCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::CreditCard => "CREDIT_CARD",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(PaymentMethod::Cod),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
            other => Err(UnknownVariant::new("payment method", other)),
        }
    }
}

/// A purchased product with its price frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> Money {
        self.price_at_purchase.multiply(self.quantity)
    }
}

/// A placed order.
///
/// Lines and amounts are fixed when the order is built at checkout. After the
/// order is inserted only the status pair (and transaction id) is ever written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) user_id: UserId,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) shipping_address: String,
    pub(crate) subtotal: Money,
    pub(crate) shipping_cost: Money,
    pub(crate) discount_amount: Money,
    pub(crate) total: Money,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) order_status: OrderStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) transaction_id: Option<String>,
    pub(crate) lines: Vec<OrderLine>,
}

impl Order {
    /// Starts a new, empty order in `Pending`/`Pending`.
    pub fn new(
        user_id: UserId,
        shipping_address: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            created_at: now,
            updated_at: now,
            shipping_address: shipping_address.into(),
            subtotal: Money::zero(),
            shipping_cost: Money::zero(),
            discount_amount: Money::zero(),
            total: Money::zero(),
            payment_method,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            transaction_id: None,
            lines: Vec::new(),
        }
    }

    /// Appends a line and adds its subtotal to the order subtotal.
    pub fn add_line(&mut self, line: OrderLine) {
        self.subtotal += line.subtotal();
        self.lines.push(line);
    }

    /// Fixes shipping and discount and computes `total = subtotal + shipping - discount`.
    pub fn apply_charges(&mut self, shipping_cost: Money, discount_amount: Money) {
        self.shipping_cost = shipping_cost;
        self.discount_amount = discount_amount;
        self.total = self.subtotal + shipping_cost - discount_amount;
    }

    pub fn set_order_status(&mut self, status: OrderStatus) {
        self.order_status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_transaction_id(&mut self, transaction_id: impl Into<String>) {
        self.transaction_id = Some(transaction_id.into());
        self.updated_at = Utc::now();
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn order_status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }
}
