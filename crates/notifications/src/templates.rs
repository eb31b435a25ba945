//! Message bodies for order notifications.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use domain::OrderSnapshot;
use store::OrderStatus;

const SIGNATURE: &str = "Best regards,\nFood & Drink Project Team";

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Subject and body of the purchaser's order confirmation.
pub fn order_confirmation(order: &OrderSnapshot) -> (String, String) {
    let mut body = String::new();
    let recipient = order.user_email.as_deref().unwrap_or("Customer");

    let _ = writeln!(body, "Dear {recipient},\n");
    body.push_str("Thank you for your order!\n\n");
    body.push_str("Order Details:\n");
    let _ = writeln!(body, "Order ID: #{}", order.id);
    let _ = writeln!(body, "Order Date: {}", format_date(order.order_date));
    let _ = writeln!(body, "Status: {}", order.order_status);
    let _ = writeln!(body, "Payment Method: {}", order.payment_method);
    let _ = writeln!(body, "Shipping Address: {}\n", order.shipping_address);

    body.push_str("Items:\n");
    for item in &order.items {
        let _ = writeln!(
            body,
            "- {} x{} - {}",
            item.product_name, item.quantity, item.price_at_purchase
        );
    }

    let _ = writeln!(body, "\nSubtotal: {}", order.subtotal);
    let _ = writeln!(body, "Shipping: {}", order.shipping_cost);
    let _ = writeln!(body, "Discount: -{}", order.discount_amount);
    let _ = writeln!(body, "Total: {}\n", order.total);

    body.push_str("We will send you another email when your order is shipped.\n\n");
    body.push_str(SIGNATURE);

    (format!("Order Confirmation - Order #{}", order.id), body)
}

/// Subject and body of the purchaser's status-change email.
pub fn order_status_update(
    order: &OrderSnapshot,
    old_status: OrderStatus,
    new_status: OrderStatus,
) -> (String, String) {
    let mut body = String::new();

    body.push_str("Dear Customer,\n\n");
    body.push_str("Your order status has been updated!\n\n");
    let _ = writeln!(body, "Order ID: #{}", order.id);
    let _ = writeln!(body, "Previous Status: {old_status}");
    let _ = writeln!(body, "New Status: {new_status}");
    let _ = writeln!(body, "Updated At: {}\n", format_date(order.updated_at));

    match new_status {
        OrderStatus::Completed => {
            body.push_str("Your order has been delivered! Enjoy your meal!\n");
        }
        OrderStatus::Cancelled => {
            body.push_str(
                "Your order has been cancelled. If you did not request this, please contact us.\n",
            );
        }
        OrderStatus::Pending | OrderStatus::Processing => {}
    }

    body.push('\n');
    body.push_str(SIGNATURE);

    (format!("Order Status Update - Order #{}", order.id), body)
}

/// Subject and body of the internal new-order alert.
pub fn admin_new_order(order: &OrderSnapshot) -> (String, String) {
    let mut body = String::new();

    body.push_str("🛒 New Order Alert!\n\n");
    let _ = writeln!(body, "Order ID: #{}", order.id);
    let _ = writeln!(
        body,
        "Customer: {}",
        order.user_email.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(body, "Total Amount: {}", order.total);
    let _ = writeln!(body, "Payment Method: {}", order.payment_method);
    let _ = writeln!(body, "Payment Status: {}", order.payment_status);
    let _ = writeln!(body, "Items Count: {}", order.items.len());
    let _ = writeln!(body, "Created At: {}", format_date(order.order_date));

    (format!("🛒 New Order Alert - Order #{}", order.id), body)
}

/// Chatwork message announcing a new order.
pub fn chat_new_order(order: &OrderSnapshot) -> String {
    format!(
        "[info][title]🛒 New Order Received! #{}[/title]Total Amount: {}\nPayment Method: {}\nStatus: {}[/info]",
        order.id, order.total, order.payment_method, order.order_status
    )
}
