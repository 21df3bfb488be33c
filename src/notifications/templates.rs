//! HTML bodies for storefront mail. Every interpolated user value goes
//! through [`escape_html`].

use crate::models::cart::format_money;
use rust_decimal::Decimal;

pub const STANDARD_DELIVERY: &str = "3-5 Business Days";
pub const SIMULATION_SUFFIX: &str = " (Simulation)";

/// A line on the customer receipt; `price` is already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: String,
    pub customer_name: String,
    pub items: Vec<ReceiptLine>,
    pub total: Decimal,
    pub delivery_address: String,
    pub estimated_delivery: String,
}

pub fn estimated_delivery(simulated: bool) -> String {
    if simulated {
        format!("{}{}", STANDARD_DELIVERY, SIMULATION_SUFFIX)
    } else {
        STANDARD_DELIVERY.to_string()
    }
}

pub fn delivery_address(address: &str, city: &str, zip: &str) -> String {
    format!("{}, {} {}", address, city, zip)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn order_confirmation_html(receipt: &Receipt, public_base_url: &str) -> String {
    let items: String = receipt
        .items
        .iter()
        .map(|item| {
            format!(
                r#"<div class="item"><strong>{}</strong> x {} = {}</div>"#,
                escape_html(&item.name),
                item.quantity,
                escape_html(&item.price)
            )
        })
        .collect();

    let order_id = escape_html(&receipt.order_id);

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <style>
      body {{ font-family: Arial, sans-serif; background-color: #f5f5f5; }}
      .container {{ max-width: 600px; margin: 0 auto; background: white; padding: 40px; }}
      .header {{ background: linear-gradient(135deg, #2D1810 0%, #1A0F0A 100%); color: #F5E6D3; padding: 20px; text-align: center; border-radius: 8px; }}
      .order-id {{ font-size: 24px; font-weight: bold; margin: 20px 0; }}
      .item {{ padding: 10px 0; border-bottom: 1px solid #ddd; }}
      .total {{ font-size: 20px; font-weight: bold; color: #4F9C8F; margin: 20px 0; }}
      .button {{ background: #4F9C8F; color: white; padding: 12px 24px; border-radius: 6px; text-decoration: none; display: inline-block; margin-top: 20px; }}
      .footer {{ color: #999; font-size: 12px; margin-top: 30px; text-align: center; }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="header">
        <h1>Artisan Coffee</h1>
        <p>Order Confirmation</p>
      </div>
      <p>Hi {name},</p>
      <p>Thank you for your order! We're thrilled to prepare your premium coffee.</p>
      <div class="order-id">Order #{order_id}</div>
      <h2>Order Details:</h2>
      {items}
      <div class="total">Total: {total}</div>
      <h3>Delivery Information:</h3>
      <p>
        <strong>Address:</strong> {address}<br>
        <strong>Estimated Delivery:</strong> {delivery}
      </p>
      <p>You can track your order status anytime by visiting our website.</p>
      <a href="{base}/orders/{order_id}" class="button">Track Order</a>
      <div class="footer">
        <p>Artisan Coffee Co. | Premium Coffee Delivered Fresh</p>
        <p>Questions? Reply to this email or visit our support page.</p>
      </div>
    </div>
  </body>
</html>"#,
        name = escape_html(&receipt.customer_name),
        order_id = order_id,
        items = items,
        total = format_money(receipt.total),
        address = escape_html(&receipt.delivery_address),
        delivery = escape_html(&receipt.estimated_delivery),
        base = escape_html(public_base_url),
    )
}

/// Merchant alert wrapping a copy of the customer receipt.
pub fn merchant_alert_html(customer_name: &str, customer_email: &str, receipt_html: &str) -> String {
    format!(
        r#"<div style="background: #fffbf0; border: 2px solid #eab308; padding: 20px; border-radius: 8px; font-family: sans-serif; margin-bottom: 24px;">
  <h2 style="color: #854d0e; margin-top: 0;">New Order Alert</h2>
  <p style="font-size: 16px;"><strong>{}</strong> just placed an order!</p>
  <p><strong>Customer Email:</strong> {}</p>
  <p style="margin-top: 10px; font-size: 14px; color: #713f12;">(Below is a copy of the receipt sent to them)</p>
</div>
<div style="opacity: 0.8; border-top: 1px dashed #ccc; padding-top: 20px;">
{}
</div>"#,
        escape_html(customer_name),
        escape_html(customer_email),
        receipt_html
    )
}

pub fn contact_admin_html(name: &str, email: &str, message: &str) -> String {
    format!(
        "<h1>New Message</h1>\n<p><strong>From:</strong> {} ({})</p>\n<p><strong>Message:</strong></p>\n<p>{}</p>",
        escape_html(name),
        escape_html(email),
        escape_html(message).replace('\n', "<br>")
    )
}

pub fn contact_ack_html(name: &str) -> String {
    format!(
        "<h1>Thanks for reaching out!</h1>\n<p>Hi {},</p>\n<p>We've received your message and will get back to you shortly.</p>\n<br>\n<p>Best regards,</p>\n<p>Artisan Coffee Team</p>",
        escape_html(name)
    )
}
