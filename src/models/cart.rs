use crate::errors::ServiceError;
use crate::models::order::OrderItem;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Name used for line items that arrive without one
pub const FALLBACK_ITEM_NAME: &str = "Coffee";

/// Product reference as sent by the storefront cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Display price such as "$12.50"; plain numbers are accepted too.
    #[serde(deserialize_with = "price_text")]
    pub price: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductRef,
    pub quantity: u32,
}

/// Customer contact and delivery fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[serde(default)]
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "A valid customer email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Delivery address is required"))]
    pub address: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub zip: String,
}

impl Customer {
    /// Trims every field. Validation runs on the trimmed values.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            zip: self.zip.trim().to_string(),
        }
    }

    /// Trims and validates in one step
    pub fn checked(self) -> Result<Self, ServiceError> {
        let customer = self.normalized();
        customer.validate()?;
        Ok(customer)
    }
}

/// A cart line whose price has been parsed into minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    /// Unit price in cents, exactly what the gateway is charged
    pub unit_amount: i64,
}

impl PricedLine {
    pub fn unit_price(&self) -> Decimal {
        Decimal::new(self.unit_amount, 2)
    }
}

/// A validated, priced cart. The total is computed once, in minor units, so
/// the stored order total and the gateway charge agree to the cent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    lines: Vec<PricedLine>,
    total_minor: i64,
}

impl PricedCart {
    pub fn from_lines(lines: &[CartLine]) -> Result<Self, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "No items in checkout".to_string(),
            ));
        }

        let mut priced = Vec::with_capacity(lines.len());
        let mut total_minor: i64 = 0;

        for line in lines {
            if line.quantity == 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for '{}' must be at least 1",
                    line.product.id
                )));
            }

            let unit_amount = to_minor_units(parse_price(&line.product.price)?)?;
            total_minor = unit_amount
                .checked_mul(i64::from(line.quantity))
                .and_then(|amount| total_minor.checked_add(amount))
                .ok_or_else(|| ServiceError::ValidationError("Cart total is too large".into()))?;

            let name = match line.product.name.trim() {
                "" => FALLBACK_ITEM_NAME.to_string(),
                name => name.to_string(),
            };

            priced.push(PricedLine {
                product_id: line.product.id.clone(),
                name,
                image: line.product.image.clone().filter(|img| !img.trim().is_empty()),
                quantity: line.quantity,
                unit_amount,
            });
        }

        Ok(Self {
            lines: priced,
            total_minor,
        })
    }

    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    pub fn total_minor(&self) -> i64 {
        self.total_minor
    }

    pub fn total_amount(&self) -> Decimal {
        Decimal::new(self.total_minor, 2)
    }

    /// Snapshot stored with the order
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                price: line.unit_price(),
            })
            .collect()
    }
}

/// Parses a display price ("$1,024.50", "12.5", " $3 ") into a decimal.
pub fn parse_price(raw: &str) -> Result<Decimal, ServiceError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let value = Decimal::from_str(cleaned.trim())
        .map_err(|_| ServiceError::ValidationError(format!("Invalid price '{}'", raw)))?;

    if value.is_sign_negative() {
        return Err(ServiceError::ValidationError(format!(
            "Invalid price '{}'",
            raw
        )));
    }

    Ok(value)
}

/// Converts a price to integer cents, rounding half away from zero.
pub fn to_minor_units(price: Decimal) -> Result<i64, ServiceError> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| ServiceError::ValidationError("Price is out of range".to_string()))
}

/// Formats a decimal as "$x.yy"
pub fn format_money(amount: Decimal) -> String {
    format!(
        "${:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(id: &str, price: &str, quantity: u32) -> CartLine {
        CartLine {
            product: ProductRef {
                id: id.to_string(),
                name: format!("Product {}", id),
                price: price.to_string(),
                image: Some(format!("/images/{}.jpg", id)),
            },
            quantity,
        }
    }

    #[rstest]
    #[case("$12.50", dec!(12.50))]
    #[case("12.5", dec!(12.5))]
    #[case("  $3 ", dec!(3))]
    #[case("$1,024.99", dec!(1024.99))]
    #[case("0", dec!(0))]
    fn parses_display_prices(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_price(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("$")]
    #[case("twelve")]
    #[case("$-4.00")]
    #[case("12.50 USD")]
    fn rejects_malformed_prices(#[case] raw: &str) {
        assert_matches!(parse_price(raw), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(12.50)).unwrap(), 1250);
        assert_eq!(to_minor_units(dec!(0.125)).unwrap(), 13);
        assert_eq!(to_minor_units(dec!(19.994)).unwrap(), 1999);
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_matches!(
            PricedCart::from_lines(&[]),
            Err(ServiceError::ValidationError(msg)) if msg == "No items in checkout"
        );
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert_matches!(
            PricedCart::from_lines(&[line("p1", "$5.00", 0)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn totals_two_bags_at_twelve_fifty() {
        let cart = PricedCart::from_lines(&[line("p1", "$12.50", 2)]).unwrap();
        assert_eq!(cart.total_minor(), 2500);
        assert_eq!(cart.total_amount(), dec!(25.00));

        let items = cart.order_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, "p1");
        assert_eq!(items[0].price, dec!(12.50));
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn blank_names_and_images_fall_back() {
        let mut bare = line("p9", "4", 1);
        bare.product.name = "  ".into();
        bare.product.image = Some(String::new());

        let cart = PricedCart::from_lines(&[bare]).unwrap();
        assert_eq!(cart.lines()[0].name, FALLBACK_ITEM_NAME);
        assert_eq!(cart.lines()[0].image, None);
    }

    #[test]
    fn numeric_prices_deserialize() {
        let parsed: CartLine = serde_json::from_value(serde_json::json!({
            "product": { "id": "p1", "name": "Ethiopia", "price": 18.5 },
            "quantity": 1
        }))
        .unwrap();
        assert_eq!(parsed.product.price, "18.5");
    }

    #[test]
    fn customer_fields_are_trimmed_before_validation() {
        let customer = Customer {
            name: "  Ada Lovelace ".into(),
            email: " ada@example.com ".into(),
            address: " 12 Bean St".into(),
            city: "Portland ".into(),
            zip: " 97201 ".into(),
        }
        .checked()
        .unwrap();

        assert_eq!(customer.name, "Ada Lovelace");
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.zip, "97201");
    }

    #[test]
    fn whitespace_only_customer_fields_fail_validation() {
        let customer = Customer {
            name: "   ".into(),
            email: "ada@example.com".into(),
            address: "12 Bean St".into(),
            city: "Portland".into(),
            zip: "97201".into(),
        };
        assert_matches!(customer.checked(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn money_formats_with_two_decimals() {
        assert_eq!(format_money(dec!(25)), "$25.00");
        assert_eq!(format_money(dec!(7.5)), "$7.50");
    }

    proptest! {
        #[test]
        fn order_total_matches_gateway_charge(
            lines in prop::collection::vec((0u32..50_000, 1u32..25), 1..8)
        ) {
            let cart_lines: Vec<CartLine> = lines
                .iter()
                .enumerate()
                .map(|(i, (cents, qty))| {
                    line(&format!("p{}", i), &format!("${}.{:02}", cents / 100, cents % 100), *qty)
                })
                .collect();

            let cart = PricedCart::from_lines(&cart_lines).unwrap();

            let gateway_charge: i64 = cart
                .lines()
                .iter()
                .map(|l| l.unit_amount * i64::from(l.quantity))
                .sum();
            let decimal_total: Decimal = lines
                .iter()
                .map(|(cents, qty)| Decimal::new(i64::from(*cents), 2) * Decimal::from(*qty))
                .sum();

            prop_assert_eq!(cart.total_minor(), gateway_charge);
            prop_assert_eq!(cart.total_amount(), decimal_total);
        }
    }
}
