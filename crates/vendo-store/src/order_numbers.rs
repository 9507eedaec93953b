//! Order number generation.
//!
//! Numbers are sequential and strictly increasing: one more than the
//! highest number on record, never below the configured minimum. Orders
//! from a legacy numbering scheme carry their number as a numeric
//! suffix in a `title` metadata field; those count towards the highest
//! when no explicitly numbered order exists yet.

use vendo_commerce::checkout::Order;

/// Compute the next order number given every order on record.
pub fn next_order_number<'a>(
    orders: impl Iterator<Item = &'a Order>,
    minimum: u64,
) -> u64 {
    let mut highest: Option<u64> = None;
    let mut legacy_highest: Option<u64> = None;

    for order in orders {
        match order.order_number() {
            Some(number) => highest = Some(highest.map_or(number, |h| h.max(number))),
            None => {
                if let Some(number) = legacy_title_number(order) {
                    legacy_highest = Some(legacy_highest.map_or(number, |h| h.max(number)));
                }
            }
        }
    }

    match highest.or(legacy_highest) {
        Some(h) => (h + 1).max(minimum),
        None => minimum,
    }
}

/// Parse the numeric suffix out of a legacy order title
/// (e.g., "Order #2345" -> 2345).
fn legacy_title_number(order: &Order) -> Option<u64> {
    let title = order.metadata.get("title")?.as_str()?;
    let digits: Vec<char> = title
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.iter().rev().collect::<String>().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendo_commerce::cart::Cart;
    use vendo_commerce::money::Currency;

    fn unnumbered_order() -> Order {
        Order::from_cart(&Cart::new(Currency::GBP))
    }

    fn numbered_order(number: u64) -> Order {
        let mut order = unnumbered_order();
        order.assign_order_number(number).unwrap();
        order
    }

    fn legacy_order(title: &str) -> Order {
        let mut order = unnumbered_order();
        order.metadata.insert(
            "title".to_string(),
            serde_json::Value::String(title.to_string()),
        );
        order
    }

    #[test]
    fn test_starts_at_minimum() {
        assert_eq!(next_order_number(std::iter::empty(), 1000), 1000);
    }

    #[test]
    fn test_increments_highest() {
        let orders = vec![numbered_order(1000), numbered_order(1004)];
        assert_eq!(next_order_number(orders.iter(), 1000), 1005);
    }

    #[test]
    fn test_legacy_title_fallback() {
        let orders = vec![legacy_order("Order #2345"), legacy_order("Order #2001")];
        assert_eq!(next_order_number(orders.iter(), 1000), 2346);
    }

    #[test]
    fn test_explicit_numbers_beat_legacy_titles() {
        let orders = vec![legacy_order("Order #5000"), numbered_order(1200)];
        assert_eq!(next_order_number(orders.iter(), 1000), 1201);
    }

    #[test]
    fn test_minimum_floors_low_numbers() {
        let orders = vec![numbered_order(5)];
        assert_eq!(next_order_number(orders.iter(), 1000), 1000);
    }

    #[test]
    fn test_titles_without_digits_ignored() {
        let orders = vec![legacy_order("Order"), legacy_order("")];
        assert_eq!(next_order_number(orders.iter(), 1000), 1000);
    }
}
