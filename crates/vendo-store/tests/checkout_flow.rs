//! End-to-end checkout flows over the store backends.

use std::collections::BTreeMap;
use vendo_commerce::prelude::*;
use vendo_store::prelude::*;

/// Test gateway that captures funds unless told to decline.
struct TestGateway {
    decline: bool,
}

impl PaymentGateway for TestGateway {
    fn name(&self) -> &'static str {
        "test"
    }

    fn prepare(&self, _cart: &Cart) -> Result<GatewayResponse, CommerceError> {
        Ok(GatewayResponse::uncaptured())
    }

    fn purchase(
        &self,
        _payload: &BTreeMap<String, serde_json::Value>,
        _cart: &Cart,
    ) -> Result<GatewayResponse, CommerceError> {
        if self.decline {
            return Err(CommerceError::GatewayDeclined("declined".to_string()));
        }
        Ok(GatewayResponse::captured("ch_test"))
    }

    fn refund(&self, order: &Order) -> Result<RefundResult, CommerceError> {
        Ok(RefundResult {
            success: true,
            amount: order.totals.grand_total,
            reference: None,
        })
    }
}

struct Stores {
    products: MemoryProductRepository,
    customers: MemoryCustomerRepository,
    coupons: MemoryCouponRepository,
    carts: Box<dyn CartRepository>,
    orders: Box<dyn OrderRepository>,
    zones: MemoryTaxZoneRepository,
    rates: MemoryTaxRateRepository,
}

fn uk_stores(backend: &StoreBackend) -> Stores {
    Stores {
        products: MemoryProductRepository::new(),
        customers: MemoryCustomerRepository::new(),
        coupons: MemoryCouponRepository::new(),
        carts: cart_repository(backend).unwrap(),
        orders: order_repository(backend, 1000).unwrap(),
        zones: MemoryTaxZoneRepository::with_zones(vec![TaxZone::new(
            "uk",
            "United Kingdom",
            "GB",
        )]),
        rates: MemoryTaxRateRepository::with_rates(vec![TaxRate::new(
            "uk-20", "20% VAT", 20, "uk", "standard",
        )]),
    }
}

fn checkout(
    stores: &Stores,
    shipping: &ShippingResolver,
    gateways: &GatewayRegistry,
    notifier: &LogNotifier,
    config: &CommerceConfig,
    cart_id: &CartId,
    request: &CheckoutRequest,
) -> Result<CheckoutOutcome, CommerceError> {
    CheckoutOrchestrator::new(
        &stores.products,
        &stores.customers,
        &stores.coupons,
        stores.carts.as_ref(),
        stores.orders.as_ref(),
        &stores.zones,
        &stores.rates,
        shipping,
        gateways,
        notifier,
        config,
    )
    .checkout(cart_id, request)
}

fn card_request() -> CheckoutRequest {
    CheckoutRequest {
        name: Some("Joan Doe".to_string()),
        email: Some("joan@example.com".to_string()),
        gateway: Some("test".to_string()),
        coupon: None,
        payment: BTreeMap::new(),
        extra: BTreeMap::new(),
    }
}

fn gb_address() -> Address {
    Address::new("Joan Doe", "1 Test Street", "London", "E1 1AA", "GB")
}

#[test]
fn discounted_taxed_shipped_checkout() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let product_id = stores.products.insert(
        Product::new("Cat Food", Money::new(1000, Currency::GBP))
            .with_tax_category(TaxCategoryId::new("standard"))
            .with_stock(5),
    );
    stores
        .coupons
        .insert(Coupon::percentage("half", "Half Off", 50));

    let shipping = ShippingResolver::new().register(
        "flat",
        FlatRate::new("Flat Rate", Money::new(120, Currency::GBP)),
    );
    let gateways = GatewayRegistry::new().register(TestGateway { decline: false });
    let notifier = LogNotifier;
    let config = CommerceConfig {
        currency: Currency::GBP,
        ..CommerceConfig::default()
    };

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(product_id.clone(), None, 1).unwrap();
    cart.set_billing_address(gb_address());
    cart.set_shipping_address(gb_address());
    cart.set_shipping_method(ShippingMethodId::new("flat"));
    let cart_id = cart.id.clone();
    stores.carts.save(&cart).unwrap();

    let request = CheckoutRequest {
        coupon: Some("half".to_string()),
        ..card_request()
    };
    let outcome = checkout(
        &stores, &shipping, &gateways, &notifier, &config, &cart_id, &request,
    )
    .unwrap();

    let order = &outcome.order;
    assert_eq!(order.status(), OrderStatus::Placed);
    assert_eq!(order.payment_status(), PaymentStatus::Paid);
    assert_eq!(order.order_number(), Some(1000));

    // 1000 - 500 discount = 500; +20% VAT = 600; +120 shipping = 720
    assert_eq!(order.totals.sub_total.amount, 1000);
    assert_eq!(order.totals.discount_total.amount, 500);
    assert_eq!(order.totals.tax_total.amount, 100);
    assert_eq!(order.totals.shipping_total.amount, 120);
    assert_eq!(order.totals.grand_total.amount, 720);

    // Stock committed, coupon redeemed, cart gone
    assert_eq!(stores.products.find(&product_id).unwrap().stock, Some(4));
    assert_eq!(stores.coupons.find_by_code("half").unwrap().redeemed, 1);
    assert!(stores.carts.find(&cart_id).is_none());

    // Order landed in the store with the customer attached
    let persisted = stores.orders.find(&order.id).unwrap();
    assert_eq!(persisted.customer, order.customer);
    let customer = stores.customers.find_by_email("joan@example.com").unwrap();
    assert_eq!(customer.orders, vec![order.id.clone()]);
}

#[test]
fn insufficient_stock_prunes_and_retry_succeeds() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let scarce = stores.products.insert(
        Product::new("Rare Thing", Money::new(5000, Currency::GBP)).with_stock(1),
    );
    let plentiful = stores
        .products
        .insert(Product::new("Common Thing", Money::new(1000, Currency::GBP)));

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new().register(TestGateway { decline: false });
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(scarce.clone(), None, 2).unwrap();
    cart.add_item(plentiful.clone(), None, 1).unwrap();
    let cart_id = cart.id.clone();
    stores.carts.save(&cart).unwrap();

    let err = checkout(
        &stores,
        &shipping,
        &gateways,
        &notifier,
        &config,
        &cart_id,
        &card_request(),
    )
    .unwrap_err();
    assert!(matches!(err, CommerceError::InsufficientStock { .. }));
    assert!(err.is_recoverable());

    // Cart survives with the offending item stripped; retry succeeds
    let pruned = stores.carts.find(&cart_id).unwrap();
    assert_eq!(pruned.items.len(), 1);
    assert_eq!(pruned.items[0].product_id, plentiful);

    let outcome = checkout(
        &stores,
        &shipping,
        &gateways,
        &notifier,
        &config,
        &cart_id,
        &card_request(),
    )
    .unwrap();
    assert_eq!(outcome.order.totals.grand_total.amount, 1000);
    // The untouched scarce product still has its unit
    assert_eq!(stores.products.find(&scarce).unwrap().stock, Some(1));
}

#[test]
fn two_buyers_one_unit_exactly_one_succeeds() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let product_id = stores.products.insert(
        Product::new("Last One", Money::new(2500, Currency::GBP)).with_stock(1),
    );

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new().register(TestGateway { decline: false });
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut outcomes = Vec::new();
    for email in ["first@example.com", "second@example.com"] {
        let mut cart = Cart::new(Currency::GBP);
        cart.add_item(product_id.clone(), None, 1).unwrap();
        let cart_id = cart.id.clone();
        stores.carts.save(&cart).unwrap();

        let request = CheckoutRequest {
            email: Some(email.to_string()),
            ..card_request()
        };
        outcomes.push(checkout(
            &stores, &shipping, &gateways, &notifier, &config, &cart_id, &request,
        ));
    }

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(matches!(
        outcomes[1],
        Err(CommerceError::InsufficientStock { .. })
    ));
    // Final stock exactly zero, never negative
    assert_eq!(stores.products.find(&product_id).unwrap().stock, Some(0));
}

#[test]
fn zero_total_checkout_needs_no_gateway() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let product_id = stores
        .products
        .insert(Product::new("Freebie", Money::new(800, Currency::GBP)));
    stores
        .coupons
        .insert(Coupon::percentage("free", "Free", 100));

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new();
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(product_id, None, 1).unwrap();
    let cart_id = cart.id.clone();
    stores.carts.save(&cart).unwrap();

    let request = CheckoutRequest {
        gateway: None,
        coupon: Some("free".to_string()),
        ..card_request()
    };
    let outcome = checkout(
        &stores, &shipping, &gateways, &notifier, &config, &cart_id, &request,
    )
    .unwrap();

    assert!(outcome.order.totals.grand_total.is_zero());
    assert_eq!(outcome.order.payment_status(), PaymentStatus::Paid);
}

#[test]
fn declined_payment_leaves_everything_untouched() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let product_id = stores.products.insert(
        Product::new("Cat Food", Money::new(1000, Currency::GBP)).with_stock(3),
    );

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new().register(TestGateway { decline: true });
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(product_id.clone(), None, 1).unwrap();
    let cart_id = cart.id.clone();
    stores.carts.save(&cart).unwrap();

    let err = checkout(
        &stores,
        &shipping,
        &gateways,
        &notifier,
        &config,
        &cart_id,
        &card_request(),
    )
    .unwrap_err();
    assert!(matches!(err, CommerceError::GatewayDeclined(_)));

    assert_eq!(stores.products.find(&product_id).unwrap().stock, Some(3));
    assert!(stores.carts.find(&cart_id).is_some());
}

#[test]
fn file_backed_checkout_round_trips() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let backend = StoreBackend::JsonFile {
        dir: tmp.path().to_path_buf(),
    };
    let stores = uk_stores(&backend);
    let product_id = stores.products.insert(
        Product::new("Cat Food", Money::new(1000, Currency::GBP))
            .with_tax_category(TaxCategoryId::new("standard")),
    );

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new().register(TestGateway { decline: false });
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(product_id, None, 2).unwrap();
    cart.set_billing_address(gb_address());
    let cart_id = cart.id.clone();
    stores.carts.save(&cart).unwrap();

    let outcome = checkout(
        &stores,
        &shipping,
        &gateways,
        &notifier,
        &config,
        &cart_id,
        &card_request(),
    )?;

    // 2000 + 20% VAT
    assert_eq!(outcome.order.totals.grand_total.amount, 2400);

    // The order is on disk; the cart document is gone
    let loaded = stores.orders.find(&outcome.order.id).unwrap();
    assert_eq!(loaded, outcome.order);
    assert!(stores.carts.find(&cart_id).is_none());
    Ok(())
}

#[test]
fn order_numbers_increase_across_checkouts() {
    let backend = StoreBackend::Memory;
    let stores = uk_stores(&backend);
    let product_id = stores
        .products
        .insert(Product::new("Cat Food", Money::new(1000, Currency::GBP)));

    let shipping = ShippingResolver::new();
    let gateways = GatewayRegistry::new().register(TestGateway { decline: false });
    let notifier = LogNotifier;
    let config = CommerceConfig::default();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let mut cart = Cart::new(Currency::GBP);
        cart.add_item(product_id.clone(), None, 1).unwrap();
        let cart_id = cart.id.clone();
        stores.carts.save(&cart).unwrap();

        let outcome = checkout(
            &stores,
            &shipping,
            &gateways,
            &notifier,
            &config,
            &cart_id,
            &card_request(),
        )
        .unwrap();
        numbers.push(outcome.order.order_number().unwrap());
    }

    assert_eq!(numbers, vec![1000, 1001, 1002]);
}

#[test]
fn persisted_order_document_is_flat() {
    let tmp = tempfile::tempdir().unwrap();
    let orders = JsonFileOrderRepository::new(tmp.path(), 1000).unwrap();

    let mut cart = Cart::new(Currency::GBP);
    cart.add_item(ProductId::new("prod-1"), None, 1).unwrap();
    let mut order = Order::from_cart(&cart);
    orders.save(&mut order).unwrap();

    let raw = std::fs::read_to_string(
        tmp.path().join(format!("{}.json", order.id)),
    )
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    // Totals are flattened onto the document root, amounts as integers
    for field in [
        "grand_total",
        "sub_total",
        "discount_total",
        "tax_total",
        "shipping_total",
    ] {
        assert!(json[field]["amount"].is_i64(), "missing {field}");
    }
    assert!(json["id"].is_string());
    assert_eq!(json["status"], "cart");
    assert_eq!(json["order_number"], 1000);
    assert!(json["line_items"].is_array());
}
