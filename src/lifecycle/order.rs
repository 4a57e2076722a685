use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::fees;
use crate::ledger;
use crate::models::event::StatusChanged;
use crate::models::order::{MenuItem, Order, OrderStatus};
use crate::models::review::{Review, average_rating};
use crate::models::{PaymentMethod, Role};
use crate::state::AppState;

/// The canonical advance table: which role moves an order out of `from`
/// via the generic advance command, and where it lands. Assignment,
/// acceptance, payment-method choice, and the PayShap handshake have their
/// own commands and do not appear here.
pub fn advance_rule(
    from: OrderStatus,
    method: Option<PaymentMethod>,
) -> Option<(OrderStatus, Role)> {
    match (from, method) {
        (OrderStatus::AcceptedByRestaurant, _) => {
            Some((OrderStatus::PendingDriverAssignment, Role::Restaurant))
        }
        // The cash branch is walked physically by the driver. PayShap
        // orders leave DriverAssigned through the payment handshake.
        (OrderStatus::DriverAssigned, Some(m)) if !m.is_prepaid() => {
            Some((OrderStatus::AtRestaurant, Role::Driver))
        }
        (OrderStatus::AtRestaurant, _) => Some((OrderStatus::InTransit, Role::Driver)),
        (OrderStatus::InTransit, Some(m)) if !m.is_prepaid() => {
            Some((OrderStatus::AtDropoff, Role::Driver))
        }
        // PayShap skips the dropoff stage: payment already changed hands.
        (OrderStatus::InTransit, Some(PaymentMethod::PayShap)) => {
            Some((OrderStatus::Delivered, Role::Driver))
        }
        (OrderStatus::AtDropoff, _) => Some((OrderStatus::Delivered, Role::Driver)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    /// Defaults to the customer's registered address.
    pub customer_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReviewTarget {
    Driver,
    Restaurant,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub target: ReviewTarget,
    pub rating: u8,
    pub comment: String,
}

pub fn place_order(state: &AppState, req: PlaceOrderRequest) -> Result<Order, AppError> {
    if req.items.is_empty() {
        return Err(AppError::Validation("order must contain at least one item".to_string()));
    }

    // Snapshot what the order needs and release each party guard before
    // touching the orders store. Holding a party read lock across the
    // insert inverts the orders-then-parties lock order the status
    // commands use, which can deadlock against a concurrent delivery.
    let registered_address = {
        let customer = state
            .customers
            .get(&req.customer_id)
            .ok_or_else(|| AppError::NotFound(format!("customer {} not found", req.customer_id)))?;
        customer.address.clone()
    };

    let customer_address = match req.customer_address {
        Some(address) if !address.trim().is_empty() => address,
        Some(_) => {
            return Err(AppError::Validation("customer address cannot be empty".to_string()));
        }
        None => registered_address,
    };

    let (items, restaurant_address) = {
        let restaurant = state
            .restaurants
            .get(&req.restaurant_id)
            .ok_or_else(|| AppError::NotFound(format!("restaurant {} not found", req.restaurant_id)))?;

        let mut items = Vec::with_capacity(req.items.len());
        for requested in &req.items {
            if requested.quantity == 0 {
                return Err(AppError::Validation(format!(
                    "quantity for '{}' must be at least 1",
                    requested.name
                )));
            }

            let menu_item = restaurant
                .menu
                .iter()
                .find(|item| item.name == requested.name)
                .ok_or_else(|| {
                    AppError::Validation(format!("'{}' is not on the menu", requested.name))
                })?;

            items.push(MenuItem {
                name: menu_item.name.clone(),
                price: menu_item.price,
                quantity: requested.quantity,
            });
        }

        (items, restaurant.address.clone())
    };

    let food_total = Order::food_total_of(&items);
    let order = Order {
        id: Uuid::new_v4(),
        customer_id: req.customer_id,
        restaurant_id: req.restaurant_id,
        driver_id: None,
        items,
        status: OrderStatus::PendingConfirmation,
        food_total,
        delivery_fee: Decimal::ZERO,
        total: food_total,
        payment_method: None,
        customer_address,
        restaurant_address,
        created_at: Utc::now(),
        is_driver_reviewed: false,
        is_restaurant_reviewed: false,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_active.inc();
    info!(order_id = %order.id, restaurant_id = %order.restaurant_id, %food_total, "order placed");

    Ok(order)
}

pub fn accept_order(state: &AppState, order_id: Uuid, restaurant_id: Uuid) -> Result<Order, AppError> {
    let mut order = get_order_mut(state, order_id)?;

    if order.restaurant_id != restaurant_id {
        return Err(AppError::InvalidTransition(
            "only the order's restaurant may accept it".to_string(),
        ));
    }
    if order.status != OrderStatus::PendingConfirmation {
        return Err(AppError::InvalidTransition(format!(
            "cannot accept an order that is {}",
            order.status.display_text()
        )));
    }

    commit_status(state, &mut order, OrderStatus::AcceptedByRestaurant);
    Ok(order.clone())
}

/// Compare-and-set claim: the store's entry lock serializes racing drivers,
/// and both the status and the unset driver_id are re-checked under it.
pub fn assign_driver(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    if !state.drivers.contains_key(&driver_id) {
        return Err(AppError::NotFound(format!("driver {driver_id} not found")));
    }

    let mut order = get_order_mut(state, order_id)?;

    if order.driver_id.is_some() {
        return Err(AppError::InvalidTransition(
            "order already has a driver assigned".to_string(),
        ));
    }
    if order.status != OrderStatus::PendingDriverAssignment {
        return Err(AppError::InvalidTransition(format!(
            "cannot claim an order that is {}",
            order.status.display_text()
        )));
    }

    order.driver_id = Some(driver_id);
    commit_status(state, &mut order, OrderStatus::DriverAssigned);
    Ok(order.clone())
}

pub fn choose_payment_method(
    state: &AppState,
    order_id: Uuid,
    customer_id: Uuid,
    method: PaymentMethod,
) -> Result<Order, AppError> {
    let mut order = get_order_mut(state, order_id)?;

    if order.customer_id != customer_id {
        return Err(AppError::InvalidTransition(
            "only the order's customer may choose the payment method".to_string(),
        ));
    }
    if order.status != OrderStatus::DriverAssigned {
        return Err(AppError::InvalidTransition(format!(
            "payment method cannot be chosen while the order is {}",
            order.status.display_text()
        )));
    }
    if order.payment_method.is_some() {
        return Err(AppError::InvalidTransition(
            "payment method already chosen".to_string(),
        ));
    }

    let driver_id = order
        .driver_id
        .ok_or_else(|| AppError::Internal(format!("order {order_id} has no driver")))?;
    let driver = state
        .drivers
        .get(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if !driver.accepted_payment_methods.contains(&method) {
        return Err(AppError::Validation(
            "driver does not accept this payment method".to_string(),
        ));
    }

    let breakdown = fees::quote(order.food_total, &order.customer_address, &driver, Some(method));
    drop(driver);

    order.payment_method = Some(method);
    order.delivery_fee = breakdown.delivery_fee;
    order.total = breakdown.total;

    // PayShap moves straight into the payment handshake; cash and
    // Speedpoint wait for the driver to reach the restaurant.
    if method.is_prepaid() {
        commit_status(state, &mut order, OrderStatus::PendingPayment);
    } else {
        info!(order_id = %order.id, ?method, delivery_fee = %order.delivery_fee, "payment method chosen");
    }

    Ok(order.clone())
}

/// Customer-side half of the PayShap handshake: "I Have Paid".
pub fn confirm_payment_sent(
    state: &AppState,
    order_id: Uuid,
    customer_id: Uuid,
) -> Result<Order, AppError> {
    let mut order = get_order_mut(state, order_id)?;

    if order.customer_id != customer_id {
        return Err(AppError::InvalidTransition(
            "only the order's customer may confirm payment".to_string(),
        ));
    }
    if order.status != OrderStatus::PendingPayment {
        return Err(AppError::InvalidTransition(format!(
            "payment cannot be confirmed while the order is {}",
            order.status.display_text()
        )));
    }

    commit_status(state, &mut order, OrderStatus::AwaitingDriverConfirmation);
    Ok(order.clone())
}

/// Driver-side half of the PayShap handshake: "Acknowledge Payment". This
/// is the prepaid ledger credit point; earnings wait for delivery.
pub fn acknowledge_payment(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
) -> Result<Order, AppError> {
    let mut order = get_order_mut(state, order_id)?;

    if order.driver_id != Some(driver_id) {
        return Err(AppError::InvalidTransition(
            "only the assigned driver may acknowledge payment".to_string(),
        ));
    }
    if order.status != OrderStatus::AwaitingDriverConfirmation {
        return Err(AppError::InvalidTransition(format!(
            "payment cannot be acknowledged while the order is {}",
            order.status.display_text()
        )));
    }

    ledger::credit_on_prepaid_confirmation(state, &order)?;
    commit_status(state, &mut order, OrderStatus::AtRestaurant);
    Ok(order.clone())
}

pub fn advance_status(
    state: &AppState,
    order_id: Uuid,
    actor_id: Uuid,
    role: Role,
) -> Result<Order, AppError> {
    let mut order = get_order_mut(state, order_id)?;

    let (next, required_role) =
        advance_rule(order.status, order.payment_method).ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "order cannot be advanced from {}",
                order.status.display_text()
            ))
        })?;

    if role != required_role {
        return Err(AppError::InvalidTransition(format!(
            "only the {required_role} may advance this order"
        )));
    }
    let actor_matches = match required_role {
        Role::Driver => order.driver_id == Some(actor_id),
        Role::Restaurant => order.restaurant_id == actor_id,
        Role::Customer => order.customer_id == actor_id,
    };
    if !actor_matches {
        return Err(AppError::InvalidTransition(format!(
            "caller is not the {required_role} for this order"
        )));
    }

    // Ledger effects apply before the status commit so a ledger failure
    // aborts the whole command.
    if next == OrderStatus::Delivered {
        match order.payment_method {
            Some(m) if m.is_prepaid() => ledger::record_order_earnings(state, &order)?,
            Some(_) => ledger::credit_on_cash_collection(state, &order)?,
            None => {
                return Err(AppError::Internal(format!(
                    "order {order_id} reached delivery without a payment method"
                )));
            }
        }
        state.metrics.orders_active.dec();
    }

    commit_status(state, &mut order, next);
    Ok(order.clone())
}

pub fn submit_review(
    state: &AppState,
    order_id: Uuid,
    req: SubmitReviewRequest,
) -> Result<Review, AppError> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".to_string()));
    }

    let mut order = get_order_mut(state, order_id)?;

    if order.customer_id != req.customer_id {
        return Err(AppError::InvalidTransition(
            "only the order's customer may review it".to_string(),
        ));
    }
    if order.status != OrderStatus::Delivered {
        return Err(AppError::InvalidTransition(
            "reviews are only possible once the order is delivered".to_string(),
        ));
    }

    let already = match req.target {
        ReviewTarget::Driver => order.is_driver_reviewed,
        ReviewTarget::Restaurant => order.is_restaurant_reviewed,
    };
    if already {
        return Err(AppError::AlreadyReviewed);
    }

    let review = Review {
        id: Uuid::new_v4(),
        order_id,
        customer_id: req.customer_id,
        customer_name: req.customer_name,
        rating: req.rating,
        comment: req.comment,
    };

    // Append and the cached average move in the same entry-locked write.
    match req.target {
        ReviewTarget::Driver => {
            let driver_id = order
                .driver_id
                .ok_or_else(|| AppError::Internal(format!("order {order_id} has no driver")))?;
            let mut driver = state
                .drivers
                .get_mut(&driver_id)
                .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
            driver.reviews.push(review.clone());
            driver.rating = average_rating(&driver.reviews);
            order.is_driver_reviewed = true;
        }
        ReviewTarget::Restaurant => {
            let mut restaurant = state.restaurants.get_mut(&order.restaurant_id).ok_or_else(|| {
                AppError::NotFound(format!("restaurant {} not found", order.restaurant_id))
            })?;
            restaurant.reviews.push(review.clone());
            restaurant.rating = average_rating(&restaurant.reviews);
            order.is_restaurant_reviewed = true;
        }
    }

    info!(order_id = %order_id, rating = review.rating, "review submitted");
    Ok(review)
}

fn get_order_mut<'a>(
    state: &'a AppState,
    order_id: Uuid,
) -> Result<dashmap::mapref::one::RefMut<'a, Uuid, Order>, AppError> {
    state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

fn commit_status(state: &AppState, order: &mut Order, next: OrderStatus) {
    let old_status = order.status;
    order.status = next;

    state
        .metrics
        .transitions_total
        .with_label_values(&["order"])
        .inc();
    state.emit(StatusChanged::Order {
        id: order.id,
        old_status,
        new_status: next,
    });

    info!(
        order_id = %order.id,
        from = old_status.display_text(),
        to = next.display_text(),
        "order status changed"
    );
}
