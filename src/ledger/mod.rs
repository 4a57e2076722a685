//! Mirrored driver/restaurant ledger reconciler.
//!
//! Every driver/restaurant pair carries two halves of the same balance:
//! `driver.restaurant_ledger[restaurant_id]` and
//! `restaurant.driver_ledger[driver_id]`. All mutations here run inside
//! `AppState::ledger_lock` and touch both halves together; the pair is
//! checked for agreement before any write and divergence aborts with
//! `LedgerInconsistency` rather than being silently repaired.

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::Order;
use crate::models::parcel::Parcel;
use crate::state::AppState;

/// Driver collected cash or a card payment from the customer at handoff.
/// The driver now owes the restaurant the food total, and the delivery fee
/// is theirs to keep.
pub fn credit_on_cash_collection(state: &AppState, order: &Order) -> Result<(), AppError> {
    let driver_id = assigned_driver(order)?;
    credit_pair(state, driver_id, order.restaurant_id, order.food_total)?;
    record_earning(state, driver_id, order.id, order.delivery_fee)
}

/// Customer paid the driver out of band (PayShap) and the driver
/// acknowledged receipt. Same debt to the restaurant, but earnings wait
/// until the delivery actually completes.
pub fn credit_on_prepaid_confirmation(state: &AppState, order: &Order) -> Result<(), AppError> {
    let driver_id = assigned_driver(order)?;
    credit_pair(state, driver_id, order.restaurant_id, order.food_total)
}

/// Prepaid path only: the earnings entry deferred by
/// [`credit_on_prepaid_confirmation`] lands when the order is delivered.
pub fn record_order_earnings(state: &AppState, order: &Order) -> Result<(), AppError> {
    let driver_id = assigned_driver(order)?;
    record_earning(state, driver_id, order.id, order.delivery_fee)
}

/// Parcel margin is the spread between what the customer paid and what the
/// driver advanced for the goods, recorded once on delivery.
pub fn record_parcel_earnings(state: &AppState, parcel: &Parcel) -> Result<(), AppError> {
    let driver_id = parcel
        .driver_id
        .ok_or_else(|| AppError::Internal(format!("parcel {} has no driver", parcel.id)))?;
    let total = parcel
        .total
        .ok_or_else(|| AppError::Internal(format!("parcel {} has no total", parcel.id)))?;
    let goods_cost = parcel.goods_cost.unwrap_or(Decimal::ZERO);

    record_earning(state, driver_id, parcel.id, total - goods_cost)
}

/// Zero out the balance between one restaurant and one driver, removing
/// the entry from both sides. Idempotent: an absent pair is a no-op.
pub fn settle(state: &AppState, restaurant_id: Uuid, driver_id: Uuid) -> Result<(), AppError> {
    let _guard = state
        .ledger_lock
        .lock()
        .map_err(|_| AppError::Internal("ledger lock poisoned".to_string()))?;

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
    let mut restaurant = state
        .restaurants
        .get_mut(&restaurant_id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))?;

    check_pair_agrees(&driver.restaurant_ledger, &restaurant.driver_ledger, restaurant_id, driver_id)?;

    let owed = driver.restaurant_ledger.remove(&restaurant_id);
    restaurant.driver_ledger.remove(&driver_id);

    if let Some(owed) = owed {
        info!(%restaurant_id, %driver_id, %owed, "ledger pair settled");
    }

    Ok(())
}

fn assigned_driver(order: &Order) -> Result<Uuid, AppError> {
    order
        .driver_id
        .ok_or_else(|| AppError::Internal(format!("order {} has no driver", order.id)))
}

fn credit_pair(
    state: &AppState,
    driver_id: Uuid,
    restaurant_id: Uuid,
    amount: Decimal,
) -> Result<(), AppError> {
    let _guard = state
        .ledger_lock
        .lock()
        .map_err(|_| AppError::Internal("ledger lock poisoned".to_string()))?;

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
    let mut restaurant = state
        .restaurants
        .get_mut(&restaurant_id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))?;

    check_pair_agrees(&driver.restaurant_ledger, &restaurant.driver_ledger, restaurant_id, driver_id)?;

    *driver
        .restaurant_ledger
        .entry(restaurant_id)
        .or_insert(Decimal::ZERO) += amount;
    *restaurant
        .driver_ledger
        .entry(driver_id)
        .or_insert(Decimal::ZERO) += amount;

    info!(%driver_id, %restaurant_id, %amount, "ledger pair credited");
    Ok(())
}

/// Earnings are append-only and keyed by job id, so each delivered job
/// lands exactly once no matter which payment path produced it.
fn record_earning(
    state: &AppState,
    driver_id: Uuid,
    job_id: Uuid,
    amount: Decimal,
) -> Result<(), AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if driver.earnings.contains_key(&job_id) {
        return Ok(());
    }

    driver.earnings.insert(job_id, amount);
    info!(%driver_id, %job_id, %amount, "earnings recorded");
    Ok(())
}

pub(crate) fn check_pair_agrees(
    driver_side: &std::collections::HashMap<Uuid, Decimal>,
    restaurant_side: &std::collections::HashMap<Uuid, Decimal>,
    restaurant_id: Uuid,
    driver_id: Uuid,
) -> Result<(), AppError> {
    let owed_by_driver = driver_side.get(&restaurant_id).copied().unwrap_or(Decimal::ZERO);
    let owed_to_restaurant = restaurant_side.get(&driver_id).copied().unwrap_or(Decimal::ZERO);

    if owed_by_driver != owed_to_restaurant {
        return Err(AppError::LedgerInconsistency(format!(
            "driver {driver_id} records {owed_by_driver} owed to restaurant {restaurant_id}, \
             restaurant records {owed_to_restaurant}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::models::PaymentMethod;
    use crate::models::driver::Driver;
    use crate::models::order::{Order, OrderStatus};
    use crate::models::parcel::{Parcel, ParcelStatus};
    use crate::models::restaurant::Restaurant;
    use crate::state::AppState;

    fn seed_pair(state: &AppState) -> (Uuid, Uuid) {
        let driver_id = Uuid::new_v4();
        let restaurant_id = Uuid::new_v4();

        state.drivers.insert(
            driver_id,
            Driver {
                id: driver_id,
                name: "Thabo".to_string(),
                contact: "thabo@example.test".to_string(),
                device_token: None,
                accepted_payment_methods: vec![PaymentMethod::CashOnDelivery],
                base_fee: Decimal::ZERO,
                fees: HashMap::new(),
                delivery_areas: HashMap::new(),
                earnings: HashMap::new(),
                restaurant_ledger: HashMap::new(),
                reviews: Vec::new(),
                rating: 0.0,
            },
        );
        state.restaurants.insert(
            restaurant_id,
            Restaurant {
                id: restaurant_id,
                name: "Mama's Kitchen".to_string(),
                address: "Somerset: 1 Main Rd".to_string(),
                contact: "mamas@example.test".to_string(),
                menu: Vec::new(),
                driver_ledger: HashMap::new(),
                reviews: Vec::new(),
                rating: 0.0,
            },
        );

        (driver_id, restaurant_id)
    }

    fn delivered_order(driver_id: Uuid, restaurant_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            restaurant_id,
            driver_id: Some(driver_id),
            items: Vec::new(),
            status: OrderStatus::Delivered,
            food_total: dec!(100),
            delivery_fee: dec!(25),
            total: dec!(125),
            payment_method: Some(PaymentMethod::CashOnDelivery),
            customer_address: "Somerset: 12 Oak Rd".to_string(),
            restaurant_address: "Somerset: 1 Main Rd".to_string(),
            created_at: Utc::now(),
            is_driver_reviewed: false,
            is_restaurant_reviewed: false,
        }
    }

    fn both_sides(state: &AppState, driver_id: Uuid, restaurant_id: Uuid) -> (Option<Decimal>, Option<Decimal>) {
        let driver_side = state
            .drivers
            .get(&driver_id)
            .unwrap()
            .restaurant_ledger
            .get(&restaurant_id)
            .copied();
        let restaurant_side = state
            .restaurants
            .get(&restaurant_id)
            .unwrap()
            .driver_ledger
            .get(&driver_id)
            .copied();
        (driver_side, restaurant_side)
    }

    #[test]
    fn cash_collection_credits_both_halves_and_earnings() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);
        let order = delivered_order(driver_id, restaurant_id);

        credit_on_cash_collection(&state, &order).unwrap();

        let (driver_side, restaurant_side) = both_sides(&state, driver_id, restaurant_id);
        assert_eq!(driver_side, Some(dec!(100)));
        assert_eq!(restaurant_side, Some(dec!(100)));

        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.get(&order.id), Some(&dec!(25)));
    }

    #[test]
    fn prepaid_confirmation_defers_earnings_until_delivery() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);
        let order = delivered_order(driver_id, restaurant_id);

        credit_on_prepaid_confirmation(&state, &order).unwrap();

        {
            let driver = state.drivers.get(&driver_id).unwrap();
            assert!(driver.earnings.is_empty());
            assert_eq!(driver.restaurant_ledger.get(&restaurant_id), Some(&dec!(100)));
        }

        record_order_earnings(&state, &order).unwrap();

        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.get(&order.id), Some(&dec!(25)));
    }

    #[test]
    fn earnings_land_exactly_once_per_job() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);
        let order = delivered_order(driver_id, restaurant_id);

        record_order_earnings(&state, &order).unwrap();
        record_order_earnings(&state, &order).unwrap();

        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.len(), 1);
        assert_eq!(driver.earnings.get(&order.id), Some(&dec!(25)));
    }

    #[test]
    fn halves_stay_mirrored_across_credit_and_settle_sequences() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);

        let first = delivered_order(driver_id, restaurant_id);
        let second = delivered_order(driver_id, restaurant_id);

        credit_on_cash_collection(&state, &first).unwrap();
        credit_on_prepaid_confirmation(&state, &second).unwrap();

        let (driver_side, restaurant_side) = both_sides(&state, driver_id, restaurant_id);
        assert_eq!(driver_side, restaurant_side);
        assert_eq!(driver_side, Some(dec!(200)));

        settle(&state, restaurant_id, driver_id).unwrap();

        let (driver_side, restaurant_side) = both_sides(&state, driver_id, restaurant_id);
        assert_eq!(driver_side, None);
        assert_eq!(restaurant_side, None);
    }

    #[test]
    fn settle_with_no_balance_is_a_no_op() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);

        settle(&state, restaurant_id, driver_id).unwrap();

        let (driver_side, restaurant_side) = both_sides(&state, driver_id, restaurant_id);
        assert_eq!(driver_side, None);
        assert_eq!(restaurant_side, None);
    }

    #[test]
    fn divergent_halves_surface_loudly() {
        let state = AppState::new(16);
        let (driver_id, restaurant_id) = seed_pair(&state);

        state
            .drivers
            .get_mut(&driver_id)
            .unwrap()
            .restaurant_ledger
            .insert(restaurant_id, dec!(50));

        let order = delivered_order(driver_id, restaurant_id);
        let err = credit_on_cash_collection(&state, &order).unwrap_err();
        assert!(matches!(err, AppError::LedgerInconsistency(_)));

        let err = settle(&state, restaurant_id, driver_id).unwrap_err();
        assert!(matches!(err, AppError::LedgerInconsistency(_)));
    }

    #[test]
    fn zero_goods_cost_parcel_earns_full_delivery_fee() {
        let state = AppState::new(16);
        let (driver_id, _) = seed_pair(&state);

        let parcel = Parcel {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: Some(driver_id),
            pickup_address: "Strand: 4 Beach Rd".to_string(),
            dropoff_address: "Somerset: 12 Oak Rd".to_string(),
            items: Vec::new(),
            status: ParcelStatus::Delivered,
            delivery_fee: dec!(20),
            goods_cost: Some(dec!(0)),
            payment_method: Some(PaymentMethod::CashOnDelivery),
            total: Some(dec!(20)),
            created_at: Utc::now(),
        };

        record_parcel_earnings(&state, &parcel).unwrap();

        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.get(&parcel.id), Some(&dec!(20)));
    }

    #[test]
    fn parcel_earning_is_total_minus_goods_cost() {
        let state = AppState::new(16);
        let (driver_id, _) = seed_pair(&state);

        let parcel = Parcel {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: Some(driver_id),
            pickup_address: "Strand: 4 Beach Rd".to_string(),
            dropoff_address: "Somerset: 12 Oak Rd".to_string(),
            items: Vec::new(),
            status: ParcelStatus::Delivered,
            delivery_fee: dec!(30),
            goods_cost: Some(dec!(150)),
            payment_method: Some(PaymentMethod::PayShap),
            total: Some(dec!(180)),
            created_at: Utc::now(),
        };

        record_parcel_earnings(&state, &parcel).unwrap();

        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.get(&parcel.id), Some(&dec!(30)));
    }
}
