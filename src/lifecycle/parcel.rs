use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::fees;
use crate::ledger;
use crate::models::event::StatusChanged;
use crate::models::parcel::{Parcel, ParcelItem, ParcelStatus};
use crate::models::{PaymentMethod, Role};
use crate::state::AppState;

/// Plain advance edges for parcels. Leaving the pickup point is gated
/// separately in [`advance_status`] so the caller gets a specific reason
/// when the goods cost or payment method is still missing.
pub fn advance_rule(
    from: ParcelStatus,
    method: Option<PaymentMethod>,
) -> Option<(ParcelStatus, Role)> {
    match (from, method) {
        (ParcelStatus::DriverAssigned, _) => Some((ParcelStatus::AtPickup, Role::Driver)),
        (ParcelStatus::AtPickup, Some(m)) if !m.is_prepaid() => {
            Some((ParcelStatus::InTransit, Role::Driver))
        }
        (ParcelStatus::InTransit, _) => Some((ParcelStatus::AtDropoff, Role::Driver)),
        (ParcelStatus::AtDropoff, _) => Some((ParcelStatus::Delivered, Role::Driver)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct RequestParcelRequest {
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub items: Vec<ParcelItem>,
}

pub fn request_parcel(state: &AppState, req: RequestParcelRequest) -> Result<Parcel, AppError> {
    if req.pickup_address.trim().is_empty() {
        return Err(AppError::Validation("pickup address is required".to_string()));
    }
    if req.dropoff_address.trim().is_empty() {
        return Err(AppError::Validation("dropoff address is required".to_string()));
    }
    if req.items.is_empty() {
        return Err(AppError::Validation("parcel must contain at least one item".to_string()));
    }
    if !state.customers.contains_key(&req.customer_id) {
        return Err(AppError::NotFound(format!("customer {} not found", req.customer_id)));
    }

    let parcel = Parcel {
        id: Uuid::new_v4(),
        customer_id: req.customer_id,
        driver_id: None,
        pickup_address: req.pickup_address,
        dropoff_address: req.dropoff_address,
        items: req.items,
        status: ParcelStatus::PendingDriverAssignment,
        delivery_fee: Decimal::ZERO,
        goods_cost: None,
        payment_method: None,
        total: None,
        created_at: Utc::now(),
    };

    state.parcels.insert(parcel.id, parcel.clone());
    state.metrics.parcels_active.inc();
    info!(parcel_id = %parcel.id, "parcel requested");

    Ok(parcel)
}

/// Same compare-and-set claim as orders: status and unset driver_id are
/// both re-checked under the entry lock.
pub fn assign_driver(state: &AppState, parcel_id: Uuid, driver_id: Uuid) -> Result<Parcel, AppError> {
    if !state.drivers.contains_key(&driver_id) {
        return Err(AppError::NotFound(format!("driver {driver_id} not found")));
    }

    let mut parcel = get_parcel_mut(state, parcel_id)?;

    if parcel.driver_id.is_some() {
        return Err(AppError::InvalidTransition(
            "parcel already has a driver assigned".to_string(),
        ));
    }
    if parcel.status != ParcelStatus::PendingDriverAssignment {
        return Err(AppError::InvalidTransition(format!(
            "cannot claim a parcel that is {}",
            parcel.status.display_text()
        )));
    }

    parcel.driver_id = Some(driver_id);
    commit_status(state, &mut parcel, ParcelStatus::DriverAssigned);
    Ok(parcel.clone())
}

/// The goods-cost gate: cash the driver fronts for purchased goods, entered
/// at the pickup point before the parcel may leave it. Zero is a valid
/// pure-courier job.
pub fn set_goods_cost(
    state: &AppState,
    parcel_id: Uuid,
    driver_id: Uuid,
    goods_cost: Decimal,
) -> Result<Parcel, AppError> {
    if goods_cost < Decimal::ZERO {
        return Err(AppError::Validation("goods cost cannot be negative".to_string()));
    }

    let mut parcel = get_parcel_mut(state, parcel_id)?;

    if parcel.driver_id != Some(driver_id) {
        return Err(AppError::InvalidTransition(
            "only the assigned driver may enter the goods cost".to_string(),
        ));
    }
    if parcel.status != ParcelStatus::AtPickup {
        return Err(AppError::InvalidTransition(format!(
            "goods cost can only be entered at the pickup point, parcel is {}",
            parcel.status.display_text()
        )));
    }

    parcel.goods_cost = Some(goods_cost);
    if parcel.payment_method.is_some() {
        parcel.total = Some(goods_cost + parcel.delivery_fee);
    }

    info!(parcel_id = %parcel.id, %goods_cost, "goods cost entered");
    Ok(parcel.clone())
}

pub fn choose_payment_method(
    state: &AppState,
    parcel_id: Uuid,
    customer_id: Uuid,
    method: PaymentMethod,
) -> Result<Parcel, AppError> {
    let mut parcel = get_parcel_mut(state, parcel_id)?;

    if parcel.customer_id != customer_id {
        return Err(AppError::InvalidTransition(
            "only the parcel's customer may choose the payment method".to_string(),
        ));
    }
    if parcel.status != ParcelStatus::AtPickup {
        return Err(AppError::InvalidTransition(format!(
            "payment method cannot be chosen while the parcel is {}",
            parcel.status.display_text()
        )));
    }
    let goods_cost = parcel.goods_cost.ok_or_else(|| {
        AppError::InvalidTransition(
            "goods cost must be entered before a payment method is chosen".to_string(),
        )
    })?;
    if parcel.payment_method.is_some() {
        return Err(AppError::InvalidTransition(
            "payment method already chosen".to_string(),
        ));
    }

    let driver_id = parcel
        .driver_id
        .ok_or_else(|| AppError::Internal(format!("parcel {parcel_id} has no driver")))?;
    let driver = state
        .drivers
        .get(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if !driver.accepted_payment_methods.contains(&method) {
        return Err(AppError::Validation(
            "driver does not accept this payment method".to_string(),
        ));
    }

    let breakdown = fees::quote(goods_cost, &parcel.dropoff_address, &driver, Some(method));
    drop(driver);

    parcel.payment_method = Some(method);
    parcel.delivery_fee = breakdown.delivery_fee;
    parcel.total = Some(breakdown.total);

    if method.is_prepaid() {
        commit_status(state, &mut parcel, ParcelStatus::PendingPayment);
    } else {
        info!(parcel_id = %parcel.id, ?method, delivery_fee = %parcel.delivery_fee, "payment method chosen");
    }

    Ok(parcel.clone())
}

pub fn confirm_payment_sent(
    state: &AppState,
    parcel_id: Uuid,
    customer_id: Uuid,
) -> Result<Parcel, AppError> {
    let mut parcel = get_parcel_mut(state, parcel_id)?;

    if parcel.customer_id != customer_id {
        return Err(AppError::InvalidTransition(
            "only the parcel's customer may confirm payment".to_string(),
        ));
    }
    if parcel.status != ParcelStatus::PendingPayment {
        return Err(AppError::InvalidTransition(format!(
            "payment cannot be confirmed while the parcel is {}",
            parcel.status.display_text()
        )));
    }

    commit_status(state, &mut parcel, ParcelStatus::AwaitingDriverConfirmation);
    Ok(parcel.clone())
}

/// Parcels have no restaurant leg, so acknowledging a PayShap transfer only
/// releases the parcel into transit; the margin is recorded on delivery.
pub fn acknowledge_payment(
    state: &AppState,
    parcel_id: Uuid,
    driver_id: Uuid,
) -> Result<Parcel, AppError> {
    let mut parcel = get_parcel_mut(state, parcel_id)?;

    if parcel.driver_id != Some(driver_id) {
        return Err(AppError::InvalidTransition(
            "only the assigned driver may acknowledge payment".to_string(),
        ));
    }
    if parcel.status != ParcelStatus::AwaitingDriverConfirmation {
        return Err(AppError::InvalidTransition(format!(
            "payment cannot be acknowledged while the parcel is {}",
            parcel.status.display_text()
        )));
    }

    commit_status(state, &mut parcel, ParcelStatus::InTransit);
    Ok(parcel.clone())
}

pub fn advance_status(
    state: &AppState,
    parcel_id: Uuid,
    actor_id: Uuid,
    role: Role,
) -> Result<Parcel, AppError> {
    let mut parcel = get_parcel_mut(state, parcel_id)?;

    // Specific gate errors before the generic table lookup.
    if parcel.status == ParcelStatus::AtPickup {
        if parcel.goods_cost.is_none() {
            return Err(AppError::InvalidTransition(
                "goods cost must be entered before the parcel leaves pickup".to_string(),
            ));
        }
        if parcel.payment_method.is_none() {
            return Err(AppError::InvalidTransition(
                "payment method must be chosen before the parcel leaves pickup".to_string(),
            ));
        }
    }

    let (next, required_role) =
        advance_rule(parcel.status, parcel.payment_method).ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "parcel cannot be advanced from {}",
                parcel.status.display_text()
            ))
        })?;

    if role != required_role {
        return Err(AppError::InvalidTransition(format!(
            "only the {required_role} may advance this parcel"
        )));
    }
    if parcel.driver_id != Some(actor_id) {
        return Err(AppError::InvalidTransition(
            "caller is not the driver for this parcel".to_string(),
        ));
    }

    if next == ParcelStatus::Delivered {
        ledger::record_parcel_earnings(state, &parcel)?;
        state.metrics.parcels_active.dec();
    }

    commit_status(state, &mut parcel, next);
    Ok(parcel.clone())
}

fn get_parcel_mut<'a>(
    state: &'a AppState,
    parcel_id: Uuid,
) -> Result<dashmap::mapref::one::RefMut<'a, Uuid, Parcel>, AppError> {
    state
        .parcels
        .get_mut(&parcel_id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))
}

fn commit_status(state: &AppState, parcel: &mut Parcel, next: ParcelStatus) {
    let old_status = parcel.status;
    parcel.status = next;

    state
        .metrics
        .transitions_total
        .with_label_values(&["parcel"])
        .inc();
    state.emit(StatusChanged::Parcel {
        id: parcel.id,
        old_status,
        new_status: next,
    });

    info!(
        parcel_id = %parcel.id,
        from = old_status.display_text(),
        to = next.display_text(),
        "parcel status changed"
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::customer::Customer;
    use crate::models::driver::{AreaFee, Driver, MethodFee};

    fn seed(state: &AppState) -> (Uuid, Uuid) {
        let customer_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();

        state.customers.insert(
            customer_id,
            Customer {
                id: customer_id,
                name: "Lerato".to_string(),
                contact: "lerato@example.test".to_string(),
                device_token: None,
                address: "Strand: 4 Beach Rd".to_string(),
            },
        );
        state.drivers.insert(
            driver_id,
            Driver {
                id: driver_id,
                name: "Thabo".to_string(),
                contact: "thabo@example.test".to_string(),
                device_token: None,
                accepted_payment_methods: vec![
                    PaymentMethod::CashOnDelivery,
                    PaymentMethod::PayShap,
                ],
                base_fee: dec!(3),
                fees: HashMap::from([(PaymentMethod::PayShap, MethodFee { base_fee: dec!(5) })]),
                delivery_areas: HashMap::from([(
                    "Somerset".to_string(),
                    AreaFee { base_fee: dec!(10) },
                )]),
                earnings: HashMap::new(),
                restaurant_ledger: HashMap::new(),
                reviews: Vec::new(),
                rating: 0.0,
            },
        );

        (customer_id, driver_id)
    }

    fn parcel_at_pickup(state: &AppState) -> (Parcel, Uuid, Uuid) {
        let (customer_id, driver_id) = seed(state);
        let parcel = request_parcel(
            state,
            RequestParcelRequest {
                customer_id,
                pickup_address: "Strand: 4 Beach Rd".to_string(),
                dropoff_address: "Somerset: 3 Short St".to_string(),
                items: vec![ParcelItem {
                    description: "groceries".to_string(),
                    quantity: 1,
                }],
            },
        )
        .unwrap();
        assign_driver(state, parcel.id, driver_id).unwrap();
        let parcel = advance_status(state, parcel.id, driver_id, Role::Driver).unwrap();
        assert_eq!(parcel.status, ParcelStatus::AtPickup);
        (parcel, customer_id, driver_id)
    }

    #[test]
    fn advance_table_edges() {
        assert_eq!(
            advance_rule(ParcelStatus::DriverAssigned, None),
            Some((ParcelStatus::AtPickup, Role::Driver))
        );
        assert_eq!(
            advance_rule(ParcelStatus::AtPickup, Some(PaymentMethod::CashOnDelivery)),
            Some((ParcelStatus::InTransit, Role::Driver))
        );
        // PayShap leaves the pickup point through the payment handshake.
        assert_eq!(advance_rule(ParcelStatus::AtPickup, Some(PaymentMethod::PayShap)), None);
        assert_eq!(
            advance_rule(ParcelStatus::AtDropoff, Some(PaymentMethod::PayShap)),
            Some((ParcelStatus::Delivered, Role::Driver))
        );
        assert_eq!(advance_rule(ParcelStatus::Delivered, None), None);
        assert_eq!(advance_rule(ParcelStatus::PendingDriverAssignment, None), None);
    }

    #[test]
    fn missing_addresses_are_rejected() {
        let state = AppState::new(16);
        let (customer_id, _) = seed(&state);

        let err = request_parcel(
            &state,
            RequestParcelRequest {
                customer_id,
                pickup_address: " ".to_string(),
                dropoff_address: "Somerset: 3 Short St".to_string(),
                items: vec![ParcelItem {
                    description: "box".to_string(),
                    quantity: 1,
                }],
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn leaving_pickup_requires_goods_cost_and_method() {
        let state = AppState::new(16);
        let (parcel, customer_id, driver_id) = parcel_at_pickup(&state);

        let err = advance_status(&state, parcel.id, driver_id, Role::Driver).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        set_goods_cost(&state, parcel.id, driver_id, dec!(0)).unwrap();
        let err = advance_status(&state, parcel.id, driver_id, Role::Driver).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        choose_payment_method(&state, parcel.id, customer_id, PaymentMethod::CashOnDelivery)
            .unwrap();
        let parcel = advance_status(&state, parcel.id, driver_id, Role::Driver).unwrap();
        assert_eq!(parcel.status, ParcelStatus::InTransit);
    }

    #[test]
    fn negative_goods_cost_is_rejected() {
        let state = AppState::new(16);
        let (parcel, _, driver_id) = parcel_at_pickup(&state);

        let err = set_goods_cost(&state, parcel.id, driver_id, dec!(-1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn method_choice_requires_goods_cost_first() {
        let state = AppState::new(16);
        let (parcel, customer_id, _) = parcel_at_pickup(&state);

        let err =
            choose_payment_method(&state, parcel.id, customer_id, PaymentMethod::CashOnDelivery)
                .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn payshap_choice_enters_payment_handshake_with_fee_applied() {
        let state = AppState::new(16);
        let (parcel, customer_id, driver_id) = parcel_at_pickup(&state);

        set_goods_cost(&state, parcel.id, driver_id, dec!(150)).unwrap();
        let parcel =
            choose_payment_method(&state, parcel.id, customer_id, PaymentMethod::PayShap).unwrap();

        assert_eq!(parcel.status, ParcelStatus::PendingPayment);
        // Somerset area fee 10 + PayShap fee 5 over the fronted 150.
        assert_eq!(parcel.delivery_fee, dec!(15));
        assert_eq!(parcel.total, Some(dec!(165)));

        confirm_payment_sent(&state, parcel.id, customer_id).unwrap();
        let parcel = acknowledge_payment(&state, parcel.id, driver_id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::InTransit);
    }

    #[test]
    fn delivery_records_the_margin_once() {
        let state = AppState::new(16);
        let (parcel, customer_id, driver_id) = parcel_at_pickup(&state);

        set_goods_cost(&state, parcel.id, driver_id, dec!(150)).unwrap();
        choose_payment_method(&state, parcel.id, customer_id, PaymentMethod::CashOnDelivery)
            .unwrap();

        for _ in 0..3 {
            advance_status(&state, parcel.id, driver_id, Role::Driver).unwrap();
        }

        let stored = state.parcels.get(&parcel.id).unwrap().clone();
        assert_eq!(stored.status, ParcelStatus::Delivered);

        // Somerset area fee 10 + cash fallback base fee 3.
        let driver = state.drivers.get(&driver_id).unwrap();
        assert_eq!(driver.earnings.len(), 1);
        assert_eq!(driver.earnings.get(&parcel.id), Some(&dec!(13)));
    }
}
