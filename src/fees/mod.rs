//! Delivery fee engine. Pure function of the driver's fee configuration,
//! the delivery address, and the chosen payment method, so the breakdown a
//! customer sees always matches what the driver's config implies.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::PaymentMethod;
use crate::models::driver::Driver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub area_fee: Decimal,
    pub payment_fee: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

pub fn quote(
    base_total: Decimal,
    address: &str,
    driver: &Driver,
    payment_method: Option<PaymentMethod>,
) -> FeeBreakdown {
    let area_fee = resolve_area_fee(address, driver);
    let payment_fee = resolve_payment_fee(driver, payment_method);
    let delivery_fee = area_fee + payment_fee;

    FeeBreakdown {
        area_fee,
        payment_fee,
        delivery_fee,
        total: base_total + delivery_fee,
    }
}

/// Addresses may encode their area as an `"Area: details"` prefix; that
/// takes priority. Otherwise the whole address is substring-searched
/// against every configured area name and the longest match wins, so
/// "Somerset West" beats "Somerset". Equal-length ties break lexically.
fn resolve_area_fee(address: &str, driver: &Driver) -> Decimal {
    let lowered = address.to_lowercase();

    if let Some((prefix, _rest)) = address.split_once(':') {
        let prefix = prefix.trim().to_lowercase();
        for (name, area) in &driver.delivery_areas {
            if name.to_lowercase() == prefix {
                return area.base_fee;
            }
        }
    }

    let mut best: Option<(&String, Decimal)> = None;
    for (name, area) in &driver.delivery_areas {
        if !lowered.contains(&name.to_lowercase()) {
            continue;
        }

        let better = match best {
            None => true,
            Some((current, _)) => {
                name.len() > current.len() || (name.len() == current.len() && name < current)
            }
        };

        if better {
            best = Some((name, area.base_fee));
        }
    }

    best.map(|(_, fee)| fee).unwrap_or(Decimal::ZERO)
}

fn resolve_payment_fee(driver: &Driver, payment_method: Option<PaymentMethod>) -> Decimal {
    match payment_method {
        None => Decimal::ZERO,
        Some(method) => driver
            .fees
            .get(&method)
            .map(|fee| fee.base_fee)
            .unwrap_or(driver.base_fee),
    }
}
