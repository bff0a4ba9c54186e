use crate::models::{Alert, Direction};

/// Both directions are boundary-inclusive.
pub fn crosses(direction: Direction, target: f64, price: f64) -> bool {
    match direction {
        Direction::Above => price >= target,
        Direction::Below => price <= target,
    }
}

pub fn is_satisfied(alert: &Alert, current_price: f64) -> bool {
    crosses(alert.direction, alert.target_price, current_price)
}
