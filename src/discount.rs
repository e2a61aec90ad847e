//! Last-minute and family discounts.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Seconds before the show in which the last-minute discount is offered.
pub const LAST_MINUTE_WINDOW_SECS: i64 = 30 * 60;
/// Last-minute discount is only given while the screen is below this occupancy.
pub const LAST_MINUTE_MAX_OCCUPANCY: f64 = 0.7;
pub const LAST_MINUTE_FACTOR: f64 = 0.75;

pub const FAMILY_MIN_PARTY: usize = 4;
pub const FAMILY_FACTOR: f64 = 0.80;

/// Booked seats against seats on the screen, for one showtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenLoad {
    pub total_seats: i64,
    pub booked_seats: i64,
}

impl ScreenLoad {
    /// An empty screen counts as full, so no discount is ever derived from it.
    pub fn occupancy(&self) -> f64 {
        if self.total_seats <= 0 {
            return 1.0;
        }
        self.booked_seats as f64 / self.total_seats as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Discounts {
    pub last_minute: bool,
    pub family: bool,
}

impl Discounts {
    pub fn evaluate(show_time: NaiveDateTime, now: NaiveDateTime, load: ScreenLoad, party_size: usize) -> Discounts {
        Discounts {
            last_minute: last_minute_applies(show_time, now, load),
            family: party_size >= FAMILY_MIN_PARTY,
        }
    }

    /// Last-minute first, then family.
    pub fn apply(&self, price: f64) -> f64 {
        let mut price = price;
        if self.last_minute {
            price *= LAST_MINUTE_FACTOR;
        }
        if self.family {
            price *= FAMILY_FACTOR;
        }
        price
    }
}

pub fn last_minute_applies(show_time: NaiveDateTime, now: NaiveDateTime, load: ScreenLoad) -> bool {
    let until_start = (show_time - now).num_seconds();
    (0..=LAST_MINUTE_WINDOW_SECS).contains(&until_start) && load.occupancy() < LAST_MINUTE_MAX_OCCUPANCY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn show() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 10)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap()
    }

    const HALF_FULL: ScreenLoad = ScreenLoad { total_seats: 100, booked_seats: 50 };

    #[test]
    fn last_minute_window_is_inclusive() {
        assert!(last_minute_applies(show(), show(), HALF_FULL));
        assert!(last_minute_applies(show(), show() - Duration::seconds(1800), HALF_FULL));
        assert!(!last_minute_applies(show(), show() - Duration::seconds(1801), HALF_FULL));
        assert!(!last_minute_applies(show(), show() + Duration::seconds(1), HALF_FULL));
    }

    #[test]
    fn last_minute_needs_spare_capacity() {
        let now = show() - Duration::minutes(10);
        let seventy = ScreenLoad { total_seats: 100, booked_seats: 70 };
        let sixty_nine = ScreenLoad { total_seats: 100, booked_seats: 69 };
        assert!(!last_minute_applies(show(), now, seventy));
        assert!(last_minute_applies(show(), now, sixty_nine));
    }

    #[test]
    fn screen_without_seats_gets_no_discount() {
        let now = show() - Duration::minutes(10);
        let empty = ScreenLoad::default();
        assert_eq!(empty.occupancy(), 1.0);
        assert!(!last_minute_applies(show(), now, empty));
    }

    #[test]
    fn family_discount_from_four_seats() {
        let now = show() - Duration::days(2);
        assert!(!Discounts::evaluate(show(), now, HALF_FULL, 3).family);
        assert!(Discounts::evaluate(show(), now, HALF_FULL, 4).family);
    }

    #[test]
    fn both_discounts_compound() {
        let discounts = Discounts { last_minute: true, family: true };
        assert!((discounts.apply(10.0) - 6.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn discounts_never_raise_the_price(price in 0.0f64..100.0, last_minute: bool, family: bool) {
            let discounted = Discounts { last_minute, family }.apply(price);
            prop_assert!(discounted <= price);
            prop_assert!(discounted >= price * LAST_MINUTE_FACTOR * FAMILY_FACTOR - 1e-9);
        }
    }
}
