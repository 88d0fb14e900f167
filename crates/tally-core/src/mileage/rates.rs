//! Mileage reimbursement rates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::trip::{MileageTrip, TripPurpose};

/// A reimbursement rate that applies from `effective_from` until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageRate {
    pub effective_from: NaiveDate,
    /// Dollars per mile.
    pub rate_per_mile: Decimal,
}

impl MileageRate {
    pub fn new(effective_from: NaiveDate, rate_per_mile: Decimal) -> Self {
        Self {
            effective_from,
            rate_per_mile,
        }
    }
}

/// Rates ordered by effective date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MileageRateTable {
    rates: Vec<MileageRate>,
}

impl MileageRateTable {
    pub fn new(mut rates: Vec<MileageRate>) -> Self {
        rates.sort_by_key(|r| r.effective_from);
        Self { rates }
    }

    /// Published IRS standard business mileage rates.
    pub fn irs_business() -> Self {
        // Rates are in mills: 585 is $0.585
        let rate = |y, m, d, mills| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| MileageRate::new(date, Decimal::new(mills, 3)))
        };
        Self::new(
            [
                rate(2022, 1, 1, 585),
                rate(2022, 7, 1, 625),
                rate(2023, 1, 1, 655),
                rate(2024, 1, 1, 670),
                rate(2025, 1, 1, 700),
            ]
            .into_iter()
            .flatten()
            .collect(),
        )
    }

    pub fn rates(&self) -> &[MileageRate] {
        &self.rates
    }

    pub fn into_rates(self) -> Vec<MileageRate> {
        self.rates
    }

    /// Rate in effect on `date`, if any rate had started by then.
    pub fn rate_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.rates
            .iter()
            .rev()
            .find(|r| r.effective_from <= date)
            .map(|r| r.rate_per_mile)
    }

    /// Reimbursement owed for a trip, using the rate on its start date.
    pub fn reimbursement_for(&self, trip: &MileageTrip) -> Decimal {
        let Some(rate) = self.rate_on(trip.start_time.date_naive()) else {
            tracing::warn!("No mileage rate in effect for trip {}", trip.id);
            return Decimal::ZERO;
        };
        reimbursement(trip.distance_miles, trip.purpose, rate)
    }
}

/// `distance × rate` for business driving, rounded to cents; zero otherwise.
pub fn reimbursement(distance_miles: f64, purpose: TripPurpose, rate_per_mile: Decimal) -> Decimal {
    if purpose != TripPurpose::Business || distance_miles <= 0.0 {
        return Decimal::ZERO;
    }
    let miles = Decimal::try_from(distance_miles).unwrap_or(Decimal::ZERO);
    (miles * rate_per_mile).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trip(purpose: TripPurpose, miles: f64, year: i32) -> MileageTrip {
        MileageTrip {
            id: 1,
            user_id: "u".to_string(),
            profile: "default".to_string(),
            purpose,
            start_time: Utc.with_ymd_and_hms(year, 6, 1, 8, 0, 0).unwrap(),
            end_time: None,
            distance_miles: miles,
            auto_started: false,
        }
    }

    #[test]
    fn test_rate_lookup_by_date() {
        let table = MileageRateTable::irs_business();
        assert_eq!(table.rate_on(date(2021, 12, 31)), None);
        assert_eq!(table.rate_on(date(2022, 6, 30)), Some(Decimal::new(585, 3)));
        assert_eq!(table.rate_on(date(2022, 7, 1)), Some(Decimal::new(625, 3)));
        assert_eq!(table.rate_on(date(2024, 3, 15)), Some(Decimal::new(67, 2)));
        assert_eq!(table.rate_on(date(2030, 1, 1)), Some(Decimal::new(70, 2)));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let table = MileageRateTable::new(vec![
            MileageRate::new(date(2024, 1, 1), Decimal::ONE),
            MileageRate::new(date(2020, 1, 1), Decimal::TWO),
        ]);
        assert_eq!(table.rate_on(date(2022, 1, 1)), Some(Decimal::TWO));
        assert_eq!(table.rates()[0].effective_from, date(2020, 1, 1));
    }

    #[test]
    fn test_reimbursement() {
        assert_eq!(
            reimbursement(10.0, TripPurpose::Business, Decimal::new(67, 2)),
            Decimal::new(670, 2)
        );
        assert_eq!(
            reimbursement(12.345, TripPurpose::Business, Decimal::new(70, 2)),
            Decimal::new(864, 2)
        );
        assert_eq!(
            reimbursement(10.0, TripPurpose::Personal, Decimal::new(67, 2)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_reimbursement_for_trip() {
        let table = MileageRateTable::irs_business();
        assert_eq!(
            table.reimbursement_for(&trip(TripPurpose::Business, 100.0, 2024)),
            Decimal::new(6700, 2)
        );
        assert_eq!(
            table.reimbursement_for(&trip(TripPurpose::Personal, 100.0, 2024)),
            Decimal::ZERO
        );
        assert_eq!(
            table.reimbursement_for(&trip(TripPurpose::Business, 100.0, 2019)),
            Decimal::ZERO
        );
    }
}
