//! Weekly cost breakdown arithmetic.
//!
//! [`compute`] is pure: it turns a week's line items and a mile basis into the
//! fixed, variable and weekly totals plus cost-per-mile. Every writer of a
//! cost breakdown row runs it over the full row before persisting, so the
//! totals in a row are never stale relative to its own line items.

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine, money::round_cents};

/// Mile basis used when an established truck has no miles in the week.
pub const STANDARD_WEEKLY_MILES: i64 = 3000;

/// Weekly cost line items, in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostLineItems {
    // Fixed.
    pub truck_payment: MoneyCents,
    pub trailer_payment: MoneyCents,
    pub physical_damage_insurance: MoneyCents,
    pub liability_insurance: MoneyCents,
    pub cargo_insurance: MoneyCents,
    pub bobtail_insurance: MoneyCents,
    pub occupational_accident_insurance: MoneyCents,
    pub eld_subscription: MoneyCents,
    pub other_subscriptions: MoneyCents,
    pub base_plate: MoneyCents,
    pub phone: MoneyCents,
    // Variable.
    pub driver_pay: MoneyCents,
    pub fuel: MoneyCents,
    pub def: MoneyCents,
    pub maintenance: MoneyCents,
    pub tolls: MoneyCents,
    pub dwell_time: MoneyCents,
    pub reefer_fuel: MoneyCents,
    pub parking: MoneyCents,
    pub ifta: MoneyCents,
}

impl CostLineItems {
    /// Named fixed-category items.
    pub fn fixed(&self) -> [(&'static str, MoneyCents); 11] {
        [
            ("truck_payment", self.truck_payment),
            ("trailer_payment", self.trailer_payment),
            ("physical_damage_insurance", self.physical_damage_insurance),
            ("liability_insurance", self.liability_insurance),
            ("cargo_insurance", self.cargo_insurance),
            ("bobtail_insurance", self.bobtail_insurance),
            (
                "occupational_accident_insurance",
                self.occupational_accident_insurance,
            ),
            ("eld_subscription", self.eld_subscription),
            ("other_subscriptions", self.other_subscriptions),
            ("base_plate", self.base_plate),
            ("phone", self.phone),
        ]
    }

    /// Named variable-category items.
    pub fn variable(&self) -> [(&'static str, MoneyCents); 9] {
        [
            ("driver_pay", self.driver_pay),
            ("fuel", self.fuel),
            ("def", self.def),
            ("maintenance", self.maintenance),
            ("tolls", self.tolls),
            ("dwell_time", self.dwell_time),
            ("reefer_fuel", self.reefer_fuel),
            ("parking", self.parking),
            ("ifta", self.ifta),
        ]
    }

    /// Rejects negative line items.
    pub fn validate(&self) -> ResultEngine<()> {
        for (name, amount) in self.fixed().into_iter().chain(self.variable()) {
            if amount.is_negative() {
                return Err(EngineError::InvalidAmount(format!(
                    "{name} must be >= 0, got {amount}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Divisor for cost-per-mile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MileBasis {
    /// Miles (revenue + deadhead) driven in the week.
    Weekly(i64),
    /// No miles this week, but the truck has driven before.
    Standard,
    /// The truck has never recorded a mile: cost-per-mile is 0.
    Unrecorded,
}

impl MileBasis {
    pub fn resolve(weekly_miles: i64, lifetime_miles: i64) -> Self {
        if weekly_miles > 0 {
            Self::Weekly(weekly_miles)
        } else if lifetime_miles > 0 {
            Self::Standard
        } else {
            Self::Unrecorded
        }
    }

    fn divisor(self) -> Option<i64> {
        match self {
            Self::Weekly(miles) => Some(miles),
            Self::Standard => Some(STANDARD_WEEKLY_MILES),
            Self::Unrecorded => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostTotals {
    pub fixed: MoneyCents,
    pub variable: MoneyCents,
    pub weekly: MoneyCents,
    /// Full precision cents per mile.
    pub cost_per_mile: f64,
    /// Cents per mile rounded for storage and display.
    pub cost_per_mile_minor: i64,
}

fn checked_total(items: &[(&'static str, MoneyCents)], label: &str) -> ResultEngine<MoneyCents> {
    items
        .iter()
        .try_fold(MoneyCents::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
        .ok_or_else(|| EngineError::InvariantViolation(format!("{label} costs overflow")))
}

/// Computes weekly totals and cost-per-mile for a set of line items.
pub fn compute(items: &CostLineItems, basis: MileBasis) -> ResultEngine<CostTotals> {
    items.validate()?;
    let fixed = checked_total(&items.fixed(), "fixed")?;
    let variable = checked_total(&items.variable(), "variable")?;
    let weekly = fixed
        .checked_add(variable)
        .ok_or_else(|| EngineError::InvariantViolation("weekly costs overflow".to_string()))?;

    let cost_per_mile = match basis.divisor() {
        Some(miles) if miles > 0 => weekly.as_f64() / miles as f64,
        Some(miles) => {
            return Err(EngineError::InvariantViolation(format!(
                "mile basis must be positive, got {miles}"
            )));
        }
        None => 0.0,
    };

    Ok(CostTotals {
        fixed,
        variable,
        weekly,
        cost_per_mile,
        cost_per_mile_minor: round_cents(cost_per_mile),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> CostLineItems {
        CostLineItems {
            truck_payment: MoneyCents::new(60_000),
            liability_insurance: MoneyCents::new(30_000),
            phone: MoneyCents::new(10_000),
            driver_pay: MoneyCents::new(25_000),
            fuel: MoneyCents::new(20_000),
            tolls: MoneyCents::new(5_000),
            ..Default::default()
        }
    }

    #[test]
    fn totals_split_by_category() {
        let totals = compute(&items(), MileBasis::Weekly(2000)).unwrap();
        assert_eq!(totals.fixed, MoneyCents::new(100_000));
        assert_eq!(totals.variable, MoneyCents::new(50_000));
        assert_eq!(totals.weekly, MoneyCents::new(150_000));
        assert_eq!(totals.cost_per_mile, 75.0);
        assert_eq!(totals.cost_per_mile_minor, 75);
    }

    #[test]
    fn cost_per_mile_keeps_precision_and_rounds_for_storage() {
        let totals = compute(&items(), MileBasis::Weekly(2100)).unwrap();
        assert!((totals.cost_per_mile - 71.428_571).abs() < 1e-5);
        assert_eq!(totals.cost_per_mile_minor, 71);
    }

    #[test]
    fn idle_week_uses_standard_basis() {
        let totals = compute(&items(), MileBasis::resolve(0, 12_000)).unwrap();
        assert_eq!(totals.cost_per_mile_minor, 50);
    }

    #[test]
    fn unrecorded_truck_has_zero_cost_per_mile() {
        let totals = compute(&items(), MileBasis::resolve(0, 0)).unwrap();
        assert_eq!(totals.weekly, MoneyCents::new(150_000));
        assert_eq!(totals.cost_per_mile_minor, 0);

        let empty = compute(&CostLineItems::default(), MileBasis::Unrecorded).unwrap();
        assert_eq!(empty.weekly, MoneyCents::ZERO);
        assert_eq!(empty.cost_per_mile, 0.0);
    }

    #[test]
    fn negative_items_are_rejected() {
        let bad = CostLineItems {
            maintenance: MoneyCents::new(-1),
            ..Default::default()
        };
        let err = compute(&bad, MileBasis::Weekly(100)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(msg) if msg.starts_with("maintenance")));
    }

    #[test]
    fn non_positive_weekly_basis_is_an_invariant_violation() {
        let err = compute(&items(), MileBasis::Weekly(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }
}
