//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use uuid::Uuid;

use crate::{EngineError, MoneyCents, Place, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed)
}

pub(crate) fn normalize_name(value: &str, label: &str) -> ResultEngine<String> {
    normalize_required_text(value, &format!("{label} name"))
}

/// Trims city and upper-cases state so lookups and comparisons are stable.
pub(crate) fn normalize_place(place: &Place, label: &str) -> ResultEngine<Place> {
    Ok(Place {
        city: normalize_required_text(&place.city, &format!("{label} city"))?,
        state: normalize_required_text(&place.state, &format!("{label} state"))?
            .to_uppercase(),
    })
}

pub(crate) fn ensure_non_negative_miles(miles: i64, label: &str) -> ResultEngine<()> {
    if miles < 0 {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be >= 0, got {miles}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative_money(amount: MoneyCents, label: &str) -> ResultEngine<()> {
    if amount.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be >= 0, got {amount}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_gallons(gallons: f64) -> ResultEngine<()> {
    if !gallons.is_finite() || gallons < 0.0 {
        return Err(EngineError::InvalidAmount(format!(
            "gallons must be a finite number >= 0, got {gallons}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_is_trimmed_and_state_upper_cased() {
        let place = normalize_place(&Place::new("  Fort   Worth ", " tx"), "origin").unwrap();
        assert_eq!(place, Place::new("Fort Worth", "TX"));
    }

    #[test]
    fn empty_place_is_rejected() {
        let err = normalize_place(&Place::new(" ", "TX"), "origin").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("origin city must not be empty".to_string())
        );
    }

    #[test]
    fn gallons_must_be_finite_and_non_negative() {
        assert!(ensure_gallons(12.5).is_ok());
        assert!(ensure_gallons(-0.1).is_err());
        assert!(ensure_gallons(f64::NAN).is_err());
    }
}
