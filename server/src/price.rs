//! Fixed-point handling for recipe prices.
//!
//! Prices are `NUMERIC(5, 2)` in the database and travel as decimal strings
//! with exactly two fractional digits (`"10.00"`). Input accepts either a
//! string or a JSON number so clients are not forced to quote values.

use std::borrow::Cow;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serializer};
use validator::ValidationError;

pub const DECIMAL_PLACES: i64 = 2;
pub const MAX_DIGITS: i64 = 5;

/// Longest literal worth handing to the decimal parser.
const MAX_LITERAL_LEN: usize = 64;

/// Widest scale accepted from a literal once trailing zeros are dropped.
/// Keeps `1e-100000000` from ever being rescaled.
const MAX_LITERAL_SCALE: i64 = 32;

/// Render a price with exactly [`DECIMAL_PLACES`] fractional digits.
pub fn format(value: &BigDecimal) -> String {
    value.with_scale(DECIMAL_PLACES).to_string()
}

/// Parse a decimal literal. Only the exponent is bounded here; range and
/// precision are left to [`validate`].
pub fn parse(raw: &str) -> Result<BigDecimal, String> {
    let invalid = || "A valid number is required.".to_string();
    let raw = raw.trim();
    if raw.len() > MAX_LITERAL_LEN {
        return Err(invalid());
    }
    let value = BigDecimal::from_str(raw)
        .map_err(|_| invalid())?
        .normalized();

    let (_, scale) = value.as_bigint_and_exponent();
    if !(-MAX_LITERAL_SCALE..=MAX_LITERAL_SCALE).contains(&scale) {
        return Err(invalid());
    }
    Ok(value)
}

/// Range and precision rules applied after parsing.
pub fn validate(value: &BigDecimal) -> Result<(), ValidationError> {
    let fail = |code: &'static str, message: &'static str| {
        Err(ValidationError::new(code).with_message(Cow::Borrowed(message)))
    };

    // Work from digit counts so no check ever rescales the value.
    let value = value.normalized();
    let (unscaled, scale) = value.as_bigint_and_exponent();

    if unscaled < BigInt::from(0) {
        return fail("min_value", "Ensure this value is greater than or equal to 0.");
    }

    let whole_digits = value.digits() as i64 - scale;

    if whole_digits > MAX_DIGITS - DECIMAL_PLACES {
        return fail(
            "max_whole_digits",
            "Ensure that there are no more than 3 digits before the decimal point.",
        );
    }
    if scale > DECIMAL_PLACES {
        return fail(
            "max_decimal_places",
            "Ensure that there are no more than 2 decimal places.",
        );
    }

    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Text(String),
    Number(serde_json::Number),
}

impl RawPrice {
    fn parse(self) -> Result<BigDecimal, String> {
        match self {
            RawPrice::Text(text) => parse(&text),
            RawPrice::Number(number) => parse(&number.to_string()),
        }
    }
}

pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    RawPrice::deserialize(deserializer)?
        .parse()
        .map_err(serde::de::Error::custom)
}

/// Same as the parent module, for optional fields.
pub mod option {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigDecimal>, D::Error> {
        Option::<RawPrice>::deserialize(deserializer)?
            .map(RawPrice::parse)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(deserialize_with = "deserialize")]
        price: BigDecimal,
    }

    #[derive(Deserialize)]
    struct PartialPayload {
        #[serde(default, deserialize_with = "option::deserialize")]
        price: Option<BigDecimal>,
    }

    #[derive(Serialize)]
    struct Output {
        #[serde(serialize_with = "serialize")]
        price: BigDecimal,
    }

    fn dec(raw: &str) -> BigDecimal {
        BigDecimal::from_str(raw).unwrap()
    }

    #[test]
    fn test_format_pads_to_two_places() {
        assert_eq!(format(&dec("10")), "10.00");
        assert_eq!(format(&dec("10.5")), "10.50");
        assert_eq!(format(&dec("4.50")), "4.50");
    }

    #[test]
    fn test_accepts_string_and_number() {
        let from_text: Payload = serde_json::from_str(r#"{"price": "15.50"}"#).unwrap();
        let from_number: Payload = serde_json::from_str(r#"{"price": 15.5}"#).unwrap();
        assert_eq!(from_text.price, dec("15.5"));
        assert_eq!(from_number.price, dec("15.5"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Payload>(r#"{"price": "ten"}"#).is_err());
        assert!(serde_json::from_str::<Payload>(r#"{"price": true}"#).is_err());

        let long = format!("1{}", "0".repeat(MAX_LITERAL_LEN));
        assert!(parse(&long).is_err());
    }

    #[test]
    fn test_optional_price() {
        let missing: PartialPayload = serde_json::from_str("{}").unwrap();
        assert!(missing.price.is_none());

        let present: PartialPayload = serde_json::from_str(r#"{"price": "3.50"}"#).unwrap();
        assert_eq!(present.price, Some(dec("3.5")));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_value(Output { price: dec("8.5") }).unwrap();
        assert_eq!(json, serde_json::json!({"price": "8.50"}));
    }

    #[test]
    fn test_validate_bounds() {
        assert!(validate(&dec("0")).is_ok());
        assert!(validate(&dec("999.99")).is_ok());
        assert!(validate(&dec("10.10")).is_ok());

        assert_eq!(validate(&dec("-1")).unwrap_err().code, "min_value");
        assert_eq!(validate(&dec("1.234")).unwrap_err().code, "max_decimal_places");
        assert_eq!(validate(&dec("1000")).unwrap_err().code, "max_whole_digits");
        assert_eq!(validate(&dec("1000.5")).unwrap_err().code, "max_whole_digits");
        assert!(validate(&dec("0.05")).is_ok());
        assert!(validate(&dec("12.3000")).is_ok());
    }

    #[test]
    fn test_exponent_literals_fail_fast() {
        let started = std::time::Instant::now();
        for raw in ["1e-100000000", "1e20000000", "-1e-100000000"] {
            let body = serde_json::json!({ "price": raw }).to_string();
            assert!(serde_json::from_str::<Payload>(&body).is_err(), "{raw}");
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        // Huge exponents that still reach validation are checked by digit count.
        assert_eq!(
            validate(&dec("1e20000000")).unwrap_err().code,
            "max_whole_digits"
        );
        assert_eq!(
            validate(&dec("1e-100000000")).unwrap_err().code,
            "max_decimal_places"
        );
        assert_eq!(validate(&dec("-1e-100000000")).unwrap_err().code, "min_value");
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_small_exponents_are_plain_numbers() {
        let payload: Payload = serde_json::from_str(r#"{"price": "1.5e1"}"#).unwrap();
        assert_eq!(payload.price, dec("15"));
        assert!(validate(&payload.price).is_ok());
    }
}
