//! Request DTOs for pricing API endpoints.
//!
//! Query parameters arrive as raw strings so that missing or malformed values
//! can be reported as `InvalidInput` with a readable message.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::models::SalesChannel;
use super::services::{ListQuery, PriceRequest, PricingError};

/// Query for `GET /api/pricing/active-list`
#[derive(Debug, Default, Deserialize)]
pub struct ActiveListParams {
    pub company_id: Option<String>,
    pub channel: Option<String>,
    pub branch_id: Option<String>,
    pub as_of: Option<String>,
}

/// Query for `GET /api/pricing/calculate`
#[derive(Debug, Default, Deserialize)]
pub struct CalculatePriceParams {
    pub company_id: Option<String>,
    pub channel: Option<String>,
    pub branch_id: Option<String>,
    pub item_id: Option<String>,
    pub quantity: Option<String>,
    pub order_amount: Option<String>,
    /// Comma separated item ids, e.g. "1,5,23"
    pub cart_items: Option<String>,
    pub as_of: Option<String>,
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, PricingError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PricingError::InvalidInput(format!(
            "parameter '{}' is required",
            name
        ))),
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(name: &str, value: &str) -> Result<i64, PricingError> {
    value
        .parse()
        .map_err(|_| PricingError::InvalidInput(format!("'{}' must be an integer id", name)))
}

fn parse_channel(value: &str) -> Result<SalesChannel, PricingError> {
    value.parse().map_err(PricingError::InvalidInput)
}

fn parse_date(value: Option<&str>, today: NaiveDate) -> Result<NaiveDate, PricingError> {
    match value {
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map_err(|_| PricingError::InvalidInput("'as_of' must be a YYYY-MM-DD date".to_string())),
        None => Ok(today),
    }
}

/// Parse a comma separated id list. Tokens that are not plain integers are
/// dropped.
pub fn parse_cart_items(raw: Option<&str>) -> Vec<i64> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|token| token.parse().ok())
            .collect()
    })
    .unwrap_or_default()
}

impl ActiveListParams {
    /// Validate and convert. `today` is used when `as_of` is absent.
    pub fn into_query(self, today: NaiveDate) -> Result<ListQuery, PricingError> {
        let company_id = parse_id("company_id", required("company_id", &self.company_id)?)?;
        let channel = parse_channel(required("channel", &self.channel)?)?;
        let branch_id = optional(&self.branch_id)
            .map(|v| parse_id("branch_id", v))
            .transpose()?;
        let as_of = parse_date(optional(&self.as_of), today)?;

        Ok(ListQuery {
            company_id,
            channel,
            branch_id,
            as_of,
        })
    }
}

impl CalculatePriceParams {
    /// Validate and convert. `today` is used when `as_of` is absent.
    pub fn into_request(self, today: NaiveDate) -> Result<PriceRequest, PricingError> {
        let list = ActiveListParams {
            company_id: self.company_id,
            channel: self.channel,
            branch_id: self.branch_id,
            as_of: self.as_of,
        }
        .into_query(today)?;

        let item_id = parse_id("item_id", required("item_id", &self.item_id)?)?;
        let quantity: i32 = required("quantity", &self.quantity)?
            .parse()
            .map_err(|_| PricingError::InvalidInput("'quantity' must be an integer".to_string()))?;
        if quantity < 1 {
            return Err(PricingError::InvalidInput(
                "'quantity' must be at least 1".to_string(),
            ));
        }

        let order_amount = match optional(&self.order_amount) {
            Some(v) => v.parse::<Decimal>().map_err(|_| {
                PricingError::InvalidInput("'order_amount' must be a decimal number".to_string())
            })?,
            None => Decimal::ZERO,
        };

        Ok(PriceRequest {
            list,
            item_id,
            quantity,
            order_amount,
            cart_item_ids: parse_cart_items(optional(&self.cart_items)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn params() -> CalculatePriceParams {
        CalculatePriceParams {
            company_id: Some("1".to_string()),
            channel: Some("ecommerce".to_string()),
            item_id: Some("7".to_string()),
            quantity: Some("2".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_calculate_params() {
        let req = params().into_request(today()).unwrap();
        assert_eq!(req.list.company_id, 1);
        assert_eq!(req.list.channel, SalesChannel::Ecommerce);
        assert_eq!(req.list.branch_id, None);
        assert_eq!(req.list.as_of, today());
        assert_eq!(req.item_id, 7);
        assert_eq!(req.quantity, 2);
        assert_eq!(req.order_amount, Decimal::ZERO);
        assert!(req.cart_item_ids.is_empty());
    }

    #[test]
    fn test_full_calculate_params() {
        let mut p = params();
        p.branch_id = Some("10".to_string());
        p.order_amount = Some("5000.50".to_string());
        p.cart_items = Some("1,5,23".to_string());
        p.as_of = Some("2024-01-31".to_string());

        let req = p.into_request(today()).unwrap();
        assert_eq!(req.list.branch_id, Some(10));
        assert_eq!(req.order_amount, dec!(5000.50));
        assert_eq!(req.cart_item_ids, vec![1, 5, 23]);
        assert_eq!(req.list.as_of, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_missing_required_param() {
        let mut p = params();
        p.quantity = None;
        let err = p.into_request(today()).unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_non_positive_quantity_is_invalid() {
        for raw in ["0", "-3"] {
            let mut p = params();
            p.quantity = Some(raw.to_string());
            let err = p.into_request(today()).unwrap_err();
            assert!(matches!(err, PricingError::InvalidInput(_)));
            assert!(err.to_string().contains("at least 1"));
        }
    }

    #[test]
    fn test_blank_required_param_is_missing() {
        let mut p = params();
        p.company_id = Some("  ".to_string());
        assert!(matches!(p.into_request(today()), Err(PricingError::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_id_is_invalid() {
        let mut p = params();
        p.item_id = Some("abc".to_string());
        assert!(matches!(p.into_request(today()), Err(PricingError::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_decimal_is_invalid() {
        let mut p = params();
        p.order_amount = Some("12,5".to_string());
        assert!(matches!(p.into_request(today()), Err(PricingError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_channel_is_invalid() {
        let mut p = params();
        p.channel = Some("phone".to_string());
        assert!(matches!(p.into_request(today()), Err(PricingError::InvalidInput(_))));
    }

    #[test]
    fn test_bad_date_is_invalid() {
        let p = ActiveListParams {
            company_id: Some("1".to_string()),
            channel: Some("ALL".to_string()),
            as_of: Some("15/06/2024".to_string()),
            ..Default::default()
        };
        assert!(matches!(p.into_query(today()), Err(PricingError::InvalidInput(_))));
    }

    #[test]
    fn test_cart_items_drop_non_numeric_tokens() {
        assert_eq!(parse_cart_items(Some("1, 2,x,,-3,4")), vec![1, 2, 4]);
        assert!(parse_cart_items(None).is_empty());
    }
}
