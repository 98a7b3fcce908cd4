use askama::Result;
use rust_decimal::Decimal;

// Custom filter to format quantities with two decimal places.
// This allows us to use `|dp2` in the report tables.
#[allow(clippy::unnecessary_wraps)]
pub fn dp2(value: &Decimal) -> Result<String> {
    Ok(format!("{:.2}", value))
}

// Same, but for values that may be undefined (rendered as a dash).
#[allow(clippy::unnecessary_wraps)]
pub fn opt_dp2(value: &Option<Decimal>) -> Result<String> {
    Ok(match value {
        Some(value) => format!("{:.2}", value),
        None => "-".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn dp2_pads_and_truncates() {
        assert_eq!(dp2(&dec!(1.5)).unwrap(), "1.50");
        assert_eq!(dp2(&dec!(-0.5)).unwrap(), "-0.50");
        assert_eq!(dp2(&dec!(200)).unwrap(), "200.00");
    }

    #[test]
    fn opt_dp2_renders_undefined_as_dash() {
        assert_eq!(opt_dp2(&Some(dec!(2))).unwrap(), "2.00");
        assert_eq!(opt_dp2(&None).unwrap(), "-");
    }
}
