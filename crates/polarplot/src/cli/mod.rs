pub mod draw;
pub mod setup;

/// Parse a numeric argument, rejecting zero.
pub(crate) fn nonzero(arg: &str) -> Result<f64, String> {
    let value: f64 = arg
        .parse()
        .map_err(|err| format!("`{arg}` is not a number: {err}"))?;
    if value == 0.0 || !value.is_finite() {
        return Err(format!("`{arg}` is not a valid value"));
    }
    Ok(value)
}

/// Parse a strictly positive numeric argument.
pub(crate) fn positive(arg: &str) -> Result<f64, String> {
    let value = nonzero(arg)?;
    if value < 0.0 {
        return Err(format!("`{arg}` must be positive"));
    }
    Ok(value)
}
