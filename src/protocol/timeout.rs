use crate::status::Status;
use std::time::Duration;

/// Parses a `grpc-timeout` value: 1 to 8 ASCII digits followed by one of
/// `H`, `M`, `S`, `m`, `u`, `n`.
pub fn parse_grpc_timeout(value: &str) -> Result<Duration, Status> {
    let invalid = || Status::invalid_argument(format!("protocol error: invalid grpc timeout value: {value}"));

    let unit = value.chars().last().ok_or_else(invalid)?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        'H' => Duration::from_secs(amount * 60 * 60),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return Err(invalid()),
    };
    Ok(duration)
}

/// Formats a duration as a `grpc-timeout` value, in the finest unit whose
/// amount fits in 8 digits.
pub fn encode_grpc_timeout(timeout: Duration) -> String {
    const MAX: u128 = 99_999_999;
    let nanos = timeout.as_nanos();
    let units: [(u128, char); 6] = [
        (1, 'n'),
        (1_000, 'u'),
        (1_000_000, 'm'),
        (1_000_000_000, 'S'),
        (60 * 1_000_000_000, 'M'),
        (60 * 60 * 1_000_000_000, 'H'),
    ];
    for (scale, unit) in units {
        // Round up so the peer never sees a shorter timeout than requested.
        let amount = nanos.div_ceil(scale);
        if amount <= MAX {
            return format!("{amount}{unit}");
        }
    }
    format!("{MAX}H")
}

/// Parses a `connect-timeout-ms` value: 1 to 10 ASCII digits.
pub fn parse_connect_timeout(value: &str) -> Result<Duration, Status> {
    if value.is_empty() || value.len() > 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Status::invalid_argument(format!(
            "protocol error: invalid connect timeout value: {value}"
        )));
    }
    let millis: u64 = value.parse().map_err(|_| {
        Status::invalid_argument(format!("protocol error: invalid connect timeout value: {value}"))
    })?;
    Ok(Duration::from_millis(millis))
}

/// Formats a duration as a `connect-timeout-ms` value, capped at 10 digits.
pub fn encode_connect_timeout(timeout: Duration) -> String {
    let millis = timeout.as_millis().clamp(1, 9_999_999_999);
    millis.to_string()
}
