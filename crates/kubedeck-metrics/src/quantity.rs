//! Kubernetes quantity-string decoding.
//!
//! Capacity CPU comes as plain decimal cores ("4"), usage CPU as nanocores
//! ("112520n"), microcores, millicores or bare cores. Memory arrives with
//! binary suffixes ("8194300Ki", "2048Mi", "2Gi") or as bare bytes.

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_CORE: i64 = 1_000_000_000;
const KIB_PER_MIB: i64 = 1_024;
const BYTES_PER_MIB: i64 = 1_024 * 1_024;

/// Possible errors from parsing kubernetes quantity strings.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum QuantityError {
    /// The string is empty or its numeric part does not parse.
    #[error("malformed quantity {0:?}")]
    Malformed(String),

    /// The unit suffix is not one this parser understands.
    #[error("unsupported quantity suffix in {0:?}")]
    UnsupportedSuffix(String),
}

/// Converts a CPU capacity quantity to milli-cores.
///
/// Capacity is declared in whole or fractional cores; a `m` suffix is
/// already milli-cores and passes through.
pub fn cpu_capacity_milli(quantity: &str) -> Result<i64, QuantityError> {
    let (value, suffix) = split_value(quantity)?;
    match suffix {
        "" => Ok((parse_cores(value, quantity)? * 1_000.0).round() as i64),
        "m" => parse_int(value, quantity),
        _ => Err(QuantityError::UnsupportedSuffix(quantity.to_string())),
    }
}

/// Converts a CPU usage quantity to nanocores.
pub fn cpu_usage_nano(quantity: &str) -> Result<i64, QuantityError> {
    let (value, suffix) = split_value(quantity)?;
    match suffix {
        "n" => parse_int(value, quantity),
        "u" => Ok(parse_int(value, quantity)? * NANOS_PER_MICRO),
        "m" => Ok(parse_int(value, quantity)? * NANOS_PER_MILLI),
        "" => Ok((parse_cores(value, quantity)? * NANOS_PER_CORE as f64).round() as i64),
        _ => Err(QuantityError::UnsupportedSuffix(quantity.to_string())),
    }
}

/// Converts a memory quantity (capacity or usage) to mebibytes.
///
/// A bare number is taken as bytes.
pub fn memory_mi(quantity: &str) -> Result<i64, QuantityError> {
    let (value, suffix) = split_value(quantity)?;
    match suffix {
        "Ki" => Ok(parse_int(value, quantity)? / KIB_PER_MIB),
        "Mi" => parse_int(value, quantity),
        "Gi" => Ok(parse_int(value, quantity)? * KIB_PER_MIB),
        "" => Ok(parse_int(value, quantity)? / BYTES_PER_MIB),
        _ => Err(QuantityError::UnsupportedSuffix(quantity.to_string())),
    }
}

/// Splits a quantity into its numeric part and unit suffix.
fn split_value(input: &str) -> Result<(&str, &str), QuantityError> {
    let input = input.trim();
    let index = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (value, suffix) = input.split_at(index);
    if value.is_empty() {
        return Err(QuantityError::Malformed(input.to_string()));
    }

    Ok((value, suffix))
}

fn parse_int(value: &str, original: &str) -> Result<i64, QuantityError> {
    value
        .parse::<i64>()
        .map_err(|_| QuantityError::Malformed(original.to_string()))
}

fn parse_cores(value: &str, original: &str) -> Result<f64, QuantityError> {
    value
        .parse::<f64>()
        .map_err(|_| QuantityError::Malformed(original.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_usage_suffixes() {
        assert_eq!(cpu_usage_nano("500m").unwrap(), 500_000_000);
        assert_eq!(cpu_usage_nano("2").unwrap(), 2_000_000_000);
        assert_eq!(cpu_usage_nano("112520n").unwrap(), 112_520);
        assert_eq!(cpu_usage_nano("750u").unwrap(), 750_000);
    }

    #[test]
    fn test_cpu_capacity() {
        assert_eq!(cpu_capacity_milli("4").unwrap(), 4_000);
        assert_eq!(cpu_capacity_milli("0.5").unwrap(), 500);
        assert_eq!(cpu_capacity_milli("1500m").unwrap(), 1_500);
    }

    #[test]
    fn test_memory_suffixes() {
        assert_eq!(memory_mi("1048576Ki").unwrap(), 1_024);
        assert_eq!(memory_mi("2048Mi").unwrap(), 2_048);
        assert_eq!(memory_mi("2Gi").unwrap(), 2_048);
        assert_eq!(memory_mi("2097152").unwrap(), 2);
        assert_eq!(memory_mi("8194300Ki").unwrap(), 8_002);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            cpu_usage_nano(""),
            Err(QuantityError::Malformed(String::new()))
        );
        assert_eq!(
            cpu_usage_nano("m"),
            Err(QuantityError::Malformed("m".to_string()))
        );
        assert!(matches!(
            memory_mi("128Pi"),
            Err(QuantityError::UnsupportedSuffix(_))
        ));
        assert!(matches!(
            cpu_usage_nano("12x"),
            Err(QuantityError::UnsupportedSuffix(_))
        ));
    }
}
