//! Instance file naming: the parameters of a generated instance are encoded
//! in its file name and recovered from it during aggregation.
//!
//! The grammar is
//! `binpacking{index}_{count}count_{max}max_{center}center_{variability}variability_{algorithm}`,
//! with the decoder taking the digit runs of the tokens at indices 1, 3 and 4
//! of the `_`-split name. Both sides of the codec live here so the generation,
//! orchestration and aggregation stages can never drift apart.

use crate::error::NameError;
use crate::matrix::ParameterPoint;

/// Minimum number of `_`-separated tokens in a well-formed instance name.
const MIN_TOKENS: usize = 5;

/// Parameters recovered from an instance file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedName {
    /// Item count per instance.
    pub count: u32,
    /// Size center as a percentage of bin capacity.
    pub center: u32,
    /// Item size variability level.
    pub variability: u32,
}

/// Builds the base name (no extension) of the `index`-th instance of a
/// parameter point.
pub fn instance_base_name(index: u32, point: &ParameterPoint, max_size: u32) -> String {
    format!(
        "binpacking{}_{}count_{}max_{}center_{}variability_{}",
        index, point.item_count, max_size, point.size_center, point.variability, point.algorithm
    )
}

/// Builds the result file name paired with an instance base name.
pub fn result_file_name(base: &str) -> String {
    format!("{base}_results.json")
}

/// Decodes `count`, `center` and `variability` from an instance base name.
///
/// The name must already be stripped of its extension. Validation is strict:
/// a short name or a parameter token without digits is an error, so malformed
/// names are rejected rather than silently producing bogus rows.
pub fn parse_instance_name(name: &str) -> Result<DecodedName, NameError> {
    let tokens: Vec<&str> = name.split('_').collect();
    if tokens.len() < MIN_TOKENS {
        return Err(NameError::TooFewTokens {
            name: name.to_string(),
            found: tokens.len(),
            expected: MIN_TOKENS,
        });
    }

    Ok(DecodedName {
        count: digit_run(name, tokens[1])?,
        center: digit_run(name, tokens[3])?,
        variability: digit_run(name, tokens[4])?,
    })
}

/// Extracts the digits of a token and parses them as a number.
fn digit_run(name: &str, token: &str) -> Result<u32, NameError> {
    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(NameError::NoDigits {
            name: name.to_string(),
            token: token.to_string(),
        });
    }
    digits.parse().map_err(|source| NameError::OutOfRange {
        name: name.to_string(),
        token: token.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ParameterPoint;

    fn point(algorithm: &str, count: u32, center: u32, variability: u32) -> ParameterPoint {
        ParameterPoint {
            algorithm: algorithm.to_string(),
            item_count: count,
            size_center: center,
            variability,
            duplicates: 1,
        }
    }

    #[test]
    fn test_base_name_layout() {
        let name = instance_base_name(7, &point("NextFit", 100, 50, 2), 100);
        assert_eq!(name, "binpacking7_100count_100max_50center_2variability_NextFit");
    }

    #[test]
    fn test_result_name_suffix() {
        assert_eq!(
            result_file_name("binpacking0_50count_100max_25center_1variability_BestFit"),
            "binpacking0_50count_100max_25center_1variability_BestFit_results.json"
        );
    }

    #[test]
    fn test_roundtrip_over_grid_values() {
        for &count in &[50u32, 100, 500] {
            for &center in &[25u32, 50, 75] {
                for &variability in &[1u32, 2, 3] {
                    let p = point("ModifiedFirstFitDecreasing", count, center, variability);
                    let name = instance_base_name(9999, &p, 100);
                    let decoded = parse_instance_name(&name).unwrap();
                    assert_eq!(decoded.count, count);
                    assert_eq!(decoded.center, center);
                    assert_eq!(decoded.variability, variability);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_arbitrary_digits() {
        let p = point("FirstFit", 123456, 7, 42);
        let decoded = parse_instance_name(&instance_base_name(0, &p, 999)).unwrap();
        assert_eq!(decoded.count, 123456);
        assert_eq!(decoded.center, 7);
        assert_eq!(decoded.variability, 42);
    }

    #[test]
    fn test_short_name_rejected() {
        let err = parse_instance_name("binpacking0_50count").unwrap_err();
        assert!(matches!(
            err,
            crate::error::NameError::TooFewTokens { found: 2, .. }
        ));
    }

    #[test]
    fn test_digitless_token_rejected() {
        let err = parse_instance_name("binpacking0_count_100max_center_1variability_NextFit")
            .unwrap_err();
        assert!(matches!(err, crate::error::NameError::NoDigits { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(parse_instance_name("").is_err());
    }
}
