//! Test-number range expansion.
//!
//! A range spec is a comma-separated list of fields: `N`, `MIN-MAX` or
//! `MIN-MAX-STEP`, all inclusive. Specs may also arrive as nested lists of
//! such strings; results are concatenated in encounter order with no sorting
//! or dedup.
use crate::error::{GenError, GenResult};
use serde::Deserialize;

/// A single spec string or an arbitrarily nested list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Single(String),
    List(Vec<RangeSpec>),
}

impl From<&str> for RangeSpec {
    fn from(value: &str) -> Self {
        RangeSpec::Single(value.to_string())
    }
}

impl RangeSpec {
    pub fn expand(&self) -> GenResult<Vec<i64>> {
        let mut out = Vec::new();
        self.expand_into(&mut out)?;
        Ok(out)
    }

    fn expand_into(&self, out: &mut Vec<i64>) -> GenResult<()> {
        match self {
            RangeSpec::Single(spec) => out.extend(expand_str(spec)?),
            RangeSpec::List(items) => {
                for item in items {
                    item.expand_into(out)?;
                }
            }
        }
        Ok(())
    }
}

/// Expand one spec string into its ordered test numbers.
pub fn expand_str(spec: &str) -> GenResult<Vec<i64>> {
    if spec.trim().is_empty() {
        return Err(GenError::range(spec, "no fields"));
    }
    let mut out = Vec::new();
    for field in spec.split(',') {
        expand_field(spec, field.trim(), &mut out)?;
    }
    Ok(out)
}

fn expand_field(spec: &str, field: &str, out: &mut Vec<i64>) -> GenResult<()> {
    let parts = field
        .split('-')
        .map(|part| parse_bound(spec, part))
        .collect::<GenResult<Vec<i64>>>()?;
    match parts.as_slice() {
        [single] => out.push(*single),
        [min, max] => out.extend(*min..=*max),
        [min, max, step] => push_stepped(spec, *min, *max, *step, out)?,
        _ => {
            return Err(GenError::range(
                spec,
                format!("field {field:?} has {} components (at most 3)", parts.len()),
            ))
        }
    }
    Ok(())
}

fn parse_bound(spec: &str, part: &str) -> GenResult<i64> {
    let part = part.trim();
    part.parse::<i64>()
        .map_err(|_| GenError::range(spec, format!("{part:?} is not an integer")))
}

fn push_stepped(spec: &str, min: i64, max: i64, step: i64, out: &mut Vec<i64>) -> GenResult<()> {
    if step == 0 {
        return Err(GenError::range(spec, "step must not be zero"));
    }
    let mut value = min;
    while (step > 0 && value <= max) || (step < 0 && value >= max) {
        out.push(value);
        value = match value.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_single_value() {
        assert_eq!(expand_str("3").unwrap(), vec![3]);
    }

    #[test]
    fn expands_inclusive_range() {
        assert_eq!(expand_str("1-5").unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn expands_stepped_range() {
        assert_eq!(expand_str("1-10-3").unwrap(), vec![1, 4, 7, 10]);
        assert_eq!(expand_str("1-9-3").unwrap(), vec![1, 4, 7]);
    }

    #[test]
    fn expands_mixed_fields_in_order() {
        assert_eq!(expand_str("1,3,5-7").unwrap(), vec![1, 3, 5, 6, 7]);
        assert_eq!(expand_str("5,1,5").unwrap(), vec![5, 1, 5]);
    }

    #[test]
    fn expands_nested_lists() {
        let spec: RangeSpec = serde_json::from_str(r#"["1-2", ["5", "3"]]"#).unwrap();
        assert_eq!(spec.expand().unwrap(), vec![1, 2, 5, 3]);
    }

    #[test]
    fn empty_when_min_exceeds_max() {
        assert!(expand_str("5-3").unwrap().is_empty());
    }

    #[test]
    fn rejects_too_many_components() {
        let err = expand_str("1-2-3-4").unwrap_err();
        assert!(matches!(err, GenError::MalformedRange { .. }), "{err}");
    }

    #[test]
    fn rejects_non_integers_and_empty_fields() {
        for spec in ["", "a", "1,,2", "1-x", "1.5"] {
            assert!(
                matches!(expand_str(spec), Err(GenError::MalformedRange { .. })),
                "{spec:?} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_zero_step() {
        assert!(matches!(
            expand_str("1-5-0"),
            Err(GenError::MalformedRange { .. })
        ));
    }
}
