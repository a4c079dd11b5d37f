//! Measure text → fluid ounces.

use std::sync::LazyLock;

use regex::Regex;

/// Leading quantity (mixed number, fraction, or decimal), an optional range
/// tail, then an optional unit word.
static MEASURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^\s*
        (?:
            (?P<whole>\d+)\s+(?P<mixed_num>\d+)/(?P<mixed_den>\d+)
          | (?P<num>\d+)/(?P<den>\d+)
          | (?P<dec>\d+(?:\.\d+)?)
        )
        \s*(?:-\s*[\d/.]+\s*)?
        (?P<unit>[A-Za-z]+)?
        ",
    )
    .expect("valid regex")
});

/// Convert a measure such as `1 1/2 oz` or `3 cl` to fluid ounces.
///
/// Ranges use their lower bound. Returns `0.0` when there is no leading
/// quantity or the unit is not a volume we know.
pub fn parse_measure(measure: &str) -> f64 {
    let Some(caps) = MEASURE_RE.captures(measure) else {
        return 0.0;
    };

    let quantity = if let (Some(w), Some(n), Some(d)) =
        (caps.name("whole"), caps.name("mixed_num"), caps.name("mixed_den"))
    {
        fraction(n.as_str(), d.as_str()).map(|f| parse_f64(w.as_str()) + f)
    } else if let (Some(n), Some(d)) = (caps.name("num"), caps.name("den")) {
        fraction(n.as_str(), d.as_str())
    } else {
        caps.name("dec").map(|m| parse_f64(m.as_str()))
    };

    let Some(quantity) = quantity else {
        return 0.0;
    };

    let factor = caps
        .name("unit")
        .map(|u| unit_to_oz(&u.as_str().to_ascii_lowercase()))
        .unwrap_or(0.0);

    round3(quantity * factor)
}

fn parse_f64(s: &str) -> f64 {
    s.parse().unwrap_or(0.0)
}

fn fraction(num: &str, den: &str) -> Option<f64> {
    let den = parse_f64(den);
    (den > 0.0).then(|| parse_f64(num) / den)
}

/// Ounces per one unit.
fn unit_to_oz(unit: &str) -> f64 {
    match unit {
        "oz" | "ounce" | "ounces" | "fl" => 1.0,
        "cl" => 0.33814,
        "ml" => 0.033814,
        "shot" | "shots" | "jigger" | "jiggers" => 1.5,
        "tsp" | "teaspoon" | "teaspoons" => 1.0 / 6.0,
        "tbsp" | "tblsp" | "tablespoon" | "tablespoons" => 0.5,
        "cup" | "cups" => 8.0,
        "dash" | "dashes" => 0.03125,
        "part" | "parts" => 1.0,
        _ => 0.0,
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ounces() {
        assert_eq!(parse_measure("2 oz"), 2.0);
        assert_eq!(parse_measure("1 1/2 oz"), 1.5);
        assert_eq!(parse_measure("1/2 oz"), 0.5);
        assert_eq!(parse_measure("0.75 oz "), 0.75);
        assert_eq!(parse_measure("1-2 oz"), 1.0);
    }

    #[test]
    fn metric_and_bar_units() {
        assert_eq!(parse_measure("3 cl"), 1.014);
        assert_eq!(parse_measure("30 ml"), 1.014);
        assert_eq!(parse_measure("1 shot"), 1.5);
        assert_eq!(parse_measure("2 tblsp"), 1.0);
        assert_eq!(parse_measure("1 cup"), 8.0);
    }

    #[test]
    fn dashes_teaspoons_and_parts() {
        // 0.03125 oz per dash, rounded to three places
        assert_eq!(parse_measure("8 dashes"), 0.25);
        assert_eq!(parse_measure("1 dash"), 0.031);
        assert_eq!(parse_measure("3 tsp"), 0.5);
        assert_eq!(parse_measure("1 tsp"), 0.167);
        assert_eq!(parse_measure("1 part"), 1.0);
        assert_eq!(parse_measure("2 parts"), 2.0);
    }

    #[test]
    fn unconvertible_measures_are_zero() {
        assert_eq!(parse_measure("Juice of 1"), 0.0);
        assert_eq!(parse_measure("Top up"), 0.0);
        assert_eq!(parse_measure("2"), 0.0);
        assert_eq!(parse_measure("3 leaves"), 0.0);
        assert_eq!(parse_measure("1/0 oz"), 0.0);
        assert_eq!(parse_measure(""), 0.0);
    }
}
