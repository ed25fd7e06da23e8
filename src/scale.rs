// Scale correction for numeric fields whose source encoding drops the decimal
// point at an inconsistent position. Each helper looks at a single value only.

/// Upper bound for a strikes-landed rate once corrected.
const MAX_STRIKE_RATE: f64 = 20.0;
/// Upper bound for a takedowns-landed rate once corrected.
const MAX_TAKEDOWN_RATE: f64 = 15.0;

/// Height or reach in centimetres.
///
/// `17272` (172.72 cm with the point dropped) becomes `172`, `1810` becomes
/// `181`, and a value already below 1000 is only cut to whole centimetres.
/// The result is always below 1000 for plausible input, so correcting twice
/// changes nothing.
pub fn correct_length(raw: f64) -> f64 {
    let cm = if raw >= 10_000.0 {
        raw / 100.0
    } else if raw >= 1_000.0 {
        raw / 10.0
    } else {
        raw
    };
    cm.trunc()
}

/// Total fight time, stored in tenths of a second.
pub fn correct_duration(raw: f64) -> f64 {
    (raw / 10.0).round_ties_even()
}

/// Finish round, stored multiplied by ten (round 2 arrives as `20`).
pub fn correct_round(raw: f64) -> f64 {
    (raw / 10.0).round_ties_even()
}

/// Significant strikes landed per minute.
///
/// Zero is a real observation and is returned as is.
pub fn correct_strike_rate(raw: f64) -> f64 {
    if raw == 0.0 {
        return raw;
    }
    if raw < 100.0 {
        raw / 10.0
    } else if raw < 1_000.0 {
        raw / 100.0
    } else {
        shrink_until(raw, MAX_STRIKE_RATE)
    }
}

/// Takedowns landed per 15 minutes.
///
/// Values under 100 and under 1000 share the same divisor, unlike strikes.
pub fn correct_takedown_rate(raw: f64) -> f64 {
    if raw == 0.0 {
        return raw;
    }
    if raw < 1_000.0 {
        raw / 100.0
    } else {
        shrink_until(raw, MAX_TAKEDOWN_RATE)
    }
}

/// Divides by the smallest power of ten that brings `value` to `ceiling` or
/// below. The division happens once so the result carries no accumulated
/// rounding error.
fn shrink_until(value: f64, ceiling: f64) -> f64 {
    // Callers only pass finite values, so this terminates.
    let mut exponent = 0;
    let mut scaled = value;
    while scaled > ceiling {
        exponent += 1;
        scaled = value / 10f64.powi(exponent);
    }
    scaled
}
