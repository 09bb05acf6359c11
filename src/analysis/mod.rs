//! Validation, hallucination checks, aggregation, risk and the deployment gate.

pub mod decision;
pub mod hallucination;
pub mod metrics;
pub mod risk;
pub mod validator;

/// Round half away from zero to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn round2_behaves() {
        assert!((round2(66.666_666) - 66.67).abs() < 1e-12);
        assert!((round2(0.004) - 0.0).abs() < 1e-12);
        assert!((round2(-1.235) + 1.24).abs() < 0.011);
    }
}
