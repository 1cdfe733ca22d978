//! Event scoring formulas
//!
//! Deterministic, closed-form scoring for the dynamic and static events,
//! each tied to the rule clause it implements. The set of formulas is a
//! closed enum, so an unknown formula name is unrepresentable rather than a
//! runtime lookup failure. Exceeding a maximum time is a defined minimum
//! score, never an error; only physically invalid inputs fail.

use serde::Serialize;
use thiserror::Error;

/// Rule document versions the formulas are transcribed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleVersion {
    Rules2025V1_1,
    Handbook2025V1_3,
}

impl std::fmt::Display for RuleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleVersion::Rules2025V1_1 => "FS Rules 2025 v1.1",
            RuleVersion::Handbook2025V1_3 => "Competition Handbook 2025 v1.3.0",
        };
        write!(f, "{}", name)
    }
}

/// Validation failure for physically invalid formula inputs.
#[derive(Error, Debug, PartialEq)]
pub enum FormulaError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Standard result for every formula evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct FormulaOutcome {
    pub score: f64,
    pub formula: &'static str,
    pub rule_reference: &'static str,
    pub explanation: String,
    pub version: RuleVersion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkidpadParams {
    /// Team's corrected time in seconds.
    pub t_team: f64,
    /// Slowest corrected time plus 25% margin.
    pub t_max: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationParams {
    pub t_team: f64,
    /// Slowest corrected time plus one second.
    pub t_max: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocrossParams {
    pub t_team: f64,
    /// Fastest corrected time.
    pub t_min: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnduranceParams {
    pub t_team: f64,
    pub t_min: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyParams {
    pub e_team: f64,
    pub e_min: f64,
    pub t_team: f64,
    pub t_min: f64,
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostParams {
    pub cost_real: f64,
    pub cost_min: f64,
    pub p_max: f64,
}

impl Default for SkidpadParams {
    fn default() -> Self {
        Self { t_team: 0.0, t_max: 0.0, p_max: 75.0 }
    }
}

impl Default for AccelerationParams {
    fn default() -> Self {
        Self { t_team: 0.0, t_max: 0.0, p_max: 75.0 }
    }
}

impl Default for AutocrossParams {
    fn default() -> Self {
        Self { t_team: 0.0, t_min: 0.0, p_max: 100.0 }
    }
}

impl Default for EnduranceParams {
    fn default() -> Self {
        Self { t_team: 0.0, t_min: 0.0, p_max: 250.0 }
    }
}

impl Default for EfficiencyParams {
    fn default() -> Self {
        Self { e_team: 0.0, e_min: 0.0, t_team: 0.0, t_min: 0.0, p_max: 100.0 }
    }
}

impl Default for CostParams {
    fn default() -> Self {
        Self { cost_real: 0.0, cost_min: 0.0, p_max: 100.0 }
    }
}

/// The closed set of scoring formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringFormula {
    Skidpad(SkidpadParams),
    Acceleration(AccelerationParams),
    Autocross(AutocrossParams),
    Endurance(EnduranceParams),
    Efficiency(EfficiencyParams),
    Cost(CostParams),
}

impl ScoringFormula {
    /// Names of every formula, for listings and CLI help.
    pub const ALL_NAMES: [&'static str; 6] = [
        "skidpad_score",
        "acceleration_score",
        "autocross_score",
        "endurance_score",
        "efficiency_score",
        "cost_score",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoringFormula::Skidpad(_) => "skidpad_score",
            ScoringFormula::Acceleration(_) => "acceleration_score",
            ScoringFormula::Autocross(_) => "autocross_score",
            ScoringFormula::Endurance(_) => "endurance_score",
            ScoringFormula::Efficiency(_) => "efficiency_score",
            ScoringFormula::Cost(_) => "cost_score",
        }
    }

    pub fn rule_reference(&self) -> &'static str {
        match self {
            ScoringFormula::Skidpad(_) => "D 4.3.3",
            ScoringFormula::Acceleration(_) => "D 4.2.3",
            ScoringFormula::Autocross(_) => "D 5.1",
            ScoringFormula::Endurance(_) => "D 6.3",
            ScoringFormula::Efficiency(_) => "D 7.1",
            ScoringFormula::Cost(_) => "D 3.1",
        }
    }

    /// Evaluate the formula against its parameters.
    pub fn evaluate(&self) -> Result<FormulaOutcome, FormulaError> {
        match *self {
            ScoringFormula::Skidpad(p) => skidpad(p),
            ScoringFormula::Acceleration(p) => acceleration(p),
            ScoringFormula::Autocross(p) => time_ratio(
                p.t_team,
                p.t_min,
                p.p_max,
                "autocross_score",
                "D 5.1",
            ),
            ScoringFormula::Endurance(p) => time_ratio(
                p.t_team,
                p.t_min,
                p.p_max,
                "endurance_score",
                "D 6.3",
            ),
            ScoringFormula::Efficiency(p) => efficiency(p),
            ScoringFormula::Cost(p) => cost(p),
        }
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), FormulaError> {
    if value <= 0.0 {
        return Err(FormulaError::InvalidParameter {
            name,
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Skidpad: minimum score past `t_max`, otherwise a quadratic time ratio.
fn skidpad(p: SkidpadParams) -> Result<FormulaOutcome, FormulaError> {
    require_positive("t_team", p.t_team)?;

    let (score, explanation) = if p.t_team > p.t_max {
        (
            0.05 * p.p_max,
            format!(
                "Team exceeded max time ({}s > {}s), minimum score applied",
                p.t_team, p.t_max
            ),
        )
    } else {
        let term = (p.t_max / p.t_team).powi(2) - 1.0;
        let score = 0.95 * p.p_max * (term / 0.5625) + 0.05 * p.p_max;
        (
            score,
            format!(
                "Score = 0.95 x {} x [({}/{})^2 - 1] / 0.5625 + 0.05 x {} = {:.2} points",
                p.p_max, p.t_max, p.t_team, p.p_max, score
            ),
        )
    };

    Ok(FormulaOutcome {
        score: round2(score),
        formula: "skidpad_score",
        rule_reference: "D 4.3.3",
        explanation,
        version: RuleVersion::Rules2025V1_1,
    })
}

/// Acceleration: same shape as skidpad with a linear time ratio.
fn acceleration(p: AccelerationParams) -> Result<FormulaOutcome, FormulaError> {
    require_positive("t_team", p.t_team)?;

    let (score, explanation) = if p.t_team > p.t_max {
        (
            0.05 * p.p_max,
            format!(
                "Team exceeded max time ({}s > {}s), minimum score applied",
                p.t_team, p.t_max
            ),
        )
    } else {
        let term = p.t_max / p.t_team - 1.0;
        let score = 0.95 * p.p_max * (term / 0.3333) + 0.05 * p.p_max;
        (
            score,
            format!(
                "Score = 0.95 x {} x [({}/{}) - 1] / 0.3333 + 0.05 x {} = {:.2} points",
                p.p_max, p.t_max, p.t_team, p.p_max, score
            ),
        )
    };

    Ok(FormulaOutcome {
        score: round2(score),
        formula: "acceleration_score",
        rule_reference: "D 4.2.3",
        explanation,
        version: RuleVersion::Rules2025V1_1,
    })
}

/// Shared shape of autocross and endurance: `p_max * t_min / t_team`, with a
/// zero reference time scoring zero by definition.
fn time_ratio(
    t_team: f64,
    t_min: f64,
    p_max: f64,
    formula: &'static str,
    rule_reference: &'static str,
) -> Result<FormulaOutcome, FormulaError> {
    require_positive("t_team", t_team)?;

    let (score, explanation) = if t_min == 0.0 {
        (0.0, "No valid minimum time, score = 0".to_string())
    } else {
        let score = p_max * (t_min / t_team);
        (
            score,
            format!("Score = {p_max} x ({t_min}/{t_team}) = {score:.2} points"),
        )
    };

    Ok(FormulaOutcome {
        score: round2(score),
        formula,
        rule_reference,
        explanation,
        version: RuleVersion::Rules2025V1_1,
    })
}

/// Efficiency: energy-time factor capped at 1.0; non-positive inputs score
/// zero by definition rather than failing.
fn efficiency(p: EfficiencyParams) -> Result<FormulaOutcome, FormulaError> {
    let (score, explanation) = if p.e_team <= 0.0 || p.t_team <= 0.0 {
        (
            0.0,
            "Invalid parameters (energy or time <= 0), score = 0".to_string(),
        )
    } else {
        let factor = (p.e_min / p.e_team) * (p.t_min / p.t_team);
        let capped = factor.min(1.0);
        let score = p.p_max * capped;
        (
            score,
            format!(
                "Efficiency Factor = ({}/{}) x ({}/{}) = {:.4}\nScore = {} x {:.4} = {:.2} points",
                p.e_min, p.e_team, p.t_min, p.t_team, factor, p.p_max, capped, score
            ),
        )
    };

    Ok(FormulaOutcome {
        score: round2(score),
        formula: "efficiency_score",
        rule_reference: "D 7.1",
        explanation,
        version: RuleVersion::Rules2025V1_1,
    })
}

fn cost(p: CostParams) -> Result<FormulaOutcome, FormulaError> {
    require_positive("cost_real", p.cost_real)?;

    let (score, explanation) = if p.cost_min == 0.0 {
        (0.0, "No valid minimum cost, score = 0".to_string())
    } else {
        let score = p.p_max * (p.cost_min / p.cost_real);
        (
            score,
            format!(
                "Score = {} x ({}/{}) = {:.2} points",
                p.p_max, p.cost_min, p.cost_real, score
            ),
        )
    };

    Ok(FormulaOutcome {
        score: round2(score),
        formula: "cost_score",
        rule_reference: "D 3.1",
        explanation,
        version: RuleVersion::Rules2025V1_1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skidpad_within_max_time() {
        let outcome = ScoringFormula::Skidpad(SkidpadParams {
            t_team: 5.0,
            t_max: 6.0,
            p_max: 75.0,
        })
        .evaluate()
        .unwrap();

        // 0.95 * 75 * ((6/5)^2 - 1) / 0.5625 + 0.05 * 75 = 59.48
        assert!((outcome.score - 59.48).abs() < 0.01);
        assert_eq!(outcome.rule_reference, "D 4.3.3");
    }

    #[test]
    fn test_skidpad_exceeding_max_gets_floor_not_error() {
        let outcome = ScoringFormula::Skidpad(SkidpadParams {
            t_team: 7.0,
            t_max: 6.0,
            p_max: 75.0,
        })
        .evaluate()
        .unwrap();

        assert!((outcome.score - 3.75).abs() < 1e-9);
        assert!(outcome.explanation.contains("minimum score"));
    }

    #[test]
    fn test_skidpad_rejects_non_positive_time() {
        let result = ScoringFormula::Skidpad(SkidpadParams {
            t_team: 0.0,
            t_max: 6.0,
            p_max: 75.0,
        })
        .evaluate();

        assert!(matches!(
            result,
            Err(FormulaError::InvalidParameter { name: "t_team", .. })
        ));
    }

    #[test]
    fn test_acceleration_within_max_time() {
        let outcome = ScoringFormula::Acceleration(AccelerationParams {
            t_team: 4.0,
            t_max: 5.0,
            p_max: 75.0,
        })
        .evaluate()
        .unwrap();

        // 0.95 * 75 * ((5/4) - 1) / 0.3333 + 0.05 * 75 = 57.19
        assert!((outcome.score - 57.19).abs() < 0.01);
    }

    #[test]
    fn test_autocross_ratio() {
        let outcome = ScoringFormula::Autocross(AutocrossParams {
            t_team: 60.0,
            t_min: 55.0,
            p_max: 100.0,
        })
        .evaluate()
        .unwrap();

        assert!((outcome.score - 91.67).abs() < 0.01);
        assert_eq!(outcome.rule_reference, "D 5.1");
    }

    #[test]
    fn test_endurance_zero_reference_time() {
        let outcome = ScoringFormula::Endurance(EnduranceParams {
            t_team: 1300.0,
            t_min: 0.0,
            p_max: 250.0,
        })
        .evaluate()
        .unwrap();

        assert_eq!(outcome.score, 0.0);
        assert!(outcome.explanation.contains("No valid minimum time"));
    }

    #[test]
    fn test_efficiency_factor_capped() {
        let outcome = ScoringFormula::Efficiency(EfficiencyParams {
            e_team: 1.0,
            e_min: 2.0,
            t_team: 1.0,
            t_min: 2.0,
            p_max: 100.0,
        })
        .evaluate()
        .unwrap();

        // Factor 4.0 capped at 1.0.
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn test_efficiency_invalid_inputs_score_zero() {
        let outcome = ScoringFormula::Efficiency(EfficiencyParams {
            e_team: 0.0,
            ..Default::default()
        })
        .evaluate()
        .unwrap();

        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_cost_score() {
        let outcome = ScoringFormula::Cost(CostParams {
            cost_real: 25_000.0,
            cost_min: 20_000.0,
            p_max: 100.0,
        })
        .evaluate()
        .unwrap();

        assert_eq!(outcome.score, 80.0);
    }

    #[test]
    fn test_cost_rejects_non_positive_cost() {
        let result = ScoringFormula::Cost(CostParams {
            cost_real: -1.0,
            cost_min: 20_000.0,
            p_max: 100.0,
        })
        .evaluate();

        assert!(result.is_err());
    }

    #[test]
    fn test_all_names_cover_every_variant() {
        let formulas = [
            ScoringFormula::Skidpad(SkidpadParams::default()),
            ScoringFormula::Acceleration(AccelerationParams::default()),
            ScoringFormula::Autocross(AutocrossParams::default()),
            ScoringFormula::Endurance(EnduranceParams::default()),
            ScoringFormula::Efficiency(EfficiencyParams::default()),
            ScoringFormula::Cost(CostParams::default()),
        ];

        for formula in &formulas {
            assert!(ScoringFormula::ALL_NAMES.contains(&formula.name()));
        }
    }
}
