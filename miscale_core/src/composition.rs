//! Body-composition estimator.
//!
//! All formulas here are heuristic approximations, not vendor-exact and not medically
//! validated. Without an impedance reading no composition is produced.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EstimatorCfg;
use crate::fixed_point::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ObesityI,
    ObesityII,
    ObesityIII,
}

impl BmiCategory {
    pub fn of(bmi: f32) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else if bmi < 35.0 {
            Self::ObesityI
        } else if bmi < 40.0 {
            Self::ObesityII
        } else {
            Self::ObesityIII
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Underweight => "underweight",
            Self::Normal => "normal",
            Self::Overweight => "overweight",
            Self::ObesityI => "obesity class I",
            Self::ObesityII => "obesity class II",
            Self::ObesityIII => "obesity class III",
        }
    }
}

/// Approximate composition metrics, each rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyComposition {
    pub body_fat_pct: f32,
    pub muscle_mass_kg: f32,
    pub body_water_pct: f32,
    pub basal_metabolism_kcal: f32,
}

/// Direction of change against the previous finalized weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightTrend {
    Up,
    Down,
    Steady,
}

/// How the final weight was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementQuality {
    /// The convergence check accepted a run of agreeing readings.
    Stabilized,
    /// Timeout fallback: the most recent reading only.
    SingleSample,
}

/// Output of the stabilization step handed to the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedWeight {
    pub weight_kg: f32,
    pub impedance_ohms: Option<u16>,
    pub quality: MeasurementQuality,
    pub sample_count: usize,
}

/// The one weighing a session produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedMeasurement {
    /// Rounded to 0.01 kg.
    pub weight_kg: f32,
    /// Rounded to 0.1.
    pub bmi: f32,
    pub bmi_category: BmiCategory,
    /// `None` when the scale reported no impedance.
    pub composition: Option<BodyComposition>,
    pub impedance_ohms: Option<u16>,
    pub quality: MeasurementQuality,
    pub sample_count: usize,
    /// `None` for the first weighing of a session object.
    pub trend: Option<WeightTrend>,
    pub measured_at: DateTime<Utc>,
}

impl FinalizedMeasurement {
    pub fn is_degraded(&self) -> bool {
        self.quality == MeasurementQuality::SingleSample
    }
}

#[derive(Debug, Clone, Default)]
pub struct BodyCompositionEstimator {
    cfg: EstimatorCfg,
}

impl BodyCompositionEstimator {
    pub fn new(cfg: EstimatorCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &EstimatorCfg {
        &self.cfg
    }

    /// `weight / height_m²`, rounded to one decimal.
    pub fn bmi(weight_kg: f32, height_cm: f32) -> f32 {
        let h = height_cm / 100.0;
        if h <= 0.0 || !h.is_finite() {
            return 0.0;
        }
        round_to(weight_kg / (h * h), 1)
    }

    pub fn composition(&self, weight_kg: f32, impedance_ohms: Option<u16>) -> Option<BodyComposition> {
        let z = f32::from(impedance_ohms.filter(|&z| z > 0)?);
        let fat = (15.0 + z / 100.0).clamp(5.0, 50.0);
        let lean = weight_kg * (1.0 - fat / 100.0);
        let muscle = lean * 0.9;
        let water = ((100.0 - fat) * 0.73).clamp(35.0, 75.0);
        let bmr = 1200.0 + 15.0 * weight_kg + self.cfg.bmr_muscle_coeff * muscle;
        Some(BodyComposition {
            body_fat_pct: round_to(fat, 1),
            muscle_mass_kg: round_to(muscle, 1),
            body_water_pct: round_to(water, 1),
            basal_metabolism_kcal: round_to(bmr, 1),
        })
    }

    pub fn trend(&self, previous_kg: Option<f32>, current_kg: f32) -> Option<WeightTrend> {
        let prev = previous_kg?;
        let delta = round_to(current_kg - prev, 2);
        let t = self.cfg.trend_threshold_kg;
        Some(if delta > 0.0 && delta >= t {
            WeightTrend::Up
        } else if delta < 0.0 && -delta >= t {
            WeightTrend::Down
        } else {
            WeightTrend::Steady
        })
    }

    pub fn finalize(
        &self,
        accepted: AcceptedWeight,
        height_cm: f32,
        previous_kg: Option<f32>,
        measured_at: DateTime<Utc>,
    ) -> FinalizedMeasurement {
        let weight_kg = round_to(accepted.weight_kg, 2);
        let bmi = Self::bmi(weight_kg, height_cm);
        FinalizedMeasurement {
            weight_kg,
            bmi,
            bmi_category: BmiCategory::of(bmi),
            composition: self.composition(weight_kg, accepted.impedance_ohms),
            impedance_ohms: accepted.impedance_ohms,
            quality: accepted.quality,
            sample_count: accepted.sample_count,
            trend: self.trend(previous_kg, weight_kg),
            measured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn bmi_rounds_to_one_decimal() {
        assert!(approx(BodyCompositionEstimator::bmi(70.0, 175.0), 22.9));
        assert!(approx(BodyCompositionEstimator::bmi(70.0, 170.0), 24.2));
    }

    #[rstest]
    #[case(18.4, BmiCategory::Underweight)]
    #[case(18.5, BmiCategory::Normal)]
    #[case(24.9, BmiCategory::Normal)]
    #[case(25.0, BmiCategory::Overweight)]
    #[case(30.0, BmiCategory::ObesityI)]
    #[case(35.0, BmiCategory::ObesityII)]
    #[case(40.0, BmiCategory::ObesityIII)]
    fn bmi_categories(#[case] bmi: f32, #[case] expected: BmiCategory) {
        assert_eq!(BmiCategory::of(bmi), expected);
    }

    #[test]
    fn composition_from_impedance() {
        let est = BodyCompositionEstimator::default();
        let c = est.composition(70.0, Some(500)).expect("impedance present");
        // fat = 15 + 5 = 20 %, lean = 56 kg, muscle = 50.4 kg
        assert!(approx(c.body_fat_pct, 20.0));
        assert!(approx(c.muscle_mass_kg, 50.4));
        assert!(approx(c.body_water_pct, 58.4));
        // 1200 + 1050 + 15 * 50.4
        assert!(approx(c.basal_metabolism_kcal, 3006.0));
    }

    #[test]
    fn composition_clamps() {
        let est = BodyCompositionEstimator::default();
        let c = est.composition(80.0, Some(9_000)).expect("impedance present");
        assert!(approx(c.body_fat_pct, 50.0));
        assert!(approx(c.body_water_pct, 36.5));
    }

    #[test]
    fn no_impedance_no_composition() {
        let est = BodyCompositionEstimator::default();
        assert!(est.composition(70.0, None).is_none());
        assert!(est.composition(70.0, Some(0)).is_none());
    }

    #[test]
    fn bmr_uses_configured_coefficient() {
        let est = BodyCompositionEstimator::new(EstimatorCfg {
            bmr_muscle_coeff: 25.0,
            ..EstimatorCfg::default()
        });
        let c = est.composition(70.0, Some(500)).expect("impedance present");
        assert!(approx(c.basal_metabolism_kcal, 3510.0));
    }

    #[rstest]
    #[case(None, 70.0, None)]
    #[case(Some(70.0), 70.05, Some(WeightTrend::Steady))]
    #[case(Some(70.0), 70.1, Some(WeightTrend::Up))]
    #[case(Some(70.0), 69.9, Some(WeightTrend::Down))]
    fn trend_against_previous(
        #[case] prev: Option<f32>,
        #[case] current: f32,
        #[case] expected: Option<WeightTrend>,
    ) {
        let est = BodyCompositionEstimator::default();
        assert_eq!(est.trend(prev, current), expected);
    }

    #[test]
    fn finalize_assembles_measurement() {
        let est = BodyCompositionEstimator::default();
        let m = est.finalize(
            AcceptedWeight {
                weight_kg: 70.0167,
                impedance_ohms: None,
                quality: MeasurementQuality::SingleSample,
                sample_count: 1,
            },
            175.0,
            None,
            Utc::now(),
        );
        assert!(approx(m.weight_kg, 70.02));
        assert!(approx(m.bmi, 22.9));
        assert_eq!(m.bmi_category, BmiCategory::Normal);
        assert!(m.composition.is_none());
        assert!(m.is_degraded());
        assert!(m.trend.is_none());
    }
}
