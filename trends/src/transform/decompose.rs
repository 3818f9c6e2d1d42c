//! Additive seasonal decomposition.
//!
//! `observed = trend + seasonal + residual`, where the trend is a centred
//! moving average over one seasonal period and the seasonal component is the
//! per-phase mean of the detrended series, centred on zero. The trend (and so
//! the residual) is undefined for the first and last `period / 2` points.

use crate::error::DecomposeError;

/// Components of an additive decomposition, aligned with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub period: usize,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub resid: Vec<Option<f64>>,
}

/// Decompose a regularly spaced series with the given seasonal period.
///
/// Needs at least two full cycles and no missing values.
pub fn seasonal_decompose(
    values: &[Option<f64>],
    period: usize,
) -> Result<Decomposition, DecomposeError> {
    if period < 2 {
        return Err(DecomposeError::InvalidPeriod(period));
    }
    if values.len() < 2 * period {
        return Err(DecomposeError::TooShort {
            required: 2 * period,
            actual: values.len(),
        });
    }
    let observed = values
        .iter()
        .enumerate()
        .map(|(i, v)| v.filter(|v| !v.is_nan()).ok_or(DecomposeError::MissingValue(i)))
        .collect::<Result<Vec<f64>, _>>()?;

    let trend = moving_average(&observed, period);

    let detrended: Vec<Option<f64>> = observed
        .iter()
        .zip(&trend)
        .map(|(x, t)| t.map(|t| x - t))
        .collect();

    let mut phase_means: Vec<f64> = (0..period)
        .map(|phase| {
            let phase_values: Vec<f64> = detrended
                .iter()
                .skip(phase)
                .step_by(period)
                .flatten()
                .copied()
                .collect();
            if phase_values.is_empty() {
                0.0
            } else {
                phase_values.iter().sum::<f64>() / phase_values.len() as f64
            }
        })
        .collect();
    let centre = phase_means.iter().sum::<f64>() / period as f64;
    for m in phase_means.iter_mut() {
        *m -= centre;
    }

    let seasonal: Vec<f64> = (0..observed.len()).map(|i| phase_means[i % period]).collect();
    let resid = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d.map(|d| d - s))
        .collect();

    Ok(Decomposition {
        period,
        observed,
        trend,
        seasonal,
        resid,
    })
}

/// Centred moving average over one period.
///
/// Even periods use the `[0.5, 1, ..., 1, 0.5] / period` filter so the window
/// stays centred on the point; odd periods use a flat `1 / period` filter.
pub fn moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let weights = centred_weights(period);
    let half = weights.len() / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let window = &values[i - half..=i + half];
            Some(window.iter().zip(&weights).map(|(x, w)| x * w).sum())
        })
        .collect()
}

fn centred_weights(period: usize) -> Vec<f64> {
    let p = period as f64;
    if period % 2 == 0 {
        let mut weights = vec![1.0 / p; period + 1];
        weights[0] = 0.5 / p;
        weights[period] = 0.5 / p;
        weights
    } else {
        vec![1.0 / p; period]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_recovers_linear_trend_and_season() {
        let pattern = [3.0, -1.0, -4.0, 2.0];
        let values: Vec<Option<f64>> = (0..16)
            .map(|i| Some(i as f64 * 2.0 + pattern[i % 4]))
            .collect();

        let d = seasonal_decompose(&values, 4).unwrap();

        assert!(d.trend[..2].iter().all(Option::is_none));
        assert!(d.trend[14..].iter().all(Option::is_none));
        for i in 2..14 {
            let t = d.trend[i].unwrap();
            assert!((t - i as f64 * 2.0).abs() < EPS, "trend[{i}] = {t}");
            assert!((d.seasonal[i] - pattern[i % 4]).abs() < EPS);
            assert!(d.resid[i].unwrap().abs() < EPS);
        }
    }

    #[test]
    fn test_odd_period_window() {
        let values: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ma = moving_average(&values, 3);
        assert_eq!(ma[0], None);
        assert!((ma[1].unwrap() - 2.0).abs() < EPS);
        assert!((ma[4].unwrap() - 5.0).abs() < EPS);
        assert_eq!(ma[5], None);
    }

    #[test]
    fn test_even_period_edges() {
        let values: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let ma = moving_average(&values, 12);
        assert_eq!(ma.iter().filter(|v| v.is_some()).count(), 12);
        assert!(ma[5].is_none());
        assert!((ma[6].unwrap() - 6.0).abs() < EPS);
        assert!((ma[17].unwrap() - 17.0).abs() < EPS);
        assert!(ma[18].is_none());
    }

    #[test]
    fn test_requires_two_cycles() {
        let values = vec![Some(1.0); 23];
        assert_eq!(
            seasonal_decompose(&values, 12),
            Err(DecomposeError::TooShort {
                required: 24,
                actual: 23
            })
        );
    }

    #[test]
    fn test_rejects_missing_values() {
        let mut values = vec![Some(1.0); 24];
        values[7] = None;
        assert_eq!(
            seasonal_decompose(&values, 12),
            Err(DecomposeError::MissingValue(7))
        );
    }
}
