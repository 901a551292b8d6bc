use crate::simulation::config::Smoothing;

/// Smooths one streetlight's raw voltages, given in slice order. The output has the same
/// length as the input. A constant input yields exactly that constant.
pub fn smooth(smoothing: &Smoothing, raw: &[f64]) -> Vec<f64> {
    match *smoothing {
        Smoothing::Exponential { alpha } => exponential(alpha, raw),
        Smoothing::MovingAverage { window } => moving_average(window, raw),
    }
}

fn exponential(alpha: f64, raw: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(raw.len());
    let mut state: Option<f64> = None;
    for value in raw {
        let next = match state {
            None => *value,
            Some(previous) => previous + alpha * (value - previous),
        };
        result.push(next);
        state = Some(next);
    }
    result
}

/// Trailing window over the current and the `window - 1` preceding values. The first values
/// average over what is available.
fn moving_average(window: usize, raw: &[f64]) -> Vec<f64> {
    let window = window.max(1);
    (0..raw.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            // running mean, so that equal values average to exactly that value
            raw[start..=i]
                .iter()
                .enumerate()
                .fold(0., |mean, (n, value)| mean + (value - mean) / (n + 1) as f64)
        })
        .collect()
}
