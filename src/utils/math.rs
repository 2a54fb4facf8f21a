//! Math utility functions

/// Index of the largest value. Ties resolve to the lowest index and NaN
/// entries never win. Returns `None` for an empty slice.
pub fn argmax(x: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in x.iter().enumerate() {
        match best {
            Some((_, current)) if !(value > current) => {}
            _ if value.is_nan() => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(x: &[f64]) -> Option<f64> {
    if x.is_empty() {
        return None;
    }
    Some(x.iter().sum::<f64>() / x.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        let x = vec![1.0, 5.0, 3.0, 2.0];
        assert_eq!(argmax(&x), Some(1));
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        let x = vec![2.0, 7.0, 7.0, 1.0];
        assert_eq!(argmax(&x), Some(1));
    }

    #[test]
    fn test_argmax_skips_nan() {
        let x = vec![f32::NAN, 0.5, 0.2];
        assert_eq!(argmax(&x), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }
}
