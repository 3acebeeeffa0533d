use crate::consts::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelProgress {
    pub level: usize,
    /// Percentage through the current level, 0..=100.
    pub progress: f64,
    pub current: f64,
    pub required: f64,
}

/// 1-based level for a lifetime mined total. Level `n` starts at
/// `LEVEL_MILESTONES[n - 1]`.
pub fn user_level(total_mined: f64) -> usize {
    LEVEL_MILESTONES
        .iter()
        .rposition(|&threshold| total_mined >= threshold)
        .map_or(1, |i| i + 1)
}

pub fn level_progress(total_mined: f64) -> LevelProgress {
    let level = user_level(total_mined);
    let start = LEVEL_MILESTONES[level - 1];

    // The last level has no ceiling.
    if level > MAX_LEVEL {
        return LevelProgress {
            level,
            progress: 100.0,
            current: total_mined - start,
            required: 0.0,
        };
    }

    let end = LEVEL_MILESTONES[level];
    let required = end - start;
    let current = total_mined - start;
    LevelProgress {
        level,
        progress: (current / required * 100.0).clamp(0.0, 100.0),
        current,
        required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(user_level(0.0), 1);
        assert_eq!(user_level(499.9), 1);
        assert_eq!(user_level(500.0), 2);
        assert_eq!(user_level(1_999.0), 3);
        assert_eq!(user_level(5_000.0), 5);
        assert_eq!(user_level(1e9), 5);
    }

    #[test]
    fn test_progress() {
        let p = level_progress(250.0);
        assert_eq!(p.level, 1);
        assert_eq!(p.required, 500.0);
        assert!((p.progress - 50.0).abs() < 1e-9);

        let p = level_progress(1_500.0);
        assert_eq!(p.level, 3);
        assert_eq!(p.current, 500.0);
        assert_eq!(p.required, 1_000.0);

        let p = level_progress(9_000.0);
        assert_eq!(p.level, 5);
        assert_eq!(p.progress, 100.0);
    }
}
