/// Descriptive statistics summarizing a dataset.
///
/// This structure contains the measures of central tendency and dispersion
/// used by the preprocessing pipeline: imputation medians and the covariate
/// standardization applied before fitting the Cox model.
#[derive(Debug, Clone)]
pub struct DescriptiveStats {
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The median value of the dataset.
    ///
    /// For an even number of values this is the midpoint of the two middle
    /// values.
    pub median: f64,
    /// The sample standard deviation (`n - 1` denominator).
    ///
    /// Zero for single-value datasets.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// Non-finite values (`NaN`, infinities) are skipped, which makes this
    /// safe to call on a column where missing entries are encoded as `NaN`.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one finite value
    /// * `None` - otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// # use nsmp_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, f64::NAN, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.mean, 2.75);
    /// assert_eq!(stats.median, 2.5);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values
            .into_iter()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted finite values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        if sorted_values.is_empty() {
            return None;
        }
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = median_of_sorted(sorted_values);
        let std_dev = if count > 1 {
            let ss = sorted_values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            mean,
            median,
            std_dev,
        })
    }
}

/// Median of pre-sorted values, averaging the two middle values for even
/// lengths. Returns `NaN` for an empty slice.
///
/// # Examples
///
/// ```
/// use nsmp_stats::descriptive::median_of_sorted;
///
/// assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0]), 2.0);
/// assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0, 10.0]), 2.5);
/// ```
#[must_use]
pub fn median_of_sorted(sorted_values: &[f64]) -> f64 {
    let len = sorted_values.len();
    if len == 0 {
        return f64::NAN;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        sorted_values[mid]
    } else {
        f64::midpoint(sorted_values[mid - 1], sorted_values[mid])
    }
}
