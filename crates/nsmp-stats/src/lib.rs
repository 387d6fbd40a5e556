//! Statistical building blocks for the NSMP recurrence-risk models.
//!
//! This crate provides the numeric primitives shared by the Cox model, its
//! offline trainer and the diagnostics:
//!
//! - **Descriptive statistics**: mean, median (midpoint convention) and sample
//!   standard deviation
//! - **Quantiles**: linear-interpolated empirical quantiles, matching the
//!   default method used by common array libraries
//! - **Survival analysis**: Kaplan-Meier estimator for right-censored data
//! - **Concordance**: Harrell's C-index for validating risk rankings
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`quantile`]: Linear-interpolated quantiles of sorted data
//! - [`survival`]: Kaplan-Meier survival curves for time-to-event data
//! - [`concordance`]: Concordance index between predictions and outcomes
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use nsmp_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 2.5);
//! assert_eq!(stats.median, 2.5);
//! ```
//!
//! ## Computing cut points
//!
//! ```
//! use nsmp_stats::quantile::compute_quantile;
//!
//! let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
//! assert_eq!(compute_quantile(&sorted, 0.25), 2.0);
//! assert_eq!(compute_quantile(&sorted, 0.75), 4.0);
//! ```
//!
//! ## Analyzing survival data
//!
//! ```
//! use nsmp_stats::survival::KaplanMeierCurve;
//!
//! // Data: (time, is_censored)
//! let data = vec![
//!     (100.0, false), // Recurrence observed at day 100
//!     (200.0, true),  // Censored at day 200
//!     (300.0, false), // Recurrence observed at day 300
//! ];
//! let curve = KaplanMeierCurve::from_data(data);
//! assert_eq!(curve.subject_count(), 3);
//! let points = curve.step_points();
//! assert_eq!(points[0].survival, 1.0);
//! assert!(points[1].survival < 1.0);
//! ```

pub mod concordance;
pub mod descriptive;
pub mod quantile;
pub mod survival;
