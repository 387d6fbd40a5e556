use nsmp_cox::record::PatientRecord;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

use crate::cohort::{Cohort, CohortRow};

const FOLLOW_UP_DAYS: f64 = 2500.0;

pub(crate) fn sample_features() -> Vec<String> {
    ["edad", "imc", "grado_histologi", "histotipo"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Synthetic cohort whose hazard rises with grade and age.
///
/// Grades cycle through 1, 2, 3; every fourth patient is serous and every
/// seventh has no recorded age.
pub(crate) fn sample_cohort(n: usize) -> Cohort {
    let mut rng = Pcg64::seed_from_u64(7);
    let rows = (0..n)
        .map(|i| {
            let grade = f64::from(u8::try_from(i % 3).unwrap() + 1);
            let age = rng.random_range(40.0_f64..85.0).round();
            let bmi = rng.random_range(19.0_f64..40.0).round();
            let serous = i % 4 == 0;

            let log_hazard = 0.7 * (grade - 2.0) + 0.03 * (age - 60.0) + if serous { 0.5 } else { 0.0 };
            let u = 1.0 - rng.random::<f64>();
            let event_time = (-u.ln() / (0.0008 * log_hazard.exp())).round().max(1.0);
            let censor_time = rng.random_range(300.0..FOLLOW_UP_DAYS).round();

            let features = PatientRecord::new()
                .with("edad", (i % 7 != 3).then_some(age))
                .with("imc", bmi)
                .with("grado_histologi", grade)
                .with("histotipo", if serous { "serous" } else { "endometrioid" });
            CohortRow {
                time_days: event_time.min(censor_time),
                event: event_time <= censor_time,
                features,
            }
        })
        .collect();
    Cohort::new(rows).unwrap()
}
