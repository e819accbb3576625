//! The load/energy profile engine: an optionally archetype-partitioned,
//! time-indexed numeric sequence with the transforms needed to turn a raw
//! annual load series into a load-duration curve and a compact multi-block
//! representation of it.

use crate::errors::ProfileError;
use anyhow::anyhow;
use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::io::Write;
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

/// Default first calendar year of the synthetic annual index.
pub const DEFAULT_BASE_YEAR: i32 = 2017;

const DEFAULT_PARTITION: &str = "unnamed";

/// Sampling interval of a profile. Every partition of one profile shares the
/// same frequency.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, serde::Serialize,
    serde::Deserialize,
)]
pub enum Frequency {
    #[default]
    Hourly,
    Daily,
    Monthly,
    Annual,
}

impl Frequency {
    /// Maps a ReportingFrequency string from the report dictionary; anything
    /// unrecognized falls back to hourly with a warning.
    pub fn from_report(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            warn!("unrecognized reporting frequency {raw:?}, assuming hourly");
            Self::Hourly
        })
    }

    fn hours_per_step(&self) -> Option<i64> {
        match self {
            Self::Hourly => Some(1),
            Self::Daily => Some(24),
            _ => None,
        }
    }
}

/// Post-processing requested when a profile is first derived from report
/// rows: sorting (plain or concurrent) and min-max normalization.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProfileOptions {
    pub sort: bool,
    pub ascending: bool,
    pub concurrent_sort: bool,
    pub normalize: bool,
}

/// An ordered, time-indexed numeric sequence, optionally partitioned by
/// archetype. Transforms either mutate in place or, via the `-ed` variants,
/// return a new instance.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyProfile {
    profile_type: String,
    units: String,
    frequency: Frequency,
    base_year: i32,
    is_sorted: bool,
    partitions: IndexMap<String, Vec<f64>>,
    bin_edges: IndexMap<String, Vec<f64>>,
    bin_scaling_factors: IndexMap<String, Vec<f64>>,
}

impl EnergyProfile {
    pub fn from_partitions(
        profile_type: &str,
        units: &str,
        frequency: Frequency,
        partitions: IndexMap<String, Vec<f64>>,
    ) -> Self {
        Self {
            profile_type: profile_type.to_string(),
            units: units.to_string(),
            frequency,
            base_year: DEFAULT_BASE_YEAR,
            is_sorted: false,
            partitions,
            bin_edges: IndexMap::new(),
            bin_scaling_factors: IndexMap::new(),
        }
    }

    /// A single unpartitioned series.
    pub fn from_values(
        profile_type: &str,
        units: &str,
        frequency: Frequency,
        values: Vec<f64>,
    ) -> Self {
        Self::from_partitions(
            profile_type,
            units,
            frequency,
            IndexMap::from([(DEFAULT_PARTITION.to_string(), values)]),
        )
    }

    pub fn with_base_year(mut self, base_year: i32) -> Self {
        self.base_year = base_year;
        self
    }

    pub fn profile_type(&self) -> &str {
        &self.profile_type
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    pub fn archetypes(&self) -> Vec<&str> {
        self.partitions.keys().map(String::as_str).collect()
    }

    pub fn values(&self, archetype: &str) -> Option<&[f64]> {
        self.partitions.get(archetype).map(Vec::as_slice)
    }

    pub fn partitions(&self) -> &IndexMap<String, Vec<f64>> {
        &self.partitions
    }

    /// Fitted segment boundaries per partition, available after
    /// [`Self::discretize`].
    pub fn bin_edges(&self) -> &IndexMap<String, Vec<f64>> {
        &self.bin_edges
    }

    /// Fitted per-segment amplitudes per partition, available after
    /// [`Self::discretize`].
    pub fn bin_scaling_factors(&self) -> &IndexMap<String, Vec<f64>> {
        &self.bin_scaling_factors
    }

    pub(crate) fn postprocess(&mut self, options: &ProfileOptions) -> Result<(), ProfileError> {
        if options.sort {
            if options.concurrent_sort {
                self.concurrent_sort(options.ascending)?;
            } else {
                self.sort_values(options.ascending);
            }
        }
        if options.normalize {
            self.normalize();
        }
        Ok(())
    }

    /// Sorts each partition by value independently. Descending order is the
    /// default elsewhere, which is what a load-duration curve needs.
    pub fn sort_values(&mut self, ascending: bool) {
        for values in self.partitions.values_mut() {
            if ascending {
                values.sort_by_key(|value| OrderedFloat(*value));
            } else {
                values.sort_by_key(|value| Reverse(OrderedFloat(*value)));
            }
        }
        self.is_sorted = true;
    }

    pub fn sorted(&self, ascending: bool) -> Self {
        let mut sorted = self.clone();
        sorted.sort_values(ascending);
        sorted
    }

    /// Sorts every partition by the same permutation, derived from the total
    /// across partitions at each time step. Unlike [`Self::sort_values`] this
    /// preserves the pairing between simultaneous values, which is what
    /// coincident peak demand across load types requires.
    pub fn concurrent_sort(&mut self, ascending: bool) -> Result<(), ProfileError> {
        let mut lengths = self.partitions.values().map(Vec::len);
        let Some(len) = lengths.next() else {
            return Ok(());
        };
        if lengths.any(|other| other != len) {
            return Err(ProfileError::MismatchedPartitions(self.profile_type.clone()));
        }

        let totals: Vec<f64> = (0..len)
            .map(|step| self.partitions.values().map(|values| values[step]).sum())
            .collect();
        let mut permutation: Vec<usize> = (0..len).collect();
        if ascending {
            permutation.sort_by_key(|&step| OrderedFloat(totals[step]));
        } else {
            permutation.sort_by_key(|&step| Reverse(OrderedFloat(totals[step])));
        }
        for values in self.partitions.values_mut() {
            *values = permutation.iter().map(|&step| values[step]).collect();
        }
        self.is_sorted = true;
        Ok(())
    }

    /// Min-max scales each partition into [0, 1] independently, never across
    /// partitions. A constant partition maps to all zeros.
    pub fn normalize(&mut self) {
        for values in self.partitions.values_mut() {
            let Some(min) = values.iter().copied().reduce(f64::min) else {
                continue;
            };
            let max = values.iter().copied().fold(min, f64::max);
            let span = max - min;
            for value in values.iter_mut() {
                *value = if span == 0.0 { 0.0 } else { (*value - min) / span };
            }
        }
        self.units = String::new();
    }

    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized
    }

    /// Mean over max of the raw sequence, across all partitions.
    pub fn capacity_factor(&self) -> f64 {
        let count: usize = self.partitions.values().map(Vec::len).sum();
        if count == 0 {
            return f64::NAN;
        }
        let sum: f64 = self.partitions.values().flatten().sum();
        let max = self
            .partitions
            .values()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        sum / count as f64 / max
    }

    /// Per-partition maximum.
    pub fn p_max(&self) -> IndexMap<String, f64> {
        self.partitions
            .iter()
            .map(|(name, values)| {
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (name.clone(), max)
            })
            .collect()
    }

    /// Index of the minimum value of one partition, used to anchor the
    /// discretization initial guess.
    pub fn time_at_min(&self, archetype: &str) -> Option<usize> {
        self.partitions.get(archetype).and_then(|values| {
            values
                .iter()
                .enumerate()
                .min_by_key(|(_, value)| OrderedFloat(**value))
                .map(|(step, _)| step)
        })
    }

    /// Re-indexes each partition to a synthetic calendar starting at the base
    /// year and aggregates by calendar month (mean).
    pub fn monthly(&self) -> Result<Self, ProfileError> {
        let step_hours = self
            .frequency
            .hours_per_step()
            .ok_or_else(|| ProfileError::NotResamplable(self.frequency.to_string()))?;
        let start = NaiveDate::from_ymd_opt(self.base_year, 1, 1)
            .ok_or_else(|| ProfileError::FailureInTransform(anyhow!("invalid base year")))?;

        let mut partitions = IndexMap::new();
        for (name, values) in &self.partitions {
            let mut sums: IndexMap<u32, (f64, usize)> = IndexMap::new();
            for (step, value) in values.iter().enumerate() {
                let date = start + Duration::hours(step_hours * step as i64);
                let (sum, count) = sums.entry(date.month()).or_insert((0.0, 0));
                *sum += value;
                *count += 1;
            }
            let means = sums
                .into_values()
                .map(|(sum, count)| sum / count as f64)
                .collect();
            partitions.insert(name.clone(), means);
        }
        let mut monthly =
            Self::from_partitions(&self.profile_type, &self.units, Frequency::Monthly, partitions);
        monthly.base_year = self.base_year;
        Ok(monthly)
    }

    /// Fits an (n_bins + 1)-segment step function to each partition by
    /// minimizing the RMSE between the fitted piecewise curve and the actual
    /// values, searching jointly over segment boundaries and amplitudes. The
    /// fitted breakpoints and amplitudes are recorded per partition and the
    /// partition values are replaced by the fitted curve.
    ///
    /// The initial boundary guess is anchored at the index of the partition
    /// minimum; it is a heuristic, not a contract, and only the quality of
    /// the converged fit matters.
    pub fn discretize(&mut self, n_bins: usize) -> Result<(), ProfileError> {
        for (name, values) in &mut self.partitions {
            if values.is_empty() {
                warn!("skipping discretization of empty partition {name:?}");
                continue;
            }
            debug!("discretizing profile partition {name:?} into {n_bins} bins");
            let guess = initial_guess(values, n_bins);
            let fitted = fit_step_function(values, guess)
                .map_err(|error| ProfileError::FailureInTransform(error))?;

            let segments = n_bins + 1;
            let mut pairs: Vec<(f64, f64)> = fitted[..segments]
                .iter()
                .map(|edge| edge.clamp(0.0, values.len() as f64))
                .zip(fitted[segments..].iter().map(|ampl| ampl.max(0.0)))
                .collect();
            pairs.sort_by_key(|(edge, _)| OrderedFloat(*edge));
            self.bin_edges
                .insert(name.clone(), pairs.iter().map(|(edge, _)| *edge).collect());
            self.bin_scaling_factors
                .insert(name.clone(), pairs.iter().map(|(_, ampl)| *ampl).collect());
            *values = piecewise(&fitted, values.len());
        }
        Ok(())
    }

    /// Writes the profile as flat (archetype, time step, value) records.
    pub fn to_csv(&self, writer: impl Write) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["Archetype", "TimeStep", "Value", "Units"])?;
        for (name, values) in &self.partitions {
            for (step, value) in values.iter().enumerate() {
                writer.write_record([
                    name.as_str(),
                    &step.to_string(),
                    &value.to_string(),
                    &self.units,
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Evaluates the parametrized step function over `len` time steps. The first
/// half of `params` holds segment end boundaries, the second half the
/// matching amplitudes; boundaries are clamped into the series and
/// amplitudes floored at zero so the optimizer cannot wander into
/// meaningless territory.
pub(crate) fn piecewise(params: &[f64], len: usize) -> Vec<f64> {
    let segments = params.len() / 2;
    let mut pairs: Vec<(f64, f64)> = params[..segments]
        .iter()
        .map(|edge| edge.clamp(0.0, len as f64))
        .zip(params[segments..].iter().map(|ampl| ampl.max(0.0)))
        .collect();
    pairs.sort_by_key(|(edge, _)| OrderedFloat(*edge));

    (0..len)
        .map(|step| {
            let position = step as f64;
            pairs
                .iter()
                .find(|(edge, _)| position < *edge)
                .or(pairs.last())
                .map(|(_, ampl)| *ampl)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Root-mean-square error between the fitted step function and the series.
pub(crate) fn rmse(params: &[f64], values: &[f64]) -> f64 {
    let fitted = piecewise(params, values.len());
    let sum_sq: f64 = fitted
        .iter()
        .zip(values)
        .map(|(fit, value)| (fit - value).powi(2))
        .sum();
    (sum_sq / values.len() as f64).sqrt()
}

fn initial_guess(values: &[f64], n_bins: usize) -> Vec<f64> {
    let len = values.len() as f64;
    let min = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let hour_of_min = values
        .iter()
        .enumerate()
        .min_by_key(|(_, value)| OrderedFloat(**value))
        .map(|(step, _)| step as f64)
        .unwrap_or(0.0);

    let mut guess = Vec::with_capacity(2 * (n_bins + 1));
    for i in 1..=n_bins {
        guess.push(hour_of_min - hour_of_min / (i as f64 * 1.01));
    }
    guess.push(len);
    for i in 1..=n_bins {
        guess.push(1.0 / (i as f64 * 1.01));
    }
    guess.push(min);
    guess
}

struct StepFit {
    values: Vec<f64>,
}

impl CostFunction for StepFit {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(rmse(param, &self.values))
    }
}

fn fit_step_function(values: &[f64], guess: Vec<f64>) -> anyhow::Result<Vec<f64>> {
    let len = values.len() as f64;
    let max = values.iter().copied().fold(0.0, f64::max);
    let segments = guess.len() / 2;

    // simplex: the guess plus one vertex per perturbed coordinate
    let mut simplex = vec![guess.clone()];
    for coordinate in 0..guess.len() {
        let mut vertex = guess.clone();
        let nudge = if coordinate < segments {
            (len * 0.05).max(1.0)
        } else {
            (max * 0.05).max(0.1)
        };
        vertex[coordinate] += nudge;
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(1e-8)
        .map_err(|error| anyhow!(error))?;
    let result = Executor::new(
        StepFit {
            values: values.to_vec(),
        },
        solver,
    )
    .configure(|state| state.max_iters(400))
    .run()
    .map_err(|error| anyhow!(error))?;
    debug!(
        "completed discretization with residual {:.6}",
        result.state().get_best_cost()
    );
    result
        .state()
        .get_best_param()
        .cloned()
        .ok_or_else(|| anyhow!("step-function fit produced no parameters"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[fixture]
    fn two_partitions() -> EnergyProfile {
        EnergyProfile::from_partitions(
            "Heating Load",
            "J",
            Frequency::Hourly,
            IndexMap::from([
                ("A1".to_string(), vec![1.0, 4.0, 2.0]),
                // anti-correlated with A1 on purpose
                ("A2".to_string(), vec![5.0, 0.0, 2.0]),
            ]),
        )
    }

    #[rstest]
    fn capacity_factor_of_constant_series_is_one() {
        let profile =
            EnergyProfile::from_values("Heating Load", "J", Frequency::Hourly, vec![3.0; 10]);
        assert_relative_eq!(profile.capacity_factor(), 1.0);
    }

    #[rstest]
    fn capacity_factor_with_single_peak_is_below_one() {
        let profile = EnergyProfile::from_values(
            "Heating Load",
            "J",
            Frequency::Hourly,
            vec![1.0, 1.0, 5.0, 1.0],
        );
        assert!(profile.capacity_factor() < 1.0);
    }

    #[rstest]
    fn sort_values_orders_each_partition_independently(mut two_partitions: EnergyProfile) {
        two_partitions.sort_values(false);
        assert_eq!(two_partitions.values("A1").unwrap(), &[4.0, 2.0, 1.0]);
        assert_eq!(two_partitions.values("A2").unwrap(), &[5.0, 2.0, 0.0]);
        assert!(two_partitions.is_sorted());
    }

    #[rstest]
    fn concurrent_sort_applies_one_shared_permutation(two_partitions: EnergyProfile) {
        // coincident totals are [6, 4, 4]; descending keeps step 1 before 2
        let mut concurrent = two_partitions.clone();
        concurrent.concurrent_sort(false).unwrap();
        assert_eq!(concurrent.values("A1").unwrap(), &[1.0, 4.0, 2.0]);
        assert_eq!(concurrent.values("A2").unwrap(), &[5.0, 0.0, 2.0]);

        // a per-partition sort of the same data pairs values differently
        let sorted = two_partitions.sorted(false);
        assert_ne!(sorted.values("A1").unwrap(), concurrent.values("A1").unwrap());
    }

    #[rstest]
    fn concurrent_sort_rejects_ragged_partitions() {
        let mut profile = EnergyProfile::from_partitions(
            "Heating Load",
            "J",
            Frequency::Hourly,
            IndexMap::from([
                ("A1".to_string(), vec![1.0, 2.0]),
                ("A2".to_string(), vec![1.0]),
            ]),
        );
        assert!(matches!(
            profile.concurrent_sort(false),
            Err(ProfileError::MismatchedPartitions(_))
        ));
    }

    #[rstest]
    fn normalize_maps_extrema_to_unit_interval_and_is_idempotent(
        mut two_partitions: EnergyProfile,
    ) {
        two_partitions.normalize();
        let first = two_partitions.values("A1").unwrap().to_vec();
        assert_relative_eq!(first.iter().copied().reduce(f64::min).unwrap(), 0.0);
        assert_relative_eq!(first.iter().copied().fold(0.0, f64::max), 1.0);

        two_partitions.normalize();
        for (a, b) in two_partitions.values("A1").unwrap().iter().zip(&first) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[rstest]
    fn monthly_resample_averages_by_calendar_month() {
        // 2017 January spans hours 0..744
        let mut values = vec![0.0; 8760];
        for value in values.iter_mut().take(744) {
            *value = 1.0;
        }
        let profile = EnergyProfile::from_values("Heating Load", "J", Frequency::Hourly, values);
        let monthly = profile.monthly().unwrap();
        let resampled = monthly.values("unnamed").unwrap();
        assert_eq!(resampled.len(), 12);
        assert_relative_eq!(resampled[0], 1.0);
        assert_relative_eq!(resampled[1], 0.0);
    }

    #[rstest]
    fn monthly_resample_requires_a_subannual_frequency() {
        let profile =
            EnergyProfile::from_values("Heating Load", "J", Frequency::Monthly, vec![1.0; 12]);
        assert!(matches!(
            profile.monthly(),
            Err(ProfileError::NotResamplable(_))
        ));
    }

    #[rstest]
    fn piecewise_evaluates_sorted_segments() {
        // two segments: amplitude 3 before step 2, amplitude 1 up to step 4
        let fitted = piecewise(&[2.0, 4.0, 3.0, 1.0], 4);
        assert_eq!(fitted, vec![3.0, 3.0, 1.0, 1.0]);
    }

    #[rstest]
    fn rmse_is_zero_for_an_exact_step_fit() {
        let values = vec![3.0, 3.0, 1.0, 1.0];
        assert_relative_eq!(rmse(&[2.0, 4.0, 3.0, 1.0], &values), 0.0);
    }

    #[rstest]
    fn discretize_records_bins_and_lowers_the_residual() {
        // a noisy two-level duration curve
        let values: Vec<f64> = (0..48)
            .map(|step| if step < 12 { 10.0 } else { 2.0 } + (step % 3) as f64 * 0.1)
            .collect();
        let mut profile =
            EnergyProfile::from_values("Heating Load", "J", Frequency::Hourly, values.clone());
        profile.discretize(2).unwrap();

        let edges = &profile.bin_edges()["unnamed"];
        let factors = &profile.bin_scaling_factors()["unnamed"];
        assert_eq!(edges.len(), 3);
        assert_eq!(factors.len(), 3);
        assert!(edges.windows(2).all(|pair| pair[0] <= pair[1]));

        let fitted = profile.values("unnamed").unwrap();
        assert_eq!(fitted.len(), values.len());
        let residual: f64 = fitted
            .iter()
            .zip(&values)
            .map(|(fit, value)| (fit - value).powi(2))
            .sum::<f64>()
            / values.len() as f64;
        let flat_mean = values.iter().sum::<f64>() / values.len() as f64;
        let flat_residual: f64 = values
            .iter()
            .map(|value| (value - flat_mean).powi(2))
            .sum::<f64>()
            / values.len() as f64;
        assert!(residual.sqrt() < flat_residual.sqrt());
    }

    #[rstest]
    fn csv_export_writes_one_record_per_step(two_partitions: EnergyProfile) {
        let mut buffer = Vec::new();
        two_partitions.to_csv(&mut buffer).unwrap();
        let written = String::from_utf8(buffer).unwrap();
        assert_eq!(written.lines().count(), 7);
        assert!(written.starts_with("Archetype,TimeStep,Value,Units"));
    }
}
