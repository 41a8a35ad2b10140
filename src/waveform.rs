//! Prescribed inlet flow rate as a function of time.
//!
//! Waveforms are read from headerless comma-separated files with time in the first column
//! and flow rate in the second:
//!
//! ```text
//! # time, flow
//! 0.0, 4.1
//! 0.01, 5.3
//! 0.02, 8.7
//! ```
//!
//! Blank lines and lines starting with `#` are skipped, and additional columns are ignored.
//! Time values must be strictly increasing.
use crate::mesh::linspace;
use eyre::{eyre, WrapErr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Sampled inlet flow rate with piecewise linear interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InletWaveform {
    times: Vec<f64>,
    flows: Vec<f64>,
}

impl InletWaveform {
    pub fn from_samples(times: Vec<f64>, flows: Vec<f64>) -> eyre::Result<Self> {
        if times.len() != flows.len() {
            return Err(eyre!(
                "waveform has {} time values but {} flow values",
                times.len(),
                flows.len()
            ));
        }
        if times.is_empty() {
            return Err(eyre!("waveform contains no samples"));
        }
        if let Some(i) = times.iter().tuple_windows().position(|(t0, t1)| !(t1 > t0)) {
            return Err(eyre!(
                "waveform time must be strictly increasing, but sample {} has time {} after {}",
                i + 1,
                times[i + 1],
                times[i]
            ));
        }
        if let Some(t) = times.iter().chain(&flows).find(|v| !v.is_finite()) {
            return Err(eyre!("waveform contains non-finite value {}", t));
        }
        Ok(Self { times, flows })
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).wrap_err_with(|| format!("failed to open waveform file {}", path.display()))?;
        Self::from_reader(file).wrap_err_with(|| format!("failed to read waveform file {}", path.display()))
    }

    pub fn from_reader(reader: impl Read) -> eyre::Result<Self> {
        let mut times = Vec::new();
        let mut flows = Vec::new();
        for (line_index, line) in BufReader::new(reader).lines().enumerate() {
            let line_number = line_index + 1;
            let line = line.wrap_err_with(|| format!("I/O error at line {}", line_number))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut columns = line.split(',').map(str::trim);
            let (time, flow) = match (columns.next(), columns.next()) {
                (Some(time), Some(flow)) => (time, flow),
                _ => return Err(eyre!("expected at least two columns at line {}", line_number)),
            };
            let parse = |column: &str, name: &str| {
                column
                    .parse::<f64>()
                    .wrap_err_with(|| format!("invalid {} value '{}' at line {}", name, column, line_number))
            };
            times.push(parse(time, "time")?);
            flows.push(parse(flow, "flow")?);
        }
        Self::from_samples(times, flows)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn flows(&self) -> &[f64] {
        &self.flows
    }

    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    /// Time of the last sample, which is taken as the period of the cardiac cycle.
    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Piecewise linear interpolation of the flow rate.
    ///
    /// Outside the sampled range the value is extrapolated linearly from the closest segment.
    /// A single-sample waveform is constant.
    pub fn interpolate(&self, t: f64) -> f64 {
        let n = self.times.len();
        if n == 1 {
            return self.flows[0];
        }
        // Index of the segment [i, i + 1] used for interpolation
        let i = self
            .times
            .partition_point(|&time| time <= t)
            .saturating_sub(1)
            .min(n - 2);
        let (t0, t1) = (self.times[i], self.times[i + 1]);
        let (q0, q1) = (self.flows[i], self.flows[i + 1]);
        q0 + (q1 - q0) * (t - t0) / (t1 - t0)
    }

    /// `n` uniformly spaced samples of the interpolant over `[start_time, end_time]`.
    pub fn resample(&self, n: usize) -> Vec<f64> {
        linspace(self.start_time(), self.end_time(), n)
            .into_iter()
            .map(|t| self.interpolate(t))
            .collect()
    }
}
