//! Per-city time series collection and summary statistics.
use chrono::NaiveDate;
use itertools::Itertools;

use crate::{cities::{City, CityTable}, round_to};

/// One valid value extracted for one city from one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub date: NaiveDate,
    pub raw_value: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(date: NaiveDate, raw_value: f64, value: f64) -> Self {
        Self { date, raw_value, value }
    }
}

/// Summary statistics of a full time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// The value of the latest sample by date
    pub current: f64,
}

impl Aggregate {
    /// Compute the statistics for `series`, which must already be sorted by date.
    /// The average is rounded to `precision` decimals; min, max and current are
    /// taken as-is. Returns `None` for an empty series.
    pub fn from_sorted(series: &[Sample], precision: u32) -> Option<Self> {
        let current = series.last()?.value;
        let (min, max) = series.iter()
            .map(|s| s.value)
            .minmax_by(|a, b| a.total_cmp(b))
            .into_option()?;
        let average = series.iter().map(|s| s.value).sum::<f64>() / series.len() as f64;
        Some(Self { average: round_to(average, precision), min, max, current })
    }
}

/// The finished series for one city.
#[derive(Debug, Clone)]
pub struct CitySeries<'c> {
    pub city: &'c City,
    pub aggregate: Aggregate,
    /// Number of samples the aggregate was computed from
    pub n_samples: usize,
    /// The most recent samples, oldest first
    pub recent: Vec<Sample>,
}

/// Collects samples for each city in a table while input files are scanned.
///
/// Cities are kept in table order. Samples may be pushed in any date order.
#[derive(Debug)]
pub struct CityAccumulator<'c> {
    cities: &'c CityTable,
    samples: Vec<Vec<Sample>>,
}

impl<'c> CityAccumulator<'c> {
    pub fn new(cities: &'c CityTable) -> Self {
        let samples = cities.iter().map(|_| Vec::new()).collect();
        Self { cities, samples }
    }

    pub fn cities(&self) -> &'c CityTable {
        self.cities
    }

    /// Add a sample for the city at `city_index` in the table.
    ///
    /// # Panics
    /// Panics if `city_index` is not a valid index into the city table.
    pub fn push(&mut self, city_index: usize, sample: Sample) {
        self.samples[city_index].push(sample);
    }

    /// Add a sample for the named city. Returns `false` if the city is not in the table.
    pub fn push_named(&mut self, city_name: &str, sample: Sample) -> bool {
        if let Some(i) = self.cities.iter().position(|c| c.name == city_name) {
            self.samples[i].push(sample);
            true
        } else {
            false
        }
    }

    /// Total number of samples across all cities.
    pub fn n_samples(&self) -> usize {
        self.samples.iter().map(|s| s.len()).sum()
    }

    /// The earliest and latest sample dates across all cities.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.samples.iter()
            .flatten()
            .map(|s| s.date)
            .minmax()
            .into_option()
    }

    /// Replace each city's samples with one mean sample per date.
    pub fn into_daily_means(self, precision: u32) -> Self {
        let samples = self.samples.into_iter()
            .map(|s| daily_means(s, precision))
            .collect();
        Self { cities: self.cities, samples }
    }

    /// Sort every series by date and compute its statistics over the full history, keeping
    /// only the latest `window` samples. Cities without samples are left out.
    pub fn finish(self, window: usize, precision: u32) -> Vec<CitySeries<'c>> {
        let cities = self.cities;
        cities.iter()
            .zip(self.samples)
            .filter_map(|(city, mut series)| {
                series.sort_by_key(|s| s.date);
                let aggregate = Aggregate::from_sorted(&series, precision)?;
                let n_samples = series.len();
                let recent = last_n(series, window);
                Some(CitySeries { city, aggregate, n_samples, recent })
            })
            .collect()
    }
}

/// Average samples that share a date, returning one sample per date in date order.
/// Both the raw and converted means are rounded to `precision` decimals.
pub fn daily_means(samples: Vec<Sample>, precision: u32) -> Vec<Sample> {
    samples.into_iter()
        .into_group_map_by(|s| s.date)
        .into_iter()
        .sorted_by_key(|(date, _)| *date)
        .map(|(date, group)| {
            let n = group.len() as f64;
            let raw = group.iter().map(|s| s.raw_value).sum::<f64>() / n;
            let value = group.iter().map(|s| s.value).sum::<f64>() / n;
            Sample::new(date, round_to(raw, precision), round_to(value, precision))
        })
        .collect()
}

fn last_n<T>(mut v: Vec<T>, n: usize) -> Vec<T> {
    if v.len() > n {
        v.drain(..v.len() - n);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_sorted_stats_and_current() {
        let table = CityTable::benin();
        let mut acc = CityAccumulator::new(&table);
        acc.push(0, Sample::new(d(1, 3), 0.0, 10.0));
        acc.push(0, Sample::new(d(1, 1), 0.0, 20.0));
        acc.push(0, Sample::new(d(1, 2), 0.0, 30.0));

        let series = acc.finish(5, 2);
        assert_eq!(series.len(), 1);
        let s = &series[0];
        assert_eq!(s.city.name, "Cotonou");
        let values: Vec<f64> = s.recent.iter().map(|x| x.value).collect();
        assert_eq!(values, [20.0, 30.0, 10.0]);
        assert_eq!(s.aggregate.current, 10.0);
        assert_eq!(s.aggregate.average, 20.0);
        assert_eq!(s.aggregate.min, 10.0);
        assert_eq!(s.aggregate.max, 30.0);
    }

    #[test]
    fn test_window_truncates_after_stats() {
        let table = CityTable::benin();
        let mut acc = CityAccumulator::new(&table);
        for day in 1..=8 {
            acc.push(2, Sample::new(d(1, day), 0.0, day as f64));
        }

        assert_eq!(acc.date_range(), Some((d(1, 1), d(1, 8))));
        let series = acc.finish(5, 2);
        let s = &series[0];
        assert_eq!(s.n_samples, 8);
        assert_eq!(s.recent.len(), 5);
        assert_eq!(s.recent[0].date, d(1, 4));
        assert_eq!(s.aggregate.min, 1.0);
        assert_eq!(s.aggregate.average, 4.5);
    }

    #[test]
    fn test_cities_without_samples_are_omitted() {
        let table = CityTable::benin();
        let mut acc = CityAccumulator::new(&table);
        assert!(acc.push_named("Kandi", Sample::new(d(2, 1), 0.0, 1.0)));
        assert!(!acc.push_named("Lagos", Sample::new(d(2, 1), 0.0, 1.0)));
        assert_eq!(acc.date_range(), Some((d(2, 1), d(2, 1))));
        let series = acc.finish(5, 2);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].city.name, "Kandi");
    }

    #[test]
    fn test_daily_means() {
        let samples = vec![
            Sample::new(d(1, 2), 0.30, 30.0),
            Sample::new(d(1, 1), 0.20, 20.0),
            Sample::new(d(1, 1), 0.25, 25.0),
        ];
        let daily = daily_means(samples, 3);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, d(1, 1));
        assert_eq!(daily[0].raw_value, 0.225);
        assert_eq!(daily[0].value, 22.5);
        assert_eq!(daily[1].value, 30.0);
    }
}
