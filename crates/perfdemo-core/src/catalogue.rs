//! Ordered registry of benchmark cases.

use std::collections::HashMap;

use regex::Regex;
use tokio::runtime::Runtime;

use crate::case::BenchmarkCase;
use crate::config::WorkloadSizes;
use crate::report::group_thousands;
use crate::workloads;

/// Text the regex case scans.
pub const SAMPLE_TEXT: &str = "Hello 123 World 456 Test 789";

/// Pattern the regex case compiles during setup.
pub const DIGITS_PATTERN: &str = r"\d+";

/// Cases in registration order. Execution follows this order exactly.
#[derive(Debug, Default)]
pub struct Catalogue {
    cases: Vec<BenchmarkCase>,
}

impl Catalogue {
    /// Create an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a case.
    pub fn register(&mut self, case: BenchmarkCase) -> &mut Self {
        self.cases.push(case);
        self
    }

    /// Append a case, builder style.
    #[must_use]
    pub fn with(mut self, case: BenchmarkCase) -> Self {
        self.cases.push(case);
        self
    }

    /// The standard catalogue, sized by `sizes`.
    #[must_use]
    pub fn standard(sizes: &WorkloadSizes) -> Self {
        let iterations = sizes.iterations;
        let string_concat = sizes.string_concat;
        let list_items = sizes.list_items;
        let dictionary_entries = sizes.dictionary_entries;
        let lookup_keys = sizes.lookup_keys;
        let filter_items = sizes.filter_items;
        let filter_passes = sizes.filter_passes;
        let sort_len = sizes.sort_len;
        let scan_passes = sizes.scan_passes;
        let task_count = sizes.task_count;
        let regex_passes = sizes.regex_passes;

        Self::new()
            .with(
                BenchmarkCase::new("String Concatenation", move || {
                    Ok(workloads::string_concat(string_concat))
                })
                .workload(format!("{} iterations", group_thousands(string_concat))),
            )
            .with(
                BenchmarkCase::new("List Add & Sum", move || {
                    Ok(workloads::list_add_and_sum(list_items))
                })
                .workload(format!("{} items", group_thousands(list_items))),
            )
            .with(
                BenchmarkCase::new("Dictionary Operations", move || {
                    Ok(workloads::dictionary_insert_lookup(dictionary_entries))
                })
                .workload(format!("{} entries", group_thousands(dictionary_entries))),
            )
            .with(
                BenchmarkCase::with_setup(
                    "Dictionary Lookup (pre-populated)",
                    move || Ok(workloads::populate_dictionary(lookup_keys)),
                    move |dict: &mut HashMap<u64, String>| {
                        Ok(workloads::dictionary_lookup(dict, lookup_keys))
                    },
                )
                .workload(format!("{} keys", group_thousands(lookup_keys))),
            )
            .with(
                BenchmarkCase::new("Filter-Map-Sum", move || {
                    Ok(workloads::filter_map_sum(filter_items, filter_passes))
                })
                .workload(format!(
                    "{} items x {}",
                    group_thousands(filter_items),
                    group_thousands(filter_passes)
                )),
            )
            .with(
                BenchmarkCase::new("Array Fill, Sort & Search", move || {
                    workloads::array_fill_sort_search(sort_len)
                })
                .workload(format!("{} items", group_thousands(sort_len))),
            )
            .with(
                BenchmarkCase::new("Slice Fill & Scan", move || {
                    Ok(workloads::slice_fill_scan(scan_passes))
                })
                .workload(format!("{} passes", group_thousands(scan_passes))),
            )
            .with(
                BenchmarkCase::with_setup(
                    "Task Fan-Out",
                    workloads::worker_pool,
                    move |pool: &mut Runtime| workloads::fan_out_blocking(pool, task_count),
                )
                .workload(format!("{} tasks", group_thousands(task_count))),
            )
            .with(
                BenchmarkCase::with_setup(
                    "Regex Matching",
                    || Regex::new(DIGITS_PATTERN).map_err(Into::into),
                    move |pattern: &mut Regex| {
                        Ok(workloads::count_matches(pattern, SAMPLE_TEXT, regex_passes))
                    },
                )
                .workload(format!("{} iterations", group_thousands(regex_passes))),
            )
            .with_iterations(iterations)
    }

    /// Set the measured invocation count on every case.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.cases = self
            .cases
            .into_iter()
            .map(|case| case.iterations(iterations))
            .collect();
        self
    }

    /// Keep only cases whose name contains `filter`, ignoring case.
    pub fn retain_matching(&mut self, filter: &str) {
        let needle = filter.to_lowercase();
        self.cases
            .retain(|case| case.name().to_lowercase().contains(&needle));
    }

    /// Look a case up by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BenchmarkCase> {
        self.cases.iter().find(|case| case.name() == name)
    }

    /// Case names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(BenchmarkCase::name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases for the runner.
    pub fn cases_mut(&mut self) -> &mut [BenchmarkCase] {
        &mut self.cases
    }

    #[must_use]
    pub fn into_cases(self) -> Vec<BenchmarkCase> {
        self.cases
    }
}
