//! The micro-operations timed by the standard catalogue.
//!
//! Each function is self-contained: it builds its own data, does the work and
//! returns a value derived from the result so the optimizer cannot drop it.
//! Checksums wrap on overflow; a large configured size never panics a case.

use std::collections::HashMap;
use std::hint::black_box;

use regex::Regex;
use tokio::runtime::Runtime;
use tokio::task::JoinSet;

use crate::error::{Error, Result};

/// Size of the stack buffer used by [`slice_fill_scan`].
pub const SCAN_BUFFER_LEN: usize = 1024;

/// Byte value [`slice_fill_scan`] searches for.
pub const SCAN_MARKER: u8 = 128;

/// Build `"Hello World!{i}"` for every `i` in `0..count`.
///
/// Returns the length of the last string built.
#[must_use]
pub fn string_concat(count: u64) -> u64 {
    let mut last = String::new();
    for i in 0..count {
        last = ["Hello", " ", "World", "!", &i.to_string()].concat();
        black_box(&last);
    }
    last.len() as u64
}

/// Push `0..count` into a growable vector, then sum it.
#[must_use]
pub fn list_add_and_sum(count: u64) -> u64 {
    let mut list = Vec::new();
    for i in 0..count {
        list.push(i);
    }
    list.iter().fold(0_u64, |sum, item| sum.wrapping_add(*item))
}

/// Insert `i -> "Value_i"` for `0..count` into a fresh map, then look every
/// key up. Returns the number of hits.
#[must_use]
pub fn dictionary_insert_lookup(count: u64) -> u64 {
    let mut dict = HashMap::new();
    for i in 0..count {
        dict.insert(i, format!("Value_{i}"));
    }
    (0..count).filter(|key| dict.contains_key(key)).count() as u64
}

/// Build a map pre-populated with keys `0..count`.
#[must_use]
pub fn populate_dictionary(count: u64) -> HashMap<u64, String> {
    (0..count).map(|i| (i, format!("Value_{i}"))).collect()
}

/// Whether `key` is present in a pre-populated map.
#[must_use]
pub fn lookup(dict: &HashMap<u64, String>, key: u64) -> bool {
    dict.contains_key(&key)
}

/// Look up keys `0..probes` in a pre-populated map. Returns the number of hits.
#[must_use]
pub fn dictionary_lookup(dict: &HashMap<u64, String>, probes: u64) -> u64 {
    (0..probes).filter(|key| lookup(dict, *key)).count() as u64
}

/// Keep even values, double them and sum, wrapping on overflow.
#[must_use]
pub fn doubled_even_sum(values: impl IntoIterator<Item = u64>) -> u64 {
    values
        .into_iter()
        .filter(|x| x & 1 == 0)
        .map(|x| x.wrapping_mul(2))
        .fold(0, u64::wrapping_add)
}

/// [`doubled_even_sum`] over `1..=items`, repeated `passes` times; returns the
/// last sum.
#[must_use]
pub fn filter_map_sum(items: u64, passes: u64) -> u64 {
    (0..passes).fold(0, |_, _| doubled_even_sum(black_box(1..=items)))
}

/// `[len, len - 1, ..., 1]`.
#[must_use]
pub fn descending(len: u64) -> Vec<u64> {
    (1..=len).rev().collect()
}

/// Sort `values` ascending and binary-search for `target`.
///
/// # Errors
///
/// Returns [`Error::WorkloadFailed`] if `target` is not present.
pub fn sort_and_search(values: &mut [u64], target: u64) -> Result<usize> {
    values.sort_unstable();
    values
        .binary_search(&target)
        .map_err(|_| Error::workload_failed(format!("{target} not found after sort")))
}

/// Fill a descending array of `len` values, sort it and search for `len / 2`.
///
/// # Errors
///
/// Returns [`Error::WorkloadFailed`] if the midpoint is not found.
pub fn array_fill_sort_search(len: u64) -> Result<u64> {
    let mut values = descending(len);
    sort_and_search(&mut values, len / 2).map(|index| index as u64)
}

/// Fill a fixed stack buffer with `pass % 256` and scan it for
/// [`SCAN_MARKER`], `passes` times. Returns the number of passes where the
/// marker was found.
#[must_use]
pub fn slice_fill_scan(passes: u64) -> u64 {
    let mut buffer = [0_u8; SCAN_BUFFER_LEN];
    let mut hits = 0_u64;
    // Fill byte cycles 0..=255, i.e. `pass % 256`
    for (_, fill) in (0..passes).zip((0..=u8::MAX).cycle()) {
        let slice = black_box(buffer.as_mut_slice());
        slice.fill(fill);
        if slice.contains(&SCAN_MARKER) {
            hits = hits.saturating_add(1);
        }
    }
    hits
}

/// The pure function each fan-out task computes.
#[must_use]
pub const fn task_value(index: u64) -> u64 {
    index.wrapping_mul(2)
}

/// Spawn `tasks` independent tasks computing [`task_value`] and sum their
/// results once all have completed.
///
/// # Errors
///
/// Returns [`Error::TaskJoinFailed`] if any task panicked or was cancelled.
pub async fn fan_out_sum(tasks: u64) -> Result<u64> {
    let mut set = JoinSet::new();
    for index in 0..tasks {
        set.spawn(async move { task_value(index) });
    }

    let mut sum = 0_u64;
    while let Some(joined) = set.join_next().await {
        let value = joined.map_err(|e| Error::task_join_failed(e.to_string()))?;
        sum = sum.wrapping_add(value);
    }
    Ok(sum)
}

/// Run [`fan_out_sum`] on `runtime`, blocking the caller until it finishes.
///
/// # Errors
///
/// See [`fan_out_sum`].
pub fn fan_out_blocking(runtime: &Runtime, tasks: u64) -> Result<u64> {
    runtime.block_on(fan_out_sum(tasks))
}

/// Build the worker pool used by the fan-out case.
///
/// # Errors
///
/// Returns [`Error::Io`] if the runtime cannot start its threads.
pub fn worker_pool() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("perfdemo-worker")
        .build()
        .map_err(Error::from)
}

/// Count the matches of `pattern` in `text`, `passes` times. Returns the last
/// count.
#[must_use]
pub fn count_matches(pattern: &Regex, text: &str, passes: u64) -> u64 {
    (0..passes).fold(0, |_, _| pattern.find_iter(black_box(text)).count() as u64)
}
