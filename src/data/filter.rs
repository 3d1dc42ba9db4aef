use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{CustomerRecord, FeeRecord};

// ---------------------------------------------------------------------------
// Filter parameters supplied by the front end
// ---------------------------------------------------------------------------

/// Customer filter: name search, start-year ceiling and contract types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFilter {
    /// Case-insensitive substring; empty matches every name.
    pub name_contains: String,
    /// Inclusive upper bound on `start_year`. Records without a year count
    /// as year 0. `None` disables the bound.
    pub max_start_year: Option<i32>,
    /// Allowed contract types; empty means no restriction.
    pub contract_types: BTreeSet<String>,
}

/// Fee filter: organizer search and year ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeFilter {
    /// Case-insensitive substring; empty matches every named organizer.
    pub organizer_contains: String,
    /// Inclusive upper bound on `year`. `None` disables the bound.
    pub max_year: Option<i32>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

impl CustomerFilter {
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        if !contains_ci(&record.name, &self.name_contains) {
            return false;
        }
        if let Some(max) = self.max_start_year {
            if record.start_year.unwrap_or(0) > max {
                return false;
            }
        }
        if !self.contract_types.is_empty() {
            match &record.contract_type {
                Some(ct) if self.contract_types.contains(ct) => {}
                _ => return false,
            }
        }
        true
    }
}

impl FeeFilter {
    pub fn matches(&self, record: &FeeRecord) -> bool {
        if record.organizer.is_empty() || !contains_ci(&record.organizer, &self.organizer_contains) {
            return false;
        }
        self.max_year.map_or(true, |max| record.year <= max)
    }
}

/// Return indices of customers that pass the filter.
pub fn filtered_indices(records: &[CustomerRecord], filter: &CustomerFilter) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filter.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Customers passing the filter, in table order.
pub fn filter_customers<'a>(records: &'a [CustomerRecord], filter: &CustomerFilter) -> Vec<&'a CustomerRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Fee rows passing the filter, in table order.
pub fn filter_fees<'a>(records: &'a [FeeRecord], filter: &FeeFilter) -> Vec<&'a FeeRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Fee rows belonging to one of the `selected` organizers.
pub fn filter_organizers<'a>(records: &'a [FeeRecord], selected: &[String]) -> Vec<&'a FeeRecord> {
    records
        .iter()
        .filter(|r| selected.iter().any(|s| *s == r.organizer))
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking and aggregation
// ---------------------------------------------------------------------------

/// The `n` rows with the largest `key`, largest first.
///
/// Rows without a key sort after all others; equal keys keep input order.
pub fn top_n<T, F>(rows: &[T], n: usize, key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<f64>,
{
    let mut ranked: Vec<(usize, Option<f64>)> = rows.iter().map(&key).enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked
        .into_iter()
        .take(n)
        .map(|(i, _)| rows[i].clone())
        .collect()
}

/// Sum of `value` per group. Rows without a group are skipped; a missing
/// value adds 0 but still makes its group appear.
pub fn group_sum<T, K, G, V>(rows: &[T], group: G, value: V) -> BTreeMap<K, f64>
where
    K: Ord,
    G: Fn(&T) -> Option<K>,
    V: Fn(&T) -> Option<f64>,
{
    let mut sums = BTreeMap::new();
    for row in rows {
        if let Some(key) = group(row) {
            *sums.entry(key).or_insert(0.0) += value(row).unwrap_or(0.0);
        }
    }
    sums
}

/// Row count per group, most frequent first; ties keep first-seen order.
pub fn count_by<T, K, G>(rows: &[T], group: G) -> Vec<(K, usize)>
where
    K: Ord + Clone,
    G: Fn(&T) -> Option<K>,
{
    let mut position: BTreeMap<K, usize> = BTreeMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for row in rows {
        let Some(key) = group(row) else { continue };
        match position.get(&key) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                position.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Names of the rows in each group, in row order.
pub fn group_members<T, K, G, N>(rows: &[T], group: G, name: N) -> BTreeMap<K, Vec<String>>
where
    K: Ord,
    G: Fn(&T) -> Option<K>,
    N: Fn(&T) -> String,
{
    let mut members: BTreeMap<K, Vec<String>> = BTreeMap::new();
    for row in rows {
        if let Some(key) = group(row) {
            members.entry(key).or_default().push(name(row));
        }
    }
    members
}

/// The first `limit` names one per line, followed by `…` when cut short.
pub fn member_preview(names: &[String], limit: usize) -> String {
    let mut preview = names.iter().take(limit).cloned().collect::<Vec<_>>().join("\n");
    if names.len() > limit {
        preview.push_str("\n…");
    }
    preview
}

/// `(year, sum)` pairs in ascending year order.
pub fn yearly_series<T, Y, V>(rows: &[T], year: Y, value: V) -> Vec<(i32, f64)>
where
    Y: Fn(&T) -> Option<i32>,
    V: Fn(&T) -> Option<f64>,
{
    group_sum(rows, year, value).into_iter().collect()
}

/// `(year, group, sum)` triples ordered by year, then group.
pub fn grouped_series<T, Y, G, V>(rows: &[T], year: Y, group: G, value: V) -> Vec<(i32, String, f64)>
where
    Y: Fn(&T) -> Option<i32>,
    G: Fn(&T) -> Option<String>,
    V: Fn(&T) -> Option<f64>,
{
    group_sum(rows, |row| Some((year(row)?, group(row)?)), value)
        .into_iter()
        .map(|((y, g), sum)| (y, g, sum))
        .collect()
}

// ---------------------------------------------------------------------------
// Option lists for filter widgets
// ---------------------------------------------------------------------------

/// Smallest and largest year present, if any.
pub fn year_bounds<T, Y>(rows: &[T], year: Y) -> Option<(i32, i32)>
where
    Y: Fn(&T) -> Option<i32>,
{
    rows.iter().filter_map(year).fold(None, |acc, y| match acc {
        None => Some((y, y)),
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
    })
}

/// Distinct keys in order of first appearance.
pub fn distinct_in_order<T, K, G>(rows: &[T], key: G) -> Vec<K>
where
    K: Ord + Clone,
    G: Fn(&T) -> Option<K>,
{
    let mut seen = BTreeSet::new();
    rows.iter()
        .filter_map(key)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Contract types present in the table, in order of first appearance.
pub fn contract_type_options(records: &[CustomerRecord]) -> Vec<String> {
    distinct_in_order(records, |r| r.contract_type.clone())
}

/// Organizers present in the rows, in order of first appearance.
pub fn organizer_options(records: &[FeeRecord]) -> Vec<String> {
    distinct_in_order(records, |r| {
        (!r.organizer.is_empty()).then(|| r.organizer.clone())
    })
}
