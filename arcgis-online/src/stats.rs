//! Descriptive statistics over one column of a feature layer.
//!
//! Summaries are derived, ephemeral values: computed fresh from the query
//! response on every call and never cached. The declared field type picks
//! which type-specific section (numeric or date) applies; everything else
//! gets the distribution block only.

use arcgis_rest::models::{FeatureRecord, Field, FieldType};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// How many ranked (value, frequency) pairs a summary reports
const TOP_VALUES: usize = 10;

/// One ranked distinct value with its absolute frequency
#[derive(Clone, Debug, PartialEq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Statistics applicable when the field's declared type is numeric
#[derive(Clone, Debug, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Linear interpolation for even counts
    pub median: f64,
    /// Most frequent value; first-encountered wins ties
    pub mode: f64,
    /// Sample standard deviation; 0 when fewer than two values
    pub std_dev: f64,
}

/// Statistics applicable when the field's declared type is a date
///
/// ArcGIS transports dates as epoch milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct DateStats {
    pub earliest_ms: i64,
    pub latest_ms: i64,
}

/// Descriptive statistics for one field of a feature layer
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSummary {
    pub field_name: String,
    pub field_type: FieldType,
    pub total_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    /// Up to ten most frequent distinct values, ties broken by
    /// first-encountered order
    pub top_values: Vec<ValueCount>,
    pub numeric: Option<NumericStats>,
    pub dates: Option<DateStats>,
}

impl FieldSummary {
    /// Null percentage rounded to one decimal place
    pub fn null_percentage(&self) -> f64 {
        percentage(self.null_count, self.total_count)
    }

    /// Render the fixed-order text block; type-specific sections are
    /// omitted when not applicable
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Field: {} ({})\n",
            self.field_name,
            self.field_type.display_name()
        ));
        out.push_str(&format!("Total rows: {}\n", self.total_count));
        out.push_str(&format!(
            "Null values: {} ({}%)\n",
            self.null_count,
            fmt_number(self.null_percentage())
        ));
        out.push_str(&format!("Unique values: {}\n", self.unique_count));

        if !self.top_values.is_empty() {
            out.push_str("\nTop values:\n");
            for entry in &self.top_values {
                out.push_str(&format!(
                    "  {}: {} ({}%)\n",
                    entry.value,
                    entry.count,
                    fmt_number(percentage(entry.count, self.total_count))
                ));
            }
        }

        if let Some(ref numeric) = self.numeric {
            out.push_str("\nNumeric statistics:\n");
            out.push_str(&format!("  Min: {}\n", fmt_number(numeric.min)));
            out.push_str(&format!("  Max: {}\n", fmt_number(numeric.max)));
            out.push_str(&format!("  Mean: {}\n", fmt_number(numeric.mean)));
            out.push_str(&format!("  Median: {}\n", fmt_number(numeric.median)));
            out.push_str(&format!("  Mode: {}\n", fmt_number(numeric.mode)));
            out.push_str(&format!("  Std dev: {}\n", fmt_number(numeric.std_dev)));
        }

        if let Some(ref dates) = self.dates {
            out.push_str("\nDate statistics:\n");
            out.push_str(&format!("  Earliest: {}\n", fmt_timestamp(dates.earliest_ms)));
            out.push_str(&format!("  Latest: {}\n", fmt_timestamp(dates.latest_ms)));
            out.push_str(&format!(
                "  Span: {}\n",
                fmt_span(dates.latest_ms - dates.earliest_ms)
            ));
        }

        out.trim_end().to_string()
    }
}

/// Compute the summary of one field over a layer's rows
pub fn summarize(field: &Field, rows: &[FeatureRecord]) -> FieldSummary {
    let values: Vec<Option<&Value>> = rows
        .iter()
        .map(|row| {
            row.attributes
                .get(&field.name)
                .filter(|v| !v.is_null())
        })
        .collect();

    let total_count = values.len();
    let null_count = values.iter().filter(|v| v.is_none()).count();
    let present: Vec<&Value> = values.iter().flatten().copied().collect();

    // Frequency table over display labels, first-encountered order preserved
    let mut order: Vec<ValueCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in &present {
        let label = value_label(value);
        match index.get(&label) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(label.clone(), order.len());
                order.push(ValueCount {
                    value: label,
                    count: 1,
                });
            }
        }
    }
    let unique_count = order.len();

    // Stable sort keeps first-encountered order among equal counts
    let mut top_values = order;
    top_values.sort_by(|a, b| b.count.cmp(&a.count));
    top_values.truncate(TOP_VALUES);

    let numeric = if field.field_type.is_numeric() {
        numeric_stats(&present)
    } else {
        None
    };
    let dates = if field.field_type.is_date() {
        date_stats(&present)
    } else {
        None
    };

    FieldSummary {
        field_name: field.name.clone(),
        field_type: field.field_type,
        total_count,
        null_count,
        unique_count,
        top_values,
        numeric,
        dates,
    }
}

fn numeric_stats(present: &[&Value]) -> Option<NumericStats> {
    let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
    if numbers.is_empty() {
        return None;
    }

    let mut sorted = numbers.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    let median = median_of_sorted(&sorted);
    let mode = mode_of(&numbers);
    let std_dev = sample_std_dev(&numbers, mean);

    Some(NumericStats {
        min,
        max,
        mean,
        median,
        mode,
        std_dev,
    })
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value; ties resolve to the first-encountered value
fn mode_of(numbers: &[f64]) -> f64 {
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (i, &n) in numbers.iter().enumerate() {
        let entry = counts.entry(n.to_bits()).or_insert((0, i));
        entry.0 += 1;
    }

    let mut best = numbers[0];
    let mut best_count = 0usize;
    let mut best_index = usize::MAX;
    for &n in numbers {
        let (count, first) = counts[&n.to_bits()];
        if count > best_count || (count == best_count && first < best_index) {
            best = n;
            best_count = count;
            best_index = first;
        }
    }
    best
}

fn sample_std_dev(numbers: &[f64], mean: f64) -> f64 {
    if numbers.len() < 2 {
        return 0.0;
    }
    let variance = numbers
        .iter()
        .map(|n| (n - mean).powi(2))
        .sum::<f64>()
        / (numbers.len() - 1) as f64;
    variance.sqrt()
}

fn date_stats(present: &[&Value]) -> Option<DateStats> {
    let timestamps: Vec<i64> = present.iter().filter_map(|v| v.as_i64()).collect();
    let earliest_ms = *timestamps.iter().min()?;
    let latest_ms = *timestamps.iter().max()?;
    Some(DateStats {
        earliest_ms,
        latest_ms,
    })
}

/// Display label for a distinct value in the frequency table
fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(100.0 * count as f64 / total as f64)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Format a number trimmed to at most two decimal places, integers bare
fn fmt_number(x: f64) -> String {
    let rounded = (x * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// Epoch milliseconds to a readable UTC timestamp
fn fmt_timestamp(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} ms", ms),
    }
}

/// Human-readable elapsed span between two epoch-millisecond timestamps
fn fmt_span(ms: i64) -> String {
    let secs = ms / 1000;
    let days = secs / 86_400;
    if days >= 365 {
        let years = days / 365;
        let rem_days = days % 365;
        format!(
            "{} year{}, {} day{}",
            years,
            plural(years),
            rem_days,
            plural(rem_days)
        )
    } else if days >= 1 {
        let hours = (secs % 86_400) / 3_600;
        format!(
            "{} day{}, {} hour{}",
            days,
            plural(days),
            hours,
            plural(hours)
        )
    } else {
        let hours = secs / 3_600;
        let minutes = (secs % 3_600) / 60;
        format!(
            "{} hour{}, {} minute{}",
            hours,
            plural(hours),
            minutes,
            plural(minutes)
        )
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap as Map;

    fn field(name: &str, field_type: FieldType) -> Field {
        Field {
            name: name.to_string(),
            field_type,
            alias: None,
        }
    }

    fn rows_of(name: &str, values: &[Value]) -> Vec<FeatureRecord> {
        values
            .iter()
            .map(|v| {
                let mut attributes = Map::new();
                attributes.insert(name.to_string(), v.clone());
                FeatureRecord { attributes }
            })
            .collect()
    }

    #[test]
    fn median_interpolates_even_counts() {
        assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn null_percentage_rounds_to_one_decimal() {
        let rows = rows_of(
            "V",
            &[json!(1), Value::Null, json!(3), Value::Null, json!(5), json!(6)],
        );
        let summary = summarize(&field("V", FieldType::Integer), &rows);

        assert_eq!(summary.total_count, 6);
        assert_eq!(summary.null_count, 2);
        // 100 * 2/6 = 33.333... -> 33.3
        assert_eq!(summary.null_percentage(), 33.3);
    }

    #[test]
    fn std_dev_matches_independent_computation() {
        let values: Vec<Value> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|v| json!(v))
            .collect();
        let rows = rows_of("V", &values);
        let summary = summarize(&field("V", FieldType::Double), &rows);
        let numeric = summary.numeric.unwrap();

        // Sample std dev of this classic series is sqrt(32/7)
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((numeric.std_dev - expected).abs() < 1e-9);
        assert_eq!(numeric.mean, 5.0);
        assert_eq!(numeric.min, 2.0);
        assert_eq!(numeric.max, 9.0);
        assert_eq!(numeric.mode, 4.0);
    }

    #[test]
    fn top_values_break_ties_by_first_encountered() {
        let rows = rows_of(
            "V",
            &[
                json!("b"),
                json!("a"),
                json!("a"),
                json!("b"),
                json!("c"),
            ],
        );
        let summary = summarize(&field("V", FieldType::String), &rows);

        assert_eq!(summary.unique_count, 3);
        // "b" was seen before "a"; equal counts keep that order
        assert_eq!(summary.top_values[0].value, "b");
        assert_eq!(summary.top_values[0].count, 2);
        assert_eq!(summary.top_values[1].value, "a");
        assert_eq!(summary.top_values[2].value, "c");
    }

    #[test]
    fn top_values_are_capped_at_ten() {
        let values: Vec<Value> = (0..25).map(|i| json!(format!("v{}", i))).collect();
        let rows = rows_of("V", &values);
        let summary = summarize(&field("V", FieldType::String), &rows);

        assert_eq!(summary.unique_count, 25);
        assert_eq!(summary.top_values.len(), 10);
    }

    #[test]
    fn mode_tie_resolves_to_first_encountered() {
        let rows = rows_of("V", &[json!(9), json!(3), json!(3), json!(9)]);
        let summary = summarize(&field("V", FieldType::Integer), &rows);
        assert_eq!(summary.numeric.unwrap().mode, 9.0);
    }

    #[test]
    fn string_field_has_no_numeric_section() {
        let rows = rows_of("V", &[json!("x"), json!("y")]);
        let summary = summarize(&field("V", FieldType::String), &rows);
        assert!(summary.numeric.is_none());
        assert!(summary.dates.is_none());

        let text = summary.render();
        assert!(!text.contains("Numeric statistics"));
        assert!(!text.contains("Date statistics"));
    }

    #[test]
    fn date_field_reports_earliest_latest_and_span() {
        // 2021-01-01 and 2024-01-01 UTC
        let rows = rows_of("D", &[json!(1609459200000i64), json!(1704067200000i64)]);
        let summary = summarize(&field("D", FieldType::Date), &rows);
        let dates = summary.dates.clone().unwrap();

        assert_eq!(dates.earliest_ms, 1609459200000);
        assert_eq!(dates.latest_ms, 1704067200000);

        let text = summary.render();
        assert!(text.contains("Earliest: 2021-01-01 00:00:00 UTC"));
        assert!(text.contains("Latest: 2024-01-01 00:00:00 UTC"));
        // 1095 days = 3 years, 0 days
        assert!(text.contains("Span: 3 years, 0 days"));
    }

    #[test]
    fn render_has_fixed_section_order() {
        let rows = rows_of("V", &[json!(1), json!(2), json!(2), Value::Null]);
        let text = summarize(&field("V", FieldType::Integer), &rows).render();

        let field_pos = text.find("Field: V (Integer)").unwrap();
        let total_pos = text.find("Total rows: 4").unwrap();
        let null_pos = text.find("Null values: 1 (25%)").unwrap();
        let top_pos = text.find("Top values:").unwrap();
        let numeric_pos = text.find("Numeric statistics:").unwrap();

        assert!(field_pos < total_pos);
        assert!(total_pos < null_pos);
        assert!(null_pos < top_pos);
        assert!(top_pos < numeric_pos);
    }

    #[test]
    fn all_null_numeric_field_omits_numeric_section() {
        let rows = rows_of("V", &[Value::Null, Value::Null]);
        let summary = summarize(&field("V", FieldType::Double), &rows);
        assert_eq!(summary.null_count, 2);
        assert!(summary.numeric.is_none());
        assert!(summary.top_values.is_empty());
    }

    #[test]
    fn number_formatting_trims_trailing_zeros() {
        assert_eq!(fmt_number(2.5), "2.5");
        assert_eq!(fmt_number(2.0), "2");
        assert_eq!(fmt_number(33.333333), "33.33");
    }

    #[test]
    fn span_formatting() {
        assert_eq!(fmt_span(90_000_000), "1 day, 1 hour");
        assert_eq!(fmt_span(3_600_000), "1 hour, 0 minutes");
        assert_eq!(fmt_span(86_400_000 * 400), "1 year, 35 days");
    }
}
