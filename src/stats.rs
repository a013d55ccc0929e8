use crate::store::StudentRecord;
use serde::Serialize;
use std::collections::HashMap;

/// 1-decimal display rounding used for percentage shares.
fn round_1dp(x: f64) -> f64 {
    (10.0 * x).round() / 10.0
}

/// Count of students per course. Only courses that actually occur get an
/// entry; key order carries no meaning.
pub fn course_distribution(students: &[StudentRecord]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for s in students {
        *counts.entry(s.course.clone()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseCount {
    pub course: String,
    pub count: u64,
    pub percent: f64,
}

/// Course distribution ranked by descending count, ties by ascending course
/// name so the ordering is independent of input order.
pub fn ranked_courses(students: &[StudentRecord]) -> Vec<CourseCount> {
    let total = students.len();
    let mut out: Vec<CourseCount> = course_distribution(students)
        .into_iter()
        .map(|(course, count)| CourseCount {
            course,
            count,
            percent: round_1dp(100.0 * count as f64 / total as f64),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.course.cmp(&b.course)));
    out
}

/// Highest-count course; ties resolve to the lexicographically lowest name.
/// `None` when there are no students.
pub fn most_popular_course(students: &[StudentRecord]) -> Option<String> {
    course_distribution(students)
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(course, _)| course)
}

const AGE_BUCKET_LABELS: [&str; 4] = ["Under 20", "20-24", "25-29", "30+"];

fn age_bucket_index(age: i64) -> usize {
    if age < 20 {
        0
    } else if age < 25 {
        1
    } else if age < 30 {
        2
    } else {
        3
    }
}

/// Counts per fixed half-open age bucket, youngest bucket first. Buckets with
/// no students are omitted rather than reported as zero.
pub fn age_distribution(students: &[StudentRecord]) -> Vec<(&'static str, u64)> {
    let mut counts = [0u64; 4];
    for s in students {
        counts[age_bucket_index(s.age)] += 1;
    }
    AGE_BUCKET_LABELS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| (*label, count))
        .collect()
}

/// Mean age rounded to the nearest integer; 0 for an empty roster.
pub fn average_age(students: &[StudentRecord]) -> i64 {
    if students.is_empty() {
        return 0;
    }
    let sum: i64 = students.iter().map(|s| s.age).sum();
    (sum as f64 / students.len() as f64).round() as i64
}

/// Youngest and oldest age; `None` for an empty roster.
pub fn age_range(students: &[StudentRecord]) -> Option<(i64, i64)> {
    let mut ages = students.iter().map(|s| s.age);
    let first = ages.next()?;
    let (min, max) = ages.fold((first, first), |(min, max), age| {
        (min.min(age), max.max(age))
    });
    Some((min, max))
}
