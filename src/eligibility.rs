// src/eligibility.rs
//! Salary and job-type rules deciding whether a posting is worth applying to.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([\d,.]+)").expect("dollar amount pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Unknown,
}

/// Labels tested in this order; the first one found wins.
const JOB_TYPE_LABELS: [(&str, JobType); 5] = [
    ("full-time", JobType::FullTime),
    ("part-time", JobType::PartTime),
    ("contract", JobType::Contract),
    ("temporary", JobType::Temporary),
    ("internship", JobType::Internship),
];

impl JobType {
    pub fn is_acceptable(self) -> bool {
        matches!(self, Self::FullTime | Self::PartTime)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "full-time",
            Self::PartTime => "part-time",
            Self::Contract => "contract",
            Self::Temporary => "temporary",
            Self::Internship => "internship",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityDecision {
    pub min_salary: Option<f64>,
    pub job_type: JobType,
    pub salary_floor: f64,
    pub accepted: bool,
}

impl EligibilityDecision {
    pub fn rejection_reason(&self) -> Option<String> {
        if self.accepted {
            return None;
        }
        let reason = match self.min_salary {
            None => "salary not listed".to_string(),
            Some(salary) if salary < self.salary_floor => {
                format!("salary {} below minimum {}", salary, self.salary_floor)
            }
            Some(_) => format!("job type is {}", self.job_type),
        };
        Some(reason)
    }
}

/// Lower bound of a salary snippet such as `"$18 - $20 an hour"`.
pub fn parse_salary(text: &str) -> Option<f64> {
    let captures = DOLLAR_AMOUNT.captures(text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    leading_decimal(&digits)
}

/// Parses the longest `digits[.digits]` prefix, ignoring trailing punctuation.
fn leading_decimal(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    if end == 0 {
        return None;
    }
    s[..end].parse().ok()
}

pub fn classify_job_type(text: &str) -> JobType {
    let lower = text.to_lowercase();
    JOB_TYPE_LABELS
        .iter()
        .find(|(label, _)| lower.contains(label))
        .map(|(_, job_type)| *job_type)
        .unwrap_or(JobType::Unknown)
}

pub fn evaluate(salary_text: Option<&str>, job_type_text: Option<&str>, salary_floor: f64) -> EligibilityDecision {
    let min_salary = salary_text.and_then(parse_salary);
    let job_type = job_type_text.map(classify_job_type).unwrap_or(JobType::Unknown);
    let salary_ok = min_salary.is_some_and(|salary| salary >= salary_floor);

    EligibilityDecision {
        min_salary,
        job_type,
        salary_floor,
        accepted: salary_ok && job_type.is_acceptable(),
    }
}
