//! Normalized job posting.

use crate::error::{CollectError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job posting in canonical form.
///
/// Built from one raw record of the search API. Text fields missing from the
/// raw record are empty strings and list fields are empty lists, so every
/// record serializes with the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    // Posting
    pub job_name: String,
    pub salary_desc: String,
    pub job_degree: String,
    pub job_experience: String,

    // Location
    pub city_name: String,
    pub area_district: String,
    pub business_district: String,

    // Classification
    pub job_type: String,
    pub job_labels: Vec<String>,
    pub skills: Vec<String>,
    pub welfare_list: Vec<String>,

    // Identifiers; `job_id` is the dedup key
    pub job_id: String,
    pub lid: String,
    pub security_id: String,
    pub expect_id: String,

    // Company
    pub brand_name: String,
    pub brand_logo: String,
    pub brand_stage_name: String,
    pub brand_industry: String,
    pub brand_scale_name: String,
    pub company_id: String,

    // Recruiter
    pub boss_name: String,
    pub boss_title: String,
    pub boss_avatar: String,
    pub boss_id: String,

    // Status
    pub job_valid_status: String,
    pub job_status_desc: String,
    pub contact_chat_im: String,
    pub last_modify_time: String,
    pub prolong: String,
    pub icon_word: String,
}

impl JobRecord {
    /// Normalize a raw API record whose identifier has already been extracted.
    #[must_use]
    pub fn from_raw(raw: &Value, job_id: impl Into<String>) -> Self {
        Self {
            job_name: text(raw, "jobName"),
            salary_desc: text(raw, "salaryDesc"),
            job_degree: text(raw, "jobDegree"),
            job_experience: text(raw, "jobExperience"),

            city_name: text(raw, "cityName"),
            area_district: text(raw, "areaDistrict"),
            business_district: text(raw, "businessDistrict"),

            job_type: text(raw, "jobType"),
            job_labels: list(raw, "jobLabels"),
            skills: list(raw, "skills"),
            welfare_list: list(raw, "welfareList"),

            job_id: job_id.into(),
            lid: text(raw, "lid"),
            security_id: text(raw, "securityId"),
            expect_id: text(raw, "expectId"),

            brand_name: text(raw, "brandName"),
            brand_logo: text(raw, "brandLogo"),
            brand_stage_name: text(raw, "brandStageName"),
            brand_industry: text(raw, "brandIndustry"),
            brand_scale_name: text(raw, "brandScaleName"),
            company_id: text(raw, "encryptBrandId"),

            boss_name: text(raw, "bossName"),
            boss_title: text(raw, "bossTitle"),
            boss_avatar: text(raw, "bossAvatar"),
            boss_id: text(raw, "encryptBossId"),

            job_valid_status: text(raw, "jobValidStatus"),
            job_status_desc: text(raw, "jobStatusDesc"),
            contact_chat_im: text(raw, "contactChatIm"),
            last_modify_time: text(raw, "lastModifyTime"),
            prolong: text(raw, "prolong"),
            icon_word: text(raw, "iconWord"),
        }
    }

    /// Check that the fields every downstream consumer relies on are present.
    ///
    /// # Errors
    /// Returns [`CollectError::Validation`] naming the first empty required
    /// field (`job_name`, `job_id`, `brand_name`).
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("job_name", &self.job_name),
            ("job_id", &self.job_id),
            ("brand_name", &self.brand_name),
        ] {
            if value.trim().is_empty() {
                return Err(CollectError::Validation(format!(
                    "record is missing required field {field}"
                )));
            }
        }
        Ok(())
    }
}

/// Scalar field as text; numbers and booleans are stringified.
fn text(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Array field as a list of strings; non-string items are skipped.
fn list(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
