use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LinkPlatform {
    LinkedIn,
    GitHub,
    LeetCode,
    GeeksForGeeks,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLink {
    pub url: String,
    pub source_text: String,
    pub platform: LinkPlatform,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    pub body_text: String,
    pub links: Vec<ExtractedLink>,
    pub page_count: usize,
    pub format: DocumentFormat,
}

impl DocumentExtraction {
    pub fn first_link(&self, platform: LinkPlatform) -> Option<&ExtractedLink> {
        self.links.iter().find(|link| link.platform == platform)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub name: String,
    pub title: String,
    pub location: String,
    pub skills: Vec<String>,
    pub experience_description: String,
    pub match_score: i64,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}

impl CandidateRecord {
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && (self.linkedin_url.is_some() || self.github_url.is_some())
            && !self.skills.is_empty()
    }
}

/// Caller-supplied context for one freeform parse call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub context_role: String,
    pub context_location: String,
    pub max_records: usize,
}

impl ParseRequest {
    pub fn new(
        context_role: impl Into<String>,
        context_location: impl Into<String>,
        max_records: usize,
    ) -> Self {
        Self {
            context_role: context_role.into(),
            context_location: context_location.into(),
            max_records,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleMatch {
    pub role: String,
    pub match_percentage: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalProficiency {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
    pub leetcode: String,
    pub geeksforgeeks: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub candidate_name: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub achievements: Vec<String>,
    pub technical_proficiency: TechnicalProficiency,
    pub role_matches: Vec<RoleMatch>,
    pub improvement_areas: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
    pub contact: ContactInfo,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub extracted_links: Vec<ExtractedLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionSettings {
    pub default_match_score: i64,
    pub min_block_len: usize,
    pub min_name_len: usize,
    pub min_summary_len: usize,
    pub skill_min_len: usize,
    pub skill_max_len: usize,
    pub max_records_cap: usize,
    pub enhancement_score_min: f64,
    pub enhancement_score_max: f64,
    pub enhancement_concurrency: usize,
    pub enhancement_timeout_secs: u64,
    pub default_phone_country_code: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            default_match_score: 70,
            min_block_len: 40,
            min_name_len: 3,
            min_summary_len: 20,
            skill_min_len: 2,
            skill_max_len: 40,
            max_records_cap: 20,
            enhancement_score_min: 60.0,
            enhancement_score_max: 98.0,
            enhancement_concurrency: 5,
            enhancement_timeout_secs: 30,
            default_phone_country_code: "91".to_string(),
        }
    }
}

impl ExtractionSettings {
    pub fn sanitized(mut self) -> Self {
        self.max_records_cap = self.max_records_cap.clamp(1, 20);
        self.skill_min_len = self.skill_min_len.max(1);
        self.skill_max_len = self.skill_max_len.max(self.skill_min_len);
        if self.enhancement_score_min > self.enhancement_score_max {
            std::mem::swap(
                &mut self.enhancement_score_min,
                &mut self.enhancement_score_max,
            );
        }
        self.enhancement_concurrency = self.enhancement_concurrency.max(1);
        self.enhancement_timeout_secs = self.enhancement_timeout_secs.max(1);
        let digits: String = self
            .default_phone_country_code
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        self.default_phone_country_code = digits;
        self
    }

    pub fn clamp_max_records(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_records_cap.max(1))
    }
}
