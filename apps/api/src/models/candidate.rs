use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A required contact field on a candidate profile.
///
/// Declaration order is the collection priority: name, then email, then phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Email,
    Phone,
}

impl ProfileField {
    pub const ALL: [ProfileField; 3] =
        [ProfileField::Name, ProfileField::Email, ProfileField::Phone];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate as held by the registry. Contact fields stay `None` until the
/// resume extractor or the profile collector fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CandidateProfile {
    pub fn new(name: Option<String>, email: Option<String>, phone: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: non_blank(name),
            email: non_blank(email),
            phone: non_blank(phone),
            resume_file_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => self.name.as_deref(),
            ProfileField::Email => self.email.as_deref(),
            ProfileField::Phone => self.phone.as_deref(),
        }
    }

    /// Overwrites a single contact field. The id is never touched.
    pub fn set_field(&mut self, field: ProfileField, value: String) {
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Email => &mut self.email,
            ProfileField::Phone => &mut self.phone,
        };
        *slot = Some(value);
    }

    /// Missing required fields in collection priority order.
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        ProfileField::ALL
            .into_iter()
            .filter(|f| self.field(*f).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Candidate")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateProfile {
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            resume_file_name: row.resume_file_name,
            created_at: row.created_at,
        }
    }
}
