//! Personal information collected in the first step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The applicant's personal details, as typed.
///
/// Values are kept verbatim; format rules are applied by the step validator,
/// never on assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    /// State, province or country of residence.
    pub region: String,
    /// Driver's licence or other government-issued id number.
    pub government_id: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub blood_type: Option<String>,
    /// National identifier (SSN or equivalent), when collected.
    pub national_id: Option<String>,
}

impl PersonalInfo {
    /// Raw value of a field; optional fields read as empty when absent.
    pub fn value(&self, field: PersonalField) -> &str {
        match field {
            PersonalField::FullName => &self.full_name,
            PersonalField::Phone => &self.phone,
            PersonalField::Email => &self.email,
            PersonalField::Region => &self.region,
            PersonalField::GovernmentId => &self.government_id,
            PersonalField::DateOfBirth => &self.date_of_birth,
            PersonalField::BloodType => self.blood_type.as_deref().unwrap_or(""),
            PersonalField::NationalId => self.national_id.as_deref().unwrap_or(""),
        }
    }
}

/// Names the individual personal-information fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalField {
    FullName,
    Phone,
    Email,
    Region,
    GovernmentId,
    DateOfBirth,
    BloodType,
    NationalId,
}

impl PersonalField {
    /// Fields that must be present before step one is complete.
    pub const REQUIRED: [PersonalField; 6] = [
        PersonalField::FullName,
        PersonalField::Phone,
        PersonalField::Email,
        PersonalField::Region,
        PersonalField::GovernmentId,
        PersonalField::DateOfBirth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullName => "full name",
            Self::Phone => "phone number",
            Self::Email => "email address",
            Self::Region => "region",
            Self::GovernmentId => "license number",
            Self::DateOfBirth => "date of birth",
            Self::BloodType => "blood type",
            Self::NationalId => "national id",
        }
    }
}

impl fmt::Display for PersonalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
