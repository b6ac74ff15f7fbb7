use crate::domain::model::{CourseDraft, SchoolYearDraft, SubjectDraft, MAX_GRADE, MIN_GRADE};
use crate::utils::error::{ProvisionError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name -> human readable message. Empty means the draft is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::ValidationError { errors: self })
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

fn require_text(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

pub fn validate_school_year(draft: &SchoolYearDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require_text(
        &mut errors,
        "schoolYearCode",
        &draft.school_year_code,
        "School year code is required",
    );
    errors
}

pub fn validate_subject(draft: &SubjectDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require_text(
        &mut errors,
        "subjectName",
        &draft.subject_name,
        "Subject name is required",
    );
    errors
}

pub fn validate_course(draft: &CourseDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if draft.school_year_id.is_none() {
        errors.insert("schoolYearId", "School year is required");
    }

    let grade = draft.grade.trim();
    if grade.is_empty() {
        errors.insert("grade", "Grade is required");
    } else {
        match grade.parse::<u8>() {
            Ok(g) if (MIN_GRADE..=MAX_GRADE).contains(&g) => {}
            _ => errors.insert(
                "grade",
                format!("Grade must be a whole number from {} to {}", MIN_GRADE, MAX_GRADE),
            ),
        }
    }

    require_text(&mut errors, "section", &draft.section, "Section is required");
    errors
}
