use crate::domain::model::{BatchRequest, CourseDraft, MAX_GRADE, MIN_GRADE};
use crate::utils::error::{ProvisionError, Result};

pub const DEFAULT_COURSE_NAME_TEMPLATE: &str = "Grade {grade} {section}";

/// Fills `{grade}` and `{section}` in a course name template.
pub fn render_course_name(template: &str, grade: &str, section: &str) -> String {
    template
        .replace("{grade}", grade.trim())
        .replace("{section}", section.trim())
}

/// Turns a grade range into one course draft per grade, ascending.
#[derive(Debug, Clone)]
pub struct RangeExpander {
    template: String,
}

impl Default for RangeExpander {
    fn default() -> Self {
        Self::new(DEFAULT_COURSE_NAME_TEMPLATE)
    }
}

impl RangeExpander {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn expand(&self, request: &BatchRequest) -> Result<Vec<CourseDraft>> {
        let school_year_id = request
            .school_year_id
            .ok_or_else(|| ProvisionError::range("a school year must be selected"))?;

        let section = request.section.trim();
        if section.is_empty() {
            return Err(ProvisionError::range("a section is required"));
        }

        for (name, grade) in [("start", request.start_grade), ("end", request.end_grade)] {
            if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
                return Err(ProvisionError::range(format!(
                    "{} grade {} is outside {}..={}",
                    name, grade, MIN_GRADE, MAX_GRADE
                )));
            }
        }

        if request.start_grade > request.end_grade {
            return Err(ProvisionError::range(format!(
                "start grade {} is after end grade {}",
                request.start_grade, request.end_grade
            )));
        }

        let template = request
            .course_name_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.template);

        let drafts = (request.start_grade..=request.end_grade)
            .map(|grade| {
                let grade = grade.to_string();
                CourseDraft {
                    school_year_id: Some(school_year_id),
                    course_name: Some(render_course_name(template, &grade, section)),
                    grade,
                    section: section.to_string(),
                    teachers: request.teachers,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Expanded grades {}..={} section {} into {} candidates",
            request.start_grade,
            request.end_grade,
            section,
            drafts.len()
        );

        Ok(drafts)
    }
}
