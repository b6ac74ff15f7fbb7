use serde::{Deserialize, Serialize};

pub type EntityId = i64;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    SchoolYear,
    Subject,
    Course,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::SchoolYear => "school year",
            EntityKind::Subject => "subject",
            EntityKind::Course => "course",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYear {
    pub school_year_id: EntityId,
    pub school_year_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYearDraft {
    pub school_year_code: String,
}

impl SchoolYearDraft {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            school_year_code: code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_id: EntityId,
    pub subject_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDraft {
    pub subject_name: String,
}

impl SubjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            subject_name: name.into(),
        }
    }
}

/// Up to three teacher references per course. Teachers live outside the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id1: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id2: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id3: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: EntityId,
    pub school_year_id: EntityId,
    pub grade: String,
    pub section: String,
    pub course_name: String,
    #[serde(flatten)]
    pub teachers: TeacherSlots,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub school_year_id: Option<EntityId>,
    pub grade: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(flatten)]
    pub teachers: TeacherSlots,
}

impl CourseDraft {
    pub fn new(school_year_id: EntityId, grade: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            school_year_id: Some(school_year_id),
            grade: grade.into(),
            section: section.into(),
            course_name: None,
            teachers: TeacherSlots::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.course_name = Some(name.into());
        self
    }

    pub fn with_teachers(mut self, teachers: TeacherSlots) -> Self {
        self.teachers = teachers;
        self
    }
}

/// 一次建立多個年級課程的請求
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub school_year_id: Option<EntityId>,
    pub section: String,
    pub start_grade: u8,
    pub end_grade: u8,
    #[serde(flatten)]
    pub teachers: TeacherSlots,
    /// Overrides the configured course name template for this batch only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name_template: Option<String>,
}

impl BatchRequest {
    pub fn new(school_year_id: EntityId, section: impl Into<String>, start_grade: u8, end_grade: u8) -> Self {
        Self {
            school_year_id: Some(school_year_id),
            section: section.into(),
            start_grade,
            end_grade,
            teachers: TeacherSlots::default(),
            course_name_template: None,
        }
    }
}
