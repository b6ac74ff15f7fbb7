use crate::domain::model::{EntityId, TeacherSlots};
use crate::utils::error::{ProvisionError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "provision")]
#[command(about = "Create school years, subjects and courses in the school catalog")]
pub struct CliConfig {
    #[arg(long, short, default_value = "provision.toml")]
    pub config: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the catalog as currently stored
    List,

    /// Create one school year
    SchoolYear { code: String },

    /// Create one subject
    Subject { name: String },

    /// Create one course
    Course {
        #[arg(long)]
        school_year_id: EntityId,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
        #[arg(long)]
        name: Option<String>,
        /// Up to three teacher ids
        #[arg(long = "teacher", num_args = 1)]
        teachers: Vec<EntityId>,
    },

    /// Create one course per grade in a range
    Grades {
        #[arg(long)]
        school_year_id: EntityId,
        #[arg(long)]
        section: String,
        #[arg(long)]
        start: u8,
        #[arg(long)]
        end: u8,
        #[arg(long = "teacher", num_args = 1)]
        teachers: Vec<EntityId>,
        /// Skip conflicts and confirm without prompting
        #[arg(long)]
        yes: bool,
    },
}

impl Command {
    pub fn teacher_slots(&self) -> TeacherSlots {
        let ids: &[EntityId] = match self {
            Command::Course { teachers, .. } | Command::Grades { teachers, .. } => teachers,
            _ => &[],
        };
        TeacherSlots {
            teacher_id1: ids.first().copied(),
            teacher_id2: ids.get(1).copied(),
            teacher_id3: ids.get(2).copied(),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("config", &self.config)?;

        if let Command::Course { teachers, .. } | Command::Grades { teachers, .. } = &self.command
        {
            if teachers.len() > 3 {
                return Err(ProvisionError::InvalidConfigValueError {
                    field: "teacher".to_string(),
                    value: teachers.len().to_string(),
                    reason: "A course takes at most three teachers".to_string(),
                });
            }
        }
        Ok(())
    }
}
