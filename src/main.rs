use academic_provision::config::Command;
use academic_provision::core::entity::CatalogEntity;
use academic_provision::utils::error::ErrorSeverity;
use academic_provision::utils::{logger, validation::Validate};
use academic_provision::{
    BatchRequest, BatchSummary, CliConfig, ConfirmationWorkflow, Course, CourseDraft,
    HttpCatalogStore, Phase, ProvisionConfig, ProvisioningEngine, RangeExpander, SchoolYear,
    SchoolYearDraft, Subject, SubjectDraft,
};
use clap::Parser;
use std::io::{self, BufRead, Write};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = ProvisionConfig::from_file(&cli.config);

    // 初始化日誌；配置讀取失敗時用預設格式回報錯誤
    let format = config
        .as_ref()
        .map(ProvisionConfig::log_format)
        .unwrap_or_default();
    logger::init_logger(format, cli.verbose);

    let result = match config {
        Ok(config) => run(&cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!(
                "❌ Provisioning failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 4,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

/// Returns `false` when a batch finished with failed items.
async fn run(cli: &CliConfig, config: ProvisionConfig) -> academic_provision::Result<bool> {
    cli.validate()?;
    config.validate()?;
    tracing::debug!("Loaded configuration from {}", cli.config);

    let store = HttpCatalogStore::from_config(&config)?;
    let mut engine =
        ProvisioningEngine::with_expander(store, RangeExpander::new(config.template()));
    engine.refresh().await?;

    match &cli.command {
        Command::List => {
            print_catalog(&engine);
            Ok(true)
        }
        Command::SchoolYear { code } => {
            let year: SchoolYear = engine.create(SchoolYearDraft::new(code.as_str())).await?;
            println!("✅ Created school year {} (#{})", year.label(), year.id());
            Ok(true)
        }
        Command::Subject { name } => {
            let subject: Subject = engine.create(SubjectDraft::new(name.as_str())).await?;
            println!("✅ Created subject {} (#{})", subject.label(), subject.id());
            Ok(true)
        }
        Command::Course {
            school_year_id,
            grade,
            section,
            name,
            ..
        } => {
            let mut draft = CourseDraft::new(*school_year_id, grade.as_str(), section.as_str())
                .with_teachers(cli.command.teacher_slots());
            if let Some(name) = name {
                draft = draft.with_name(name.as_str());
            }
            let course: Course = engine.create(draft).await?;
            println!("✅ Created course {} (#{})", course.label(), course.id());
            Ok(true)
        }
        Command::Grades {
            school_year_id,
            section,
            start,
            end,
            yes,
            ..
        } => {
            let mut request = BatchRequest::new(*school_year_id, section.as_str(), *start, *end);
            request.teachers = cli.command.teacher_slots();
            run_grades(&mut engine, &request, *yes).await
        }
    }
}

async fn run_grades(
    engine: &mut ProvisioningEngine<HttpCatalogStore>,
    request: &BatchRequest,
    assume_yes: bool,
) -> academic_provision::Result<bool> {
    let mut workflow = ConfirmationWorkflow::<Course>::new();
    let mut phase = engine.stage_grades(&mut workflow, request)?;

    if phase == Phase::ConflictsFound {
        println!("⚠️  These courses already exist and will be skipped:");
        for conflict in workflow.conflicts() {
            println!("   - {} (#{})", conflict.key, conflict.existing.id());
        }

        if workflow.remainder().is_empty() {
            workflow.cancel()?;
            println!("Nothing left to create.");
            return Ok(true);
        }

        if !assume_yes && !prompt("Skip them and continue?")? {
            workflow.cancel()?;
            println!("Cancelled.");
            return Ok(true);
        }
        phase = workflow.acknowledge_conflicts()?;
    }

    if phase == Phase::AwaitingConfirmation {
        println!("About to create {} courses:", workflow.remainder().len());
        for draft in workflow.remainder() {
            let name = draft.course_name.as_deref().unwrap_or_default();
            println!("   - {}", name);
        }
        if !assume_yes && !prompt("Create them now?")? {
            workflow.cancel()?;
            println!("Cancelled.");
            return Ok(true);
        }
    }

    engine.commit(&mut workflow).await?;
    if workflow.phase() == Phase::Failed {
        println!("⚠️  Courses were submitted but the catalog could not be reloaded.");
    }
    let summary = workflow.take_summary()?;
    print_summary(&summary);
    Ok(!summary.has_failures())
}

fn prompt(question: &str) -> academic_provision::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_summary<E: CatalogEntity>(summary: &BatchSummary<E>) {
    println!("📋 {}", summary);
    for entity in &summary.created {
        println!("   ✅ {} (#{})", entity.label(), entity.id());
    }
    for line in &summary.skipped {
        println!("   ⏭️  {}", line);
    }
    for line in &summary.failed {
        println!("   ❌ {}", line);
    }
    if summary.has_failures() {
        eprintln!("💡 建議: 重新執行同一個指令，已建立的項目會被略過");
    }
}

fn print_catalog(engine: &ProvisioningEngine<HttpCatalogStore>) {
    let mirror = engine.mirror();

    println!("School years ({})", mirror.school_years().len());
    for year in mirror.school_years() {
        println!("   #{} {}", year.school_year_id, year.school_year_code);
    }

    println!("Subjects ({})", mirror.subjects().len());
    for subject in mirror.subjects() {
        println!("   #{} {}", subject.subject_id, subject.subject_name);
    }

    println!("Courses ({})", mirror.courses().len());
    for course in mirror.courses() {
        println!(
            "   #{} {} (year #{}, grade {}, section {})",
            course.course_id, course.course_name, course.school_year_id, course.grade, course.section
        );
    }
}
