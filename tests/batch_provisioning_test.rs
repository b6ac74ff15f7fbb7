use academic_provision::core::entity::CatalogEntity;
use academic_provision::{
    BatchRequest, ConfirmationWorkflow, Course, CourseDraft, InMemoryCatalogStore, NaturalKey,
    Phase, ProvisionError, ProvisioningEngine, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
};
use anyhow::Result;
use tokio_test::{assert_err, assert_ok};

const YEAR: i64 = 5;

fn course(id: i64, grade: u8, section: &str) -> Course {
    Course {
        course_id: id,
        school_year_id: YEAR,
        grade: grade.to_string(),
        section: section.to_string(),
        course_name: format!("Grade {} {}", grade, section),
        teachers: Default::default(),
    }
}

async fn engine_with_courses(courses: Vec<Course>) -> Result<(InMemoryCatalogStore, ProvisioningEngine<InMemoryCatalogStore>)> {
    let store = InMemoryCatalogStore::new();
    store.seed_courses(courses).await;
    let mut engine = ProvisioningEngine::new(store.clone());
    engine.refresh().await?;
    Ok((store, engine))
}

/// 十二個年級、其中三個已存在
/// 1. 偵測到衝突並列出
/// 2. 確認略過後送出其餘九筆
/// 3. 總結為 9 建立、3 略過、0 失敗
#[tokio::test]
async fn test_full_range_with_existing_grades() -> Result<()> {
    let (store, mut engine) = engine_with_courses(vec![
        course(100, 2, "A"),
        course(101, 5, "a"),
        course(102, 9, "A"),
    ])
    .await?;

    let mut workflow = ConfirmationWorkflow::<Course>::new();
    let phase = engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "A", 1, 12))?;
    assert_eq!(phase, Phase::ConflictsFound);

    let conflicting = workflow.conflicting_keys();
    assert_eq!(
        conflicting,
        vec![
            NaturalKey::course(YEAR, "2", "A"),
            NaturalKey::course(YEAR, "5", "A"),
            NaturalKey::course(YEAR, "9", "A"),
        ]
    );
    assert_eq!(workflow.remainder().len(), 9);

    assert_eq!(workflow.acknowledge_conflicts()?, Phase::AwaitingConfirmation);
    let summary = engine.commit(&mut workflow).await?;

    assert_eq!(summary.total, 12);
    assert_eq!(summary.created_count(), 9);
    assert_eq!(summary.skipped_count(), 3);
    assert_eq!(summary.failed_count(), 0);
    assert_eq!(workflow.phase(), Phase::Done);

    // 已存在的年級不會送到後端
    assert_eq!(store.create_calls().await, 9);
    assert_eq!(engine.mirror().courses().len(), 12);
    Ok(())
}

/// 一筆暫時性失敗不會中斷批次，結果依輸入順序排列
#[tokio::test]
async fn test_transient_failure_is_isolated() -> Result<()> {
    let (store, mut engine) = engine_with_courses(vec![
        course(100, 2, "A"),
        course(101, 5, "A"),
        course(102, 9, "A"),
    ])
    .await?;
    store
        .fail_once(NaturalKey::course(YEAR, "7", "A"), "gateway timeout")
        .await;

    let mut workflow = ConfirmationWorkflow::<Course>::new();
    engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "A", 1, 12))?;
    workflow.acknowledge_conflicts()?;
    let summary = engine.commit(&mut workflow).await?;

    assert_eq!(summary.created_count(), 8);
    assert_eq!(summary.skipped_count(), 3);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failed, vec!["Grade 7 A: Transient failure: gateway timeout".to_string()]);

    let created_grades: Vec<&str> = summary.created.iter().map(|c| c.grade.as_str()).collect();
    assert_eq!(created_grades, vec!["1", "3", "4", "6", "8", "10", "11", "12"]);
    Ok(())
}

/// 部分失敗後重跑同一個範圍，只會建立缺少的那一筆
#[tokio::test]
async fn test_rerun_after_partial_failure_creates_only_missing() -> Result<()> {
    let (store, mut engine) = engine_with_courses(Vec::new()).await?;
    store
        .fail_once(NaturalKey::course(YEAR, "3", "B"), "connection reset")
        .await;

    let request = BatchRequest::new(YEAR, "B", 1, 4);
    let mut workflow = ConfirmationWorkflow::<Course>::new();
    assert_eq!(engine.stage_grades(&mut workflow, &request)?, Phase::AwaitingConfirmation);
    engine.commit(&mut workflow).await?;
    let first = workflow.take_summary()?;
    assert_eq!((first.created_count(), first.failed_count()), (3, 1));
    assert_eq!(workflow.phase(), Phase::Idle);

    assert_eq!(engine.stage_grades(&mut workflow, &request)?, Phase::ConflictsFound);
    let remainder: Vec<String> = workflow.remainder().iter().map(|d| d.grade.clone()).collect();
    assert_eq!(remainder, vec!["3".to_string()]);

    workflow.acknowledge_conflicts()?;
    let second = engine.commit(&mut workflow).await?;
    assert_eq!(second.created_count(), 1);
    assert_eq!(second.skipped_count(), 3);
    assert_eq!(engine.mirror().courses().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_ascending_range_and_reversed_range() -> Result<()> {
    let (store, mut engine) = engine_with_courses(Vec::new()).await?;

    let mut workflow = ConfirmationWorkflow::<Course>::new();
    engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "C", 1, 5))?;
    let grades: Vec<String> = workflow.remainder().iter().map(|d| d.grade.clone()).collect();
    assert_eq!(grades, vec!["1", "2", "3", "4", "5"]);
    workflow.cancel()?;

    let err = assert_err!(engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "C", 5, 1)));
    assert!(matches!(err, ProvisionError::RangeError { .. }));
    assert_eq!(workflow.phase(), Phase::Idle);
    assert_eq!(store.create_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_every_candidate_conflicting_cannot_proceed() -> Result<()> {
    let (store, mut engine) =
        engine_with_courses(vec![course(1, 1, "D"), course(2, 2, "D")]).await?;

    let mut workflow = ConfirmationWorkflow::<Course>::new();
    assert_eq!(
        engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "D", 1, 2))?,
        Phase::ConflictsFound
    );
    assert!(workflow.remainder().is_empty());
    assert_err!(workflow.acknowledge_conflicts());
    assert_eq!(workflow.cancel()?, Phase::Cancelled);
    assert_eq!(store.create_calls().await, 0);
    Ok(())
}

/// 批次完成後重新載入失敗：仍保留總結，狀態為 Failed
#[tokio::test]
async fn test_refresh_failure_after_commit_keeps_summary() -> Result<()> {
    let (store, mut engine) = engine_with_courses(Vec::new()).await?;

    let mut workflow = ConfirmationWorkflow::<Course>::new();
    engine.stage_grades(&mut workflow, &BatchRequest::new(YEAR, "E", 1, 3))?;
    store.fail_listing("catalog offline").await;

    let summary = engine.commit(&mut workflow).await?;
    assert_eq!(summary.created_count(), 3);
    assert_eq!(workflow.phase(), Phase::Failed);

    // 已建立的項目仍留在本地鏡像中
    assert_eq!(engine.mirror().courses().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_plain_create_conflict_makes_no_store_call() -> Result<()> {
    let store = InMemoryCatalogStore::new();
    store
        .seed_subjects(vec![Subject {
            subject_id: 1,
            subject_name: "History".to_string(),
        }])
        .await;
    let mut engine = ProvisioningEngine::new(store.clone());
    engine.refresh().await?;

    let err = assert_err!(engine.create::<Subject>(SubjectDraft::new("history ")).await);
    assert!(err.is_conflict());
    assert_eq!(store.create_calls().await, 0);

    let created = assert_ok!(engine.create::<Subject>(SubjectDraft::new("Geography")).await);
    assert_eq!(created.label(), "Geography");
    assert_eq!(store.create_calls().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_edit_course_keeping_its_own_key() -> Result<()> {
    let (store, mut engine) =
        engine_with_courses(vec![course(10, 4, "F"), course(11, 5, "F")]).await?;

    let renamed = engine
        .update::<Course>(10, CourseDraft::new(YEAR, "4", "f").with_name("Fourth F"))
        .await?;
    assert_eq!(renamed.course_name, "Fourth F");
    assert_eq!(engine.mirror().courses()[0].course_name, "Fourth F");

    let err = assert_err!(
        engine
            .update::<Course>(10, CourseDraft::new(YEAR, "5", "F"))
            .await
    );
    assert!(err.is_conflict());
    assert_eq!(store.create_calls().await, 1);
    Ok(())
}

/// 使用者一次輸入多個科目，其中一筆空白
/// 整批被拒絕，錯誤標示第幾筆，流程回到 Idle
#[tokio::test]
async fn test_staged_subjects_with_one_invalid_are_all_rejected() -> Result<()> {
    let store = InMemoryCatalogStore::new();
    let mut engine = ProvisioningEngine::new(store.clone());

    let mut workflow = ConfirmationWorkflow::<Subject>::new();
    let err = assert_err!(engine.stage(
        &mut workflow,
        vec![
            SubjectDraft::new("Biology"),
            SubjectDraft::new("  "),
            SubjectDraft::new("Physics"),
        ],
    ));

    match err {
        ProvisionError::ValidationError { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors.contains("candidates[1].subjectName"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(workflow.phase(), Phase::Idle);

    // 修正後可以重新送出
    let phase = engine.stage(
        &mut workflow,
        vec![SubjectDraft::new("Biology"), SubjectDraft::new("Physics")],
    )?;
    assert_eq!(phase, Phase::AwaitingConfirmation);
    let summary = engine.commit(&mut workflow).await?;
    assert_eq!(summary.created_count(), 2);
    assert_eq!(store.create_calls().await, 2);
    Ok(())
}

/// 同一批中輸入兩次相同的學年，第二筆在送出前被略過
#[tokio::test]
async fn test_repeated_key_within_one_request_is_created_once() -> Result<()> {
    let store = InMemoryCatalogStore::new();
    let mut engine = ProvisioningEngine::new(store.clone());

    let mut workflow = ConfirmationWorkflow::<SchoolYear>::new();
    let phase = engine.stage(
        &mut workflow,
        vec![
            SchoolYearDraft::new("2025-2026"),
            SchoolYearDraft::new("2026-2027"),
            SchoolYearDraft::new(" 2025-2026 "),
        ],
    )?;
    assert_eq!(phase, Phase::AwaitingConfirmation);

    let summary = engine.commit(&mut workflow).await?;
    assert_eq!(summary.created_count(), 2);
    assert_eq!(summary.skipped_count(), 1);
    assert_eq!(summary.failed_count(), 0);

    let first_id = summary.created[0].school_year_id;
    assert_eq!(
        summary.skipped,
        vec![format!("2025-2026 (already exists as #{})", first_id)]
    );
    assert_eq!(store.create_calls().await, 2);
    assert_eq!(engine.mirror().school_years().len(), 2);
    Ok(())
}
