mod support;

use steward::draft::{Draft, DraftChild, DraftParent};
use steward::submit::{submit_draft, CreatedParent};
use steward::types::{validate_hierarchy, TaskPriority};
use steward::wizard::WizardSession;
use support::{
    mock_create_project, mock_create_tasks, project_json, test_config, CreateTaskEcho, TestApi,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn mobile_app_draft() -> Draft {
    Draft {
        parent: DraftParent::Project {
            name: "Mobile App".to_string(),
            description: "Companion app".to_string(),
            priority: 80,
            target_days: 90,
        },
        children: vec![
            DraftChild::task("Design", 40.0, TaskPriority::High),
            DraftChild::task("Backend", 56.0, TaskPriority::High),
            DraftChild::task("QA", 32.0, TaskPriority::High),
        ],
        reasoning: Vec::new(),
    }
}

#[tokio::test]
async fn full_success_creates_parent_and_children_in_order() {
    let api = TestApi::start().await;
    mock_create_project(&api.server, project_json("proj-1", "Mobile App")).await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 3).await;

    let report = submit_draft(&api.ctx, &mobile_app_draft())
        .await
        .expect("submission");

    assert!(report.is_complete());
    assert_eq!(report.parent.id(), "proj-1");
    assert_eq!(report.children_created(), 3);

    // Children come back in draft order, all referencing the new parent.
    let titles: Vec<&str> = report.created.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Design", "Backend", "QA"]);
    assert!(report.created.iter().all(|t| t.project_id == "proj-1"));

    // The snapshot grew by exactly the created entities.
    let tasks = api.ctx.snapshot_tasks();
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.project_id == "proj-1"));
    assert_eq!(api.ctx.snapshot_projects().len(), 1);
}

#[tokio::test]
async fn child_failure_stops_submission_and_reports_progress() {
    let api = TestApi::start().await;
    mock_create_project(&api.server, project_json("proj-1", "Mobile App")).await;
    // c1 succeeds, c2 fails, c3 must never be attempted.
    mock_create_tasks(&api.server, CreateTaskEcho::failing_at(1), 2).await;

    let report = submit_draft(&api.ctx, &mobile_app_draft())
        .await
        .expect("partial result is still a result");

    assert!(!report.is_complete());
    assert!(matches!(report.parent, CreatedParent::Project(_)));
    assert_eq!(report.children_created(), 1);
    assert_eq!(report.created[0].title, "Design");

    let failed = report.failed.expect("failed child");
    assert_eq!(failed.index, 1);
    assert_eq!(failed.title, "Backend");
    assert_eq!(failed.error.code(), "VALIDATION_ERROR");

    // No compensation: the parent and the first child stay.
    assert_eq!(api.ctx.snapshot_projects().len(), 1);
    assert_eq!(api.ctx.snapshot_tasks().len(), 1);
}

#[tokio::test]
async fn parent_failure_aborts_with_no_children_attempted() {
    let api = TestApi::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api.server)
        .await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 0).await;

    let err = submit_draft(&api.ctx, &mobile_app_draft())
        .await
        .expect_err("parent failed");
    assert_eq!(err.code(), "HTTP_500");
    assert!(api.ctx.snapshot_projects().is_empty());
    assert!(api.ctx.snapshot_tasks().is_empty());
}

#[tokio::test]
async fn subtasks_attach_to_their_preceding_top_level_sibling() {
    let api = TestApi::start().await;
    mock_create_project(&api.server, project_json("proj-1", "Platform")).await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 4).await;

    let draft = Draft {
        parent: DraftParent::Project {
            name: "Platform".to_string(),
            description: String::new(),
            priority: 70,
            target_days: 60,
        },
        children: vec![
            DraftChild::task("Backend development", 56.0, TaskPriority::High),
            DraftChild::subtask("Database schema design", 16.0, TaskPriority::High),
            DraftChild::task("Frontend development", 48.0, TaskPriority::High),
            DraftChild::subtask("Component library", 12.0, TaskPriority::Medium),
        ],
        reasoning: Vec::new(),
    };

    let report = submit_draft(&api.ctx, &draft).await.expect("submission");
    assert!(report.is_complete());

    let created = &report.created;
    assert_eq!(created[1].parent_task_id.as_deref(), Some(created[0].id.as_str()));
    assert_eq!(created[3].parent_task_id.as_deref(), Some(created[2].id.as_str()));
    assert_eq!(created[0].parent_task_id, None);
    assert_eq!(created[2].parent_task_id, None);

    validate_hierarchy(&api.ctx.snapshot_tasks()).expect("hierarchy invariant");
}

#[tokio::test]
async fn task_draft_children_hang_off_the_created_parent_task() {
    let api = TestApi::start().await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 3).await;

    let draft = Draft {
        parent: DraftParent::Task {
            title: "Invoice API".to_string(),
            description: "Build the invoicing endpoints".to_string(),
            project_id: "p1".to_string(),
            priority: TaskPriority::High,
            estimated_hours: 14.0,
        },
        children: vec![
            DraftChild::subtask("API design & documentation", 6.0, TaskPriority::High),
            DraftChild::subtask("Core endpoint implementation", 8.0, TaskPriority::High),
        ],
        reasoning: Vec::new(),
    };

    let report = submit_draft(&api.ctx, &draft).await.expect("submission");
    assert!(report.is_complete());

    let parent_id = report.parent.id().to_string();
    assert!(matches!(report.parent, CreatedParent::Task(_)));
    assert_eq!(report.children_created(), 2);
    for child in &report.created {
        assert_eq!(child.parent_task_id.as_deref(), Some(parent_id.as_str()));
        assert_eq!(child.project_id, "p1");
    }

    validate_hierarchy(&api.ctx.snapshot_tasks()).expect("hierarchy invariant");
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_any_network_call() {
    let api = TestApi::start().await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 0).await;

    let mut draft = mobile_app_draft();
    draft.parent.set_title("  ");
    let err = submit_draft(&api.ctx, &draft).await.expect_err("invalid");
    assert_eq!(err.code(), "EMPTY_DRAFT_TITLE");
}

#[tokio::test]
async fn wizard_commit_flows_into_bulk_submission() {
    let api = TestApi::start().await;
    mock_create_project(&api.server, project_json("proj-9", "Mobile Application Development"))
        .await;
    mock_create_tasks(&api.server, CreateTaskEcho::new(), 11).await;

    let config = test_config(&api.server.uri());
    let mut session = WizardSession::project(&config);
    session
        .send_message("generate a plan for our mobile app")
        .await
        .expect("draft generated");
    session.begin_editing().expect("editing");
    let draft = session.commit().expect("commit");

    let report = submit_draft(&api.ctx, &draft).await.expect("submission");
    assert!(report.is_complete());
    assert_eq!(report.children_created(), draft.children.len());

    // Wizard subtasks ended up under their top-level siblings.
    validate_hierarchy(&api.ctx.snapshot_tasks()).expect("hierarchy invariant");
}
