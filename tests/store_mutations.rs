mod support;

use std::time::Duration;

use serde_json::json;
use steward::mutation::{MutationFilter, MutationState};
use steward::types::{TaskStatus, NudgeQuery};
use support::{assigned_task_json, envelope, error_body, nudge_json, task_json, TestApi};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn status_update_applies_optimistically_and_commits() {
    let api = TestApi::start().await;
    api.mock_task_list(vec![task_json("t1", "p1", "Design")], 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/t1/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(task_json("t1", "p1", "Design"))),
        )
        .expect(1)
        .mount(&api.server)
        .await;

    api.ctx.tasks(None).await.expect("seed snapshot");
    api.ctx
        .update_task_status("t1", TaskStatus::InProgress)
        .await
        .expect("update");

    let task = api.ctx.snapshot_task("t1").expect("task");
    assert_eq!(task.status, TaskStatus::InProgress);

    let records = api.ctx.mutation_records(&MutationFilter::default(), None);
    assert!(records
        .iter()
        .any(|r| r.state == MutationState::Committed && r.entity_id.as_deref() == Some("t1")));
}

#[tokio::test]
async fn failed_mutation_rolls_back_to_previous_snapshot() {
    let api = TestApi::start().await;
    api.mock_task_list(vec![task_json("t1", "p1", "Design")], 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/t1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api.server)
        .await;

    api.ctx.tasks(None).await.expect("seed snapshot");
    let before = api.ctx.snapshot_task("t1").expect("task");

    let err = api
        .ctx
        .update_task_status("t1", TaskStatus::Done)
        .await
        .expect_err("server failure");
    assert_eq!(err.code(), "HTTP_500");

    // rollback(apply(S, P)) = S
    let after = api.ctx.snapshot_task("t1").expect("task");
    assert_eq!(after, before);

    let records = api.ctx.mutation_records(
        &MutationFilter {
            state: Some(MutationState::RolledBack),
            ..MutationFilter::default()
        },
        None,
    );
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn concurrent_mutations_on_same_entity_conflict() {
    let api = TestApi::start().await;
    api.mock_task_list(vec![task_json("t1", "p1", "Design")], 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/t1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(task_json("t1", "p1", "Design")))
                .set_delay(Duration::from_millis(250)),
        )
        .expect(1)
        .mount(&api.server)
        .await;

    api.ctx.tasks(None).await.expect("seed snapshot");

    let ctx = api.ctx.clone();
    let first =
        tokio::spawn(async move { ctx.update_task_status("t1", TaskStatus::Ready).await });
    // Give the first mutation time to claim the entity.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = api
        .ctx
        .update_task_status("t1", TaskStatus::Done)
        .await
        .expect_err("second mutation while first is in flight");
    assert_eq!(err.code(), "CONFLICT");

    first.await.expect("join").expect("first mutation");
    assert_eq!(
        api.ctx.snapshot_task("t1").expect("task").status,
        TaskStatus::Ready
    );

    // After reconciliation the entity accepts mutations again.
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/t1/assign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(assigned_task_json(
            "t1", "p1", "Design", "alice",
        ))))
        .mount(&api.server)
        .await;
    api.ctx.assign_task("t1", "alice").await.expect("assign");
    assert_eq!(
        api.ctx.snapshot_task("t1").expect("task").assignee_id.as_deref(),
        Some("alice")
    );
}

#[tokio::test]
async fn assign_failure_restores_previous_assignee() {
    let api = TestApi::start().await;
    api.mock_task_list(
        vec![assigned_task_json("t1", "p1", "Design", "bob")],
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/t1/assign"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(error_body(
                "ALREADY_ASSIGNED",
                "task is already assigned",
            )),
        )
        .mount(&api.server)
        .await;

    api.ctx.tasks(None).await.expect("seed snapshot");
    let err = api
        .ctx
        .assign_task("t1", "alice")
        .await
        .expect_err("assignment rejected");
    assert_eq!(err.code(), "ALREADY_ASSIGNED");

    assert_eq!(
        api.ctx.snapshot_task("t1").expect("task").assignee_id.as_deref(),
        Some("bob")
    );
}

#[tokio::test]
async fn marking_nudge_read_twice_keeps_counter_stable() {
    let api = TestApi::start().await;
    api.mock_nudge_list(vec![
        nudge_json("n1", "unread"),
        nudge_json("n2", "unread"),
    ])
    .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/nudges/n1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(nudge_json("n1", "read"))))
        .expect(2)
        .mount(&api.server)
        .await;

    api.ctx
        .nudges(&NudgeQuery::default())
        .await
        .expect("seed nudges");
    assert_eq!(api.ctx.unread_nudges(), 2);

    api.ctx.mark_nudge_read("n1").await.expect("first read");
    assert_eq!(api.ctx.unread_nudges(), 1);

    // Idempotent intent: repeating must not double-decrement.
    api.ctx.mark_nudge_read("n1").await.expect("second read");
    assert_eq!(api.ctx.unread_nudges(), 1);
}

#[tokio::test]
async fn failed_nudge_dismiss_restores_unread_count() {
    let api = TestApi::start().await;
    api.mock_nudge_list(vec![nudge_json("n1", "unread")]).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/nudges/n1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api.server)
        .await;

    api.ctx
        .nudges(&NudgeQuery::default())
        .await
        .expect("seed nudges");
    assert_eq!(api.ctx.unread_nudges(), 1);

    api.ctx
        .dismiss_nudge("n1")
        .await
        .expect_err("server failure");
    assert_eq!(api.ctx.unread_nudges(), 1);
    assert_eq!(
        api.ctx.snapshot_nudges()[0].status,
        steward::types::NudgeStatus::Unread
    );
}

#[tokio::test]
async fn nudge_action_marks_nudge_acted() {
    let api = TestApi::start().await;
    api.mock_nudge_list(vec![nudge_json("n1", "unread")]).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/nudges/n1/actions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "nudgeId": "n1",
            "actionTaken": "accept_suggestion",
            "nudgeStatus": "acted",
        }))))
        .expect(1)
        .mount(&api.server)
        .await;

    api.ctx
        .nudges(&NudgeQuery::default())
        .await
        .expect("seed nudges");
    api.ctx.take_nudge_action("n1").await.expect("action");

    assert_eq!(
        api.ctx.snapshot_nudges()[0].status,
        steward::types::NudgeStatus::Acted
    );
    assert_eq!(api.ctx.unread_nudges(), 0);
}

#[tokio::test]
async fn delete_is_not_optimistic() {
    let api = TestApi::start().await;
    api.mock_task_list(
        vec![task_json("t1", "p1", "Design"), task_json("t2", "p1", "QA")],
        1,
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/tasks/t1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/tasks/t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&api.server)
        .await;

    api.ctx.tasks(None).await.expect("seed snapshot");

    // Failed delete: the task must still be present (it never left).
    api.ctx.delete_task("t1").await.expect_err("delete fails");
    assert!(api.ctx.snapshot_task("t1").is_some());

    // Successful delete removes the row only after the response.
    api.ctx.delete_task("t2").await.expect("delete");
    assert!(api.ctx.snapshot_task("t2").is_none());
}

#[tokio::test]
async fn mutation_on_unknown_entity_reports_not_found() {
    let api = TestApi::start().await;
    api.mock_task_list(vec![], 1).await;
    api.ctx.tasks(None).await.expect("seed snapshot");

    let err = api
        .ctx
        .update_task_status("ghost", TaskStatus::Done)
        .await
        .expect_err("unknown entity");
    assert_eq!(err.code(), "NOT_FOUND");
}
