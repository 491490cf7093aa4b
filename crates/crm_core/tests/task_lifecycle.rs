use crm_core::db::open_db_in_memory;
use crm_core::repo::now_epoch_ms;
use crm_core::{
    ContactService, NewContact, NewTask, ServiceError, SqliteContactRepository,
    SqliteTaskRepository, TaskListQuery, TaskPatch, TaskPriority, TaskService, TenantId,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

fn tenant(value: &str) -> TenantId {
    TenantId::new(value).unwrap()
}

fn tasks<'c>(conn: &'c Connection, tenant_id: &str) -> TaskService<SqliteTaskRepository<'c>> {
    TaskService::new(SqliteTaskRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn contacts<'c>(
    conn: &'c Connection,
    tenant_id: &str,
) -> ContactService<SqliteContactRepository<'c>> {
    ContactService::new(SqliteContactRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn titles(list: &[crm_core::Task]) -> Vec<&str> {
    list.iter().map(|task| task.title.as_str()).collect()
}

#[test]
fn add_task_defaults_to_open_medium_priority() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let service = tasks(&conn, "t1");

    let task = service
        .add_task(&NewTask {
            contact_id: Some(contact.id),
            due_at: Some(10_000),
            ..NewTask::titled("  Send proposal ")
        })
        .unwrap();

    assert_eq!(task.title, "Send proposal");
    assert_eq!(task.priority, TaskPriority::Medium);
    assert!(!task.completed);
    assert_eq!(task.completed_at, None);
    assert_eq!(task.contact_name.as_deref(), Some("Ada"));
    assert_eq!(service.get_task(task.id).unwrap(), task);
}

#[test]
fn add_task_requires_title_and_known_contact() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn, "t1");

    let err = service.add_task(&NewTask::titled(" ")).unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("title")));

    let err = service
        .add_task(&NewTask {
            contact_id: Some(Uuid::new_v4()),
            ..NewTask::titled("Call back")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "contact", .. }));
    assert!(service
        .list_tasks(&TaskListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn complete_and_uncomplete_keep_flag_and_timestamp_paired() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn, "t1");
    let task = service.add_task(&NewTask::titled("Follow up")).unwrap();

    let done = service.complete_task(task.id).unwrap();
    assert!(done.completed);
    assert!(done.completed_at.is_some());

    let reopened = service.uncomplete_task(task.id).unwrap();
    assert!(!reopened.completed);
    assert_eq!(reopened.completed_at, None);

    assert!(matches!(
        service.complete_task(Uuid::new_v4()),
        Err(ServiceError::NotFound { entity: "task", .. })
    ));
}

#[test]
fn list_orders_open_first_then_due_date_with_undated_last() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn, "t1");
    let undated = service.add_task(&NewTask::titled("undated")).unwrap();
    service
        .add_task(&NewTask {
            due_at: Some(3_000),
            ..NewTask::titled("late")
        })
        .unwrap();
    service
        .add_task(&NewTask {
            due_at: Some(1_000),
            ..NewTask::titled("early")
        })
        .unwrap();
    let finished = service
        .add_task(&NewTask {
            due_at: Some(500),
            ..NewTask::titled("finished")
        })
        .unwrap();
    service.complete_task(finished.id).unwrap();

    let all = service.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(titles(&all), vec!["early", "late", "undated", "finished"]);

    let open = service
        .list_tasks(&TaskListQuery {
            completed: Some(false),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&open), vec!["early", "late", "undated"]);
    assert_eq!(open[2].id, undated.id);
}

#[test]
fn list_filters_by_contact_assignee_and_priority() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let service = tasks(&conn, "t1");
    service
        .add_task(&NewTask {
            contact_id: Some(contact.id),
            priority: Some(TaskPriority::High),
            ..NewTask::titled("urgent")
        })
        .unwrap();
    service
        .add_task(&NewTask {
            assigned_to: Some("sam".to_string()),
            priority: Some(TaskPriority::Low),
            ..NewTask::titled("someday")
        })
        .unwrap();

    let by_contact = service
        .list_tasks(&TaskListQuery {
            contact_id: Some(contact.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&by_contact), vec!["urgent"]);

    let by_assignee = service
        .list_tasks(&TaskListQuery {
            assigned_to: Some("sam".to_string()),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&by_assignee), vec!["someday"]);

    let high = service
        .list_tasks(&TaskListQuery {
            priority: Some(TaskPriority::High),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(titles(&high), vec!["urgent"]);
}

#[test]
fn overdue_lists_only_open_tasks_past_due() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn, "t1");
    let now = now_epoch_ms();
    service
        .add_task(&NewTask {
            due_at: Some(now - 60_000),
            ..NewTask::titled("overdue")
        })
        .unwrap();
    service
        .add_task(&NewTask {
            due_at: Some(now + 3_600_000),
            ..NewTask::titled("upcoming")
        })
        .unwrap();
    service.add_task(&NewTask::titled("undated")).unwrap();
    let closed = service
        .add_task(&NewTask {
            due_at: Some(now - 120_000),
            ..NewTask::titled("closed")
        })
        .unwrap();
    service.complete_task(closed.id).unwrap();

    let overdue = service.overdue_tasks(None).unwrap();
    assert_eq!(titles(&overdue), vec!["overdue"]);
    assert!(overdue[0].is_overdue(now));
}

#[test]
fn update_task_patches_and_clears_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = tasks(&conn, "t1");
    let task = service
        .add_task(&NewTask {
            description: Some("draft".to_string()),
            due_at: Some(1_000),
            ..NewTask::titled("Prepare")
        })
        .unwrap();
    conn.execute(
        "UPDATE tasks SET updated_at = ?1 WHERE id = ?2;",
        params![1_i64, task.id.to_string()],
    )
    .unwrap();

    let patch: TaskPatch =
        serde_json::from_str(r#"{"due_at": null, "priority": "high", "title": "Prepare deck"}"#)
            .unwrap();
    let updated = service.update_task(task.id, &patch).unwrap();

    assert_eq!(updated.title, "Prepare deck");
    assert_eq!(updated.due_at, None);
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.description.as_deref(), Some("draft"));
    assert!(updated.updated_at > 1);

    let err = service
        .update_task(
            task.id,
            &TaskPatch {
                title: Some("".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("title")));
}

#[test]
fn tasks_are_isolated_between_tenants() {
    let conn = open_db_in_memory().unwrap();
    let task = tasks(&conn, "t1")
        .add_task(&NewTask::titled("Private"))
        .unwrap();
    let other = tasks(&conn, "t2");

    assert!(other.list_tasks(&TaskListQuery::default()).unwrap().is_empty());
    assert!(matches!(
        other.complete_task(task.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        other.delete_task(task.id),
        Err(ServiceError::NotFound { .. })
    ));
    tasks(&conn, "t1").delete_task(task.id).unwrap();
}
