use crm_core::db::open_db_in_memory;
use crm_core::repo::now_epoch_ms;
use crm_core::{
    ContactService, InteractionService, NewContact, NewStage, NewTask, SqliteContactRepository,
    SqliteInteractionRepository, SqliteStageRepository, SqliteStatsRepository,
    SqliteTaskRepository, StageService, StatsService, TaskService, TenantId,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

const DAY_MS: i64 = 86_400_000;

fn tenant(value: &str) -> TenantId {
    TenantId::new(value).unwrap()
}

fn stats<'c>(conn: &'c Connection, tenant_id: &str) -> StatsService<SqliteStatsRepository<'c>> {
    StatsService::new(SqliteStatsRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn stages<'c>(conn: &'c Connection, tenant_id: &str) -> StageService<SqliteStageRepository<'c>> {
    StageService::new(SqliteStageRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn contacts<'c>(
    conn: &'c Connection,
    tenant_id: &str,
) -> ContactService<SqliteContactRepository<'c>> {
    ContactService::new(SqliteContactRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn add_contact(
    service: &ContactService<SqliteContactRepository<'_>>,
    name: &str,
    stage_id: Option<Uuid>,
    deal_value: Option<f64>,
) -> Uuid {
    service
        .create_contact(&NewContact {
            stage_id,
            deal_value,
            ..NewContact::named(name)
        })
        .unwrap()
        .id
}

fn set_created_at(conn: &Connection, table: &str, id: Uuid, epoch_ms: i64) {
    conn.execute(
        &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2;"),
        params![epoch_ms, id.to_string()],
    )
    .unwrap();
}

#[test]
fn pipeline_stats_rolls_up_active_contacts_per_stage() {
    let conn = open_db_in_memory().unwrap();
    let stage_service = stages(&conn, "t1");
    let lead = stage_service.create_stage(&NewStage::named("Lead")).unwrap();
    let won = stage_service.create_stage(&NewStage::named("Won")).unwrap();
    let contact_service = contacts(&conn, "t1");
    add_contact(&contact_service, "A", Some(lead.id), Some(100.0));
    add_contact(&contact_service, "B", Some(won.id), Some(50.0));
    add_contact(&contact_service, "C", None, Some(25.0));
    let d = add_contact(&contact_service, "D", Some(lead.id), Some(1000.0));
    contact_service.mark_lost(d, None).unwrap();
    add_contact(&contacts(&conn, "t2"), "Other tenant", None, Some(999.0));

    let report = stats(&conn, "t1").pipeline_stats().unwrap();

    let buckets: Vec<(&str, i64, u64, f64)> = report
        .stages
        .iter()
        .map(|bucket| (bucket.name.as_str(), bucket.position, bucket.count, bucket.value))
        .collect();
    assert_eq!(
        buckets,
        vec![
            ("Unstaged", 0, 1, 25.0),
            ("Lead", 1, 1, 100.0),
            ("Won", 2, 1, 50.0),
        ]
    );
    assert_eq!(report.stages[0].stage_id, None);
    assert_eq!(report.stages[1].stage_id, Some(lead.id));
    assert_eq!(report.total_contacts, 3);
    assert_eq!(report.total_value, 175.0);
}

#[test]
fn pipeline_stats_counts_null_deal_value_as_zero_and_keeps_empty_stages() {
    let conn = open_db_in_memory().unwrap();
    let stage_service = stages(&conn, "t1");
    let lead = stage_service.create_stage(&NewStage::named("Lead")).unwrap();
    stage_service.create_stage(&NewStage::named("Won")).unwrap();
    let contact_service = contacts(&conn, "t1");
    add_contact(&contact_service, "A", Some(lead.id), None);
    add_contact(&contact_service, "B", Some(lead.id), Some(10.0));

    let report = stats(&conn, "t1").pipeline_stats().unwrap();

    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.stages[0].count, 2);
    assert_eq!(report.stages[0].value, 10.0);
    assert_eq!(report.stages[1].count, 0);
    assert_eq!(report.stages[1].value, 0.0);
    let count_sum: u64 = report.stages.iter().map(|bucket| bucket.count).sum();
    let value_sum: f64 = report.stages.iter().map(|bucket| bucket.value).sum();
    assert_eq!(count_sum, report.total_contacts);
    assert_eq!(value_sum, report.total_value);
}

#[test]
fn pipeline_stats_for_empty_tenant_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let report = stats(&conn, "t1").pipeline_stats().unwrap();
    assert!(report.stages.is_empty());
    assert_eq!(report.total_contacts, 0);
    assert_eq!(report.total_value, 0.0);
}

#[test]
fn activity_stats_counts_records_created_in_window() {
    let conn = open_db_in_memory().unwrap();
    let contact_service = contacts(&conn, "t1");
    let interaction_service = InteractionService::new(
        SqliteInteractionRepository::try_new(&conn, tenant("t1")).unwrap(),
    );
    let task_service =
        TaskService::new(SqliteTaskRepository::try_new(&conn, tenant("t1")).unwrap());
    let now = now_epoch_ms();

    let fresh = add_contact(&contact_service, "Fresh", None, None);
    let lost = add_contact(&contact_service, "Lost", None, None);
    contact_service.mark_lost(lost, None).unwrap();
    let stale = add_contact(&contact_service, "Stale", None, None);
    set_created_at(&conn, "contacts", stale, now - 40 * DAY_MS);

    interaction_service.add_note(fresh, "hi", "sam").unwrap();
    interaction_service.log_call(fresh, "call", "sam", None).unwrap();
    interaction_service.log_call(lost, "call", "sam", None).unwrap();
    let old_note = interaction_service.add_note(stale, "old", "sam").unwrap();
    set_created_at(&conn, "interactions", old_note.id, now - 40 * DAY_MS);

    task_service.add_task(&NewTask::titled("open")).unwrap();
    let done = task_service.add_task(&NewTask::titled("done")).unwrap();
    task_service.complete_task(done.id).unwrap();
    let old_done = task_service.add_task(&NewTask::titled("old done")).unwrap();
    task_service.complete_task(old_done.id).unwrap();
    set_created_at(&conn, "tasks", old_done.id, now - 40 * DAY_MS);

    let report = stats(&conn, "t1").activity_stats(30).unwrap();

    assert_eq!(report.days, 30);
    assert!(report.since <= now - 30 * DAY_MS);
    assert_eq!(report.interactions_total, 3);
    assert_eq!(report.interactions_by_type.get("call"), Some(&2));
    assert_eq!(report.interactions_by_type.get("note"), Some(&1));
    assert_eq!(report.tasks_created, 2);
    assert_eq!(report.tasks_created_completed, 1);
    assert_eq!(report.tasks_completed_in_window, 2);
    assert_eq!(report.contacts_created, 2);
    assert_eq!(report.contacts_created_active, 1);

    let wide = stats(&conn, "t1").activity_stats(60).unwrap();
    assert_eq!(wide.interactions_total, 4);
    assert_eq!(wide.contacts_created, 3);
    assert_eq!(wide.tasks_created_completed, 2);

    let other = stats(&conn, "t2").activity_stats(30).unwrap();
    assert_eq!(other.interactions_total, 0);
    assert_eq!(other.contacts_created, 0);
}
