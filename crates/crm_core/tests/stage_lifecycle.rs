use crm_core::db::open_db_in_memory;
use crm_core::model::stage::DEFAULT_STAGES;
use crm_core::{
    ContactService, NewContact, NewStage, SeedStatus, ServiceError, SqliteContactRepository,
    SqliteStageRepository, StagePatch, StageService, TenantId,
};
use rusqlite::Connection;
use uuid::Uuid;

fn tenant(value: &str) -> TenantId {
    TenantId::new(value).unwrap()
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

#[test]
fn create_stage_appends_positions_and_keeps_explicit_ones() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");

    let lead = service.create_stage(&NewStage::named("Lead")).unwrap();
    let won = service.create_stage(&NewStage::named("Won")).unwrap();
    let pinned = service
        .create_stage(&NewStage {
            name: "  Parked ".to_string(),
            position: Some(10),
            color: Some("#000000".to_string()),
        })
        .unwrap();

    assert_eq!(lead.position, 1);
    assert_eq!(won.position, 2);
    assert_eq!(pinned.position, 10);
    assert_eq!(pinned.name, "Parked");
    assert_eq!(pinned.color.as_deref(), Some("#000000"));
    assert_eq!(lead.tenant_id, "t1");

    let names: Vec<String> = service
        .list_stages()
        .unwrap()
        .into_iter()
        .map(|stage| stage.name)
        .collect();
    assert_eq!(names, vec!["Lead", "Won", "Parked"]);
}

#[test]
fn create_stage_requires_name() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");

    let err = service.create_stage(&NewStage::named("   ")).unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("name")));
    assert!(service.list_stages().unwrap().is_empty());
}

#[test]
fn default_stage_seeding_is_idempotent_per_tenant() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");

    let first = service.initialize_default_stages().unwrap();
    assert_eq!(first.status, SeedStatus::Initialized);
    let seeded: Vec<(&str, i64, Option<&str>)> = first
        .stages
        .iter()
        .map(|stage| (stage.name.as_str(), stage.position, stage.color.as_deref()))
        .collect();
    let expected: Vec<(&str, i64, Option<&str>)> = DEFAULT_STAGES
        .iter()
        .enumerate()
        .map(|(index, (name, color))| (*name, index as i64 + 1, Some(*color)))
        .collect();
    assert_eq!(seeded, expected);

    let second = service.initialize_default_stages().unwrap();
    assert_eq!(second.status, SeedStatus::AlreadyInitialized);
    assert_eq!(second.stages, first.stages);

    let other_tenant = stages(&conn, "t2").initialize_default_stages().unwrap();
    assert_eq!(other_tenant.status, SeedStatus::Initialized);
}

#[test]
fn seeding_skips_tenant_with_any_existing_stage() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");
    service.create_stage(&NewStage::named("Custom")).unwrap();

    let outcome = service.initialize_default_stages().unwrap();
    assert_eq!(outcome.status, SeedStatus::AlreadyInitialized);
    assert_eq!(outcome.stages.len(), 1);
    assert_eq!(outcome.stages[0].name, "Custom");
}

#[test]
fn reorder_rewrites_positions_in_given_order() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");
    let s1 = service.create_stage(&NewStage::named("One")).unwrap();
    let s2 = service.create_stage(&NewStage::named("Two")).unwrap();
    let s3 = service.create_stage(&NewStage::named("Three")).unwrap();

    let reordered = service.reorder_stages(&[s3.id, s1.id, s2.id]).unwrap();

    let order: Vec<(Uuid, i64)> = reordered
        .iter()
        .map(|stage| (stage.id, stage.position))
        .collect();
    assert_eq!(order, vec![(s3.id, 1), (s1.id, 2), (s2.id, 3)]);
}

#[test]
fn reorder_with_unknown_id_rolls_back_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");
    let s1 = service.create_stage(&NewStage::named("One")).unwrap();
    let s2 = service.create_stage(&NewStage::named("Two")).unwrap();
    let missing = Uuid::new_v4();

    let err = service.reorder_stages(&[s2.id, missing, s1.id]).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { id, .. } if id == missing));

    let positions: Vec<i64> = service
        .list_stages()
        .unwrap()
        .iter()
        .map(|stage| stage.position)
        .collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(service.get_stage(s1.id).unwrap().position, 1);
}

#[test]
fn reorder_with_empty_list_keeps_current_order() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");
    let s1 = service.create_stage(&NewStage::named("Lead")).unwrap();
    let s2 = service.create_stage(&NewStage::named("Won")).unwrap();

    let listed = service.reorder_stages(&[]).unwrap();

    let order: Vec<(Uuid, i64)> = listed
        .iter()
        .map(|stage| (stage.id, stage.position))
        .collect();
    assert_eq!(order, vec![(s1.id, 1), (s2.id, 2)]);
}

#[test]
fn update_stage_applies_patch_and_clears_color() {
    let conn = open_db_in_memory().unwrap();
    let service = stages(&conn, "t1");
    let stage = service
        .create_stage(&NewStage {
            name: "Lead".to_string(),
            position: None,
            color: Some("#111111".to_string()),
        })
        .unwrap();

    let updated = service
        .update_stage(
            stage.id,
            &StagePatch {
                name: Some("Prospect".to_string()),
                color: Some(None),
                ..StagePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Prospect");
    assert_eq!(updated.color, None);
    assert_eq!(updated.position, stage.position);

    let err = service
        .update_stage(
            stage.id,
            &StagePatch {
                name: Some(" ".to_string()),
                ..StagePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("name")));
}

#[test]
fn deleting_stage_unstages_its_contacts() {
    let conn = open_db_in_memory().unwrap();
    let stage_service = stages(&conn, "t1");
    let contact_service = contacts(&conn, "t1");
    let lead = stage_service.create_stage(&NewStage::named("Lead")).unwrap();
    let contact = contact_service
        .create_contact(&NewContact {
            stage_id: Some(lead.id),
            ..NewContact::named("Ada")
        })
        .unwrap();
    assert_eq!(contact.stage_name.as_deref(), Some("Lead"));

    stage_service.delete_stage(lead.id).unwrap();

    let reloaded = contact_service.get_contact(contact.id).unwrap();
    assert_eq!(reloaded.stage_id, None);
    assert_eq!(reloaded.stage_name, None);
    assert!(matches!(
        stage_service.get_stage(lead.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn stages_are_invisible_across_tenants() {
    let conn = open_db_in_memory().unwrap();
    let lead = stages(&conn, "t1")
        .create_stage(&NewStage::named("Lead"))
        .unwrap();
    let other = stages(&conn, "t2");

    assert!(other.list_stages().unwrap().is_empty());
    assert!(matches!(
        other.get_stage(lead.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        other.delete_stage(lead.id),
        Err(ServiceError::NotFound { .. })
    ));
}
