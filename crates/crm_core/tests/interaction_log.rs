use crm_core::db::open_db_in_memory;
use crm_core::{
    ContactService, InteractionListQuery, InteractionService, NewContact, NewInteraction,
    ServiceError, SqliteContactRepository, SqliteInteractionRepository, TenantId,
};
use rusqlite::{params, Connection};
use serde_json::json;
use uuid::Uuid;

fn tenant(value: &str) -> TenantId {
    TenantId::new(value).unwrap()
}

fn contacts<'c>(
    conn: &'c Connection,
    tenant_id: &str,
) -> ContactService<SqliteContactRepository<'c>> {
    ContactService::new(SqliteContactRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn interactions<'c>(
    conn: &'c Connection,
    tenant_id: &str,
) -> InteractionService<SqliteInteractionRepository<'c>> {
    InteractionService::new(SqliteInteractionRepository::try_new(conn, tenant(tenant_id)).unwrap())
}

fn interaction_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM interactions;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn add_interaction_touches_contact_last_contact_at() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    assert_eq!(contact.last_contact_at, None);
    let service = interactions(&conn, "t1");

    let mut metadata = serde_json::Map::new();
    metadata.insert("channel".to_string(), json!("zoom"));
    let interaction = service
        .add_interaction(&NewInteraction {
            contact_id: Some(contact.id),
            kind: Some("meeting".to_string()),
            subject: Some("Kickoff".to_string()),
            created_by: Some("sam".to_string()),
            scheduled_at: Some(5_000),
            metadata,
            ..NewInteraction::default()
        })
        .unwrap();

    assert_eq!(interaction.kind, "meeting");
    assert_eq!(interaction.contact_name.as_deref(), Some("Ada"));
    assert_eq!(interaction.created_by_type, "agent");
    assert_eq!(interaction.scheduled_at, Some(5_000));
    assert_eq!(interaction.metadata.get("channel"), Some(&json!("zoom")));
    assert_eq!(interaction.tenant_id, "t1");

    let touched = contacts(&conn, "t1").get_contact(contact.id).unwrap();
    assert_eq!(touched.last_contact_at, Some(interaction.created_at));
    assert_eq!(
        service.get_interaction(interaction.id).unwrap(),
        interaction
    );
}

#[test]
fn missing_required_fields_fail_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let service = interactions(&conn, "t1");

    let err = service
        .add_interaction(&NewInteraction {
            contact_id: Some(contact.id),
            kind: Some("call".to_string()),
            ..NewInteraction::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("created_by")));

    let err = service
        .add_interaction(&NewInteraction {
            contact_id: Some(contact.id),
            created_by: Some("sam".to_string()),
            ..NewInteraction::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingField("type")));

    assert_eq!(interaction_count(&conn), 0);
    assert_eq!(
        contacts(&conn, "t1")
            .get_contact(contact.id)
            .unwrap()
            .last_contact_at,
        None
    );
}

#[test]
fn interaction_for_unknown_or_foreign_contact_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let foreign = contacts(&conn, "t2")
        .create_contact(&NewContact::named("Grace"))
        .unwrap();
    let service = interactions(&conn, "t1");

    for contact_id in [Uuid::new_v4(), foreign.id] {
        let err = service.add_note(contact_id, "hello", "sam").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "contact", .. }));
    }
    assert_eq!(interaction_count(&conn), 0);
}

#[test]
fn logging_shorthands_set_type_and_fields() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let service = interactions(&conn, "t1");

    let note = service.add_note(contact.id, "Prefers email", "sam").unwrap();
    assert_eq!(note.kind, "note");
    assert_eq!(note.content.as_deref(), Some("Prefers email"));

    let call = service
        .log_call(contact.id, "Discussed pricing", "sam", Some(25))
        .unwrap();
    assert_eq!(call.kind, "call");
    assert_eq!(call.metadata.get("duration_minutes"), Some(&json!(25)));

    let short_call = service
        .log_call(contact.id, "Voicemail", "sam", None)
        .unwrap();
    assert!(short_call.metadata.is_empty());

    let email = service
        .log_email(contact.id, "Proposal", Some("Attached."), "sam")
        .unwrap();
    assert_eq!(email.kind, "email");
    assert_eq!(email.subject.as_deref(), Some("Proposal"));
    assert_eq!(email.content.as_deref(), Some("Attached."));

    let wire = serde_json::to_value(&email).unwrap();
    assert_eq!(wire["type"], json!("email"));
}

#[test]
fn list_interactions_filters_and_orders_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let contact_service = contacts(&conn, "t1");
    let ada = contact_service
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let grace = contact_service
        .create_contact(&NewContact::named("Grace"))
        .unwrap();
    let service = interactions(&conn, "t1");
    let first = service.add_note(ada.id, "first", "sam").unwrap();
    let second = service.log_call(ada.id, "second", "sam", None).unwrap();
    service.add_note(grace.id, "other", "sam").unwrap();
    conn.execute(
        "UPDATE interactions SET created_at = ?1 WHERE id = ?2;",
        params![1_000_i64, first.id.to_string()],
    )
    .unwrap();

    let for_ada: Vec<Uuid> = service
        .list_interactions(&InteractionListQuery {
            contact_id: Some(ada.id),
            ..InteractionListQuery::default()
        })
        .unwrap()
        .iter()
        .map(|interaction| interaction.id)
        .collect();
    assert_eq!(for_ada, vec![second.id, first.id]);

    let calls = service
        .list_interactions(&InteractionListQuery {
            kind: Some("call".to_string()),
            ..InteractionListQuery::default()
        })
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, second.id);

    assert!(interactions(&conn, "t2")
        .list_interactions(&InteractionListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn delete_interaction_removes_row() {
    let conn = open_db_in_memory().unwrap();
    let contact = contacts(&conn, "t1")
        .create_contact(&NewContact::named("Ada"))
        .unwrap();
    let service = interactions(&conn, "t1");
    let note = service.add_note(contact.id, "temp", "sam").unwrap();

    assert!(matches!(
        interactions(&conn, "t2").delete_interaction(note.id),
        Err(ServiceError::NotFound { .. })
    ));
    service.delete_interaction(note.id).unwrap();
    assert_eq!(interaction_count(&conn), 0);
}
