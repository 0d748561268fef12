// Backend-agnostic integration tests for the Database trait.
//
// Each public async function accepts `&dyn Database` so the same assertions
// can run against any backend.

use bilhetes_core::ticket::{CreateTicket, Grupo, Responsavel, Status, Tipo, UpdateTicket};
use bilhetes_core::Zone;
use bilhetes_db::{Database, DbError};
use chrono::{TimeZone, Utc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_ticket(titulo: &str) -> CreateTicket {
    CreateTicket {
        titulo: titulo.to_string(),
        descricao: String::new(),
        responsavel: Responsavel::Erik,
        grupo: Grupo::Hardware,
        tipo: Tipo::Corretiva,
        status: Status::Aberto,
        criadoem: None,
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

pub async fn test_ticket_crud(db: &dyn Database) {
    let created = db
        .create_ticket(&CreateTicket {
            descricao: "Tray 2".into(),
            ..make_ticket("Printer jam")
        })
        .await
        .unwrap();
    assert_eq!(created.titulo, "Printer jam");
    assert_eq!(created.grupo, Some(Grupo::Hardware));
    assert_eq!(created.responsavel, Responsavel::Erik);

    let fetched = db.get_ticket(&created.id).await.unwrap();
    assert_eq!(fetched, created);

    let closed = db
        .update_ticket(
            &created.id,
            &UpdateTicket {
                status: Some(Status::Fechado),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(closed.status, Status::Fechado);
    // Everything else is untouched.
    assert_eq!(closed.descricao, "Tray 2");
    assert_eq!(closed.titulo, created.titulo);
    assert_eq!(closed.criadoem, created.criadoem);

    let edited = db
        .update_ticket(
            &created.id,
            &UpdateTicket {
                descricao: Some("Replaced roller".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.descricao, "Replaced roller");
    assert_eq!(edited.status, Status::Fechado);
}

pub async fn test_missing_ticket(db: &dyn Database) {
    assert!(matches!(
        db.get_ticket("nope").await,
        Err(DbError::NotFound(_))
    ));
    let update = UpdateTicket {
        status: Some(Status::Fechado),
        ..Default::default()
    };
    assert!(matches!(
        db.update_ticket("nope", &update).await,
        Err(DbError::NotFound(_))
    ));
}

pub async fn test_list_order_and_year(db: &dyn Database) {
    let dates = [
        ("a", Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap()),
        ("b", Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()),
        ("c", Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap()),
        // 22:00 on 31 December 2023 at -03:00
        ("d", Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()),
    ];
    for (titulo, at) in dates {
        db.create_ticket(&CreateTicket {
            criadoem: Some(at),
            ..make_ticket(titulo)
        })
        .await
        .unwrap();
    }

    let all = db.list_tickets(None).await.unwrap();
    let titles: Vec<&str> = all.iter().map(|t| t.titulo.as_str()).collect();
    assert_eq!(titles, vec!["c", "b", "d", "a"]);

    let utc = Zone::utc();
    let y2024 = db.list_tickets(Some(utc.year_range(2024))).await.unwrap();
    let titles: Vec<&str> = y2024.iter().map(|t| t.titulo.as_str()).collect();
    assert_eq!(titles, vec!["c", "b", "d"]);

    let brt = Zone::parse_str("-03:00").unwrap();
    let y2023 = db.list_tickets(Some(brt.year_range(2023))).await.unwrap();
    let titles: Vec<&str> = y2023.iter().map(|t| t.titulo.as_str()).collect();
    assert_eq!(titles, vec!["d", "a"]);

    assert!(db
        .list_tickets(Some(utc.year_range(2020)))
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub async fn test_images(db: &dyn Database) {
    let first = db.create_ticket(&make_ticket("first")).await.unwrap();
    let second = db.create_ticket(&make_ticket("second")).await.unwrap();

    let img = db
        .create_ticket_image(&first.id, "foto.png", "tickets/x/1-foto.png", 42)
        .await
        .unwrap();
    assert_eq!(img.ticket_id, first.id);
    assert_eq!(img.size_bytes, 42);
    db.create_ticket_image(&first.id, "b.jpg", "tickets/x/2-b.jpg", 7)
        .await
        .unwrap();
    db.create_ticket_image(&second.id, "c.jpg", "tickets/y/3-c.jpg", 1)
        .await
        .unwrap();

    let mine = db.list_ticket_images(&first.id).await.unwrap();
    let names: Vec<&str> = mine.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec!["foto.png", "b.jpg"]);

    assert_eq!(db.list_images().await.unwrap().len(), 3);
    assert!(db.list_ticket_images("nope").await.unwrap().is_empty());
}

pub async fn test_image_for_missing_ticket(db: &dyn Database) {
    let result = db
        .create_ticket_image("nope", "a.png", "tickets/nope/1-a.png", 1)
        .await;
    assert!(matches!(result, Err(DbError::NotFound(_))));
}
