use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Ticket, UpdateTicket};
use bilhetes_core::Zone;
use bilhetes_db::{Database, DbError};
use bilhetes_report::{export, ExportFormat, Report};
use bilhetes_store::{sanitize_filename, ticket_image_key, ObjectStore, StoreError};
use bytes::Bytes;
use chrono::Utc;

use crate::traits::group_images;
use crate::{ServiceError, TicketQuery, TicketService};

/// Gateway backed by a database handle and an object store in-process.
pub struct LocalService {
    db: Arc<dyn Database>,
    store: Arc<dyn ObjectStore>,
}

impl LocalService {
    pub fn new(db: Arc<dyn Database>, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    fn with_url(&self, mut image: TicketImage) -> TicketImage {
        image.url = self.store.public_url(&image.store_key);
        image
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            DbError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[async_trait]
impl TicketService for LocalService {
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, ServiceError> {
        let created = query.year.map(|y| query.zone.year_range(y));
        let tickets = self.db.list_tickets(created).await?;
        if query.filter.is_empty() {
            return Ok(tickets);
        }
        Ok(tickets
            .into_iter()
            .filter(|t| query.filter.matches_in(t, query.zone))
            .collect())
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, ServiceError> {
        Ok(self.db.get_ticket(id).await?)
    }

    async fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, ServiceError> {
        input.validate()?;
        let ticket = self.db.create_ticket(input).await?;
        tracing::info!(id = %ticket.id, titulo = %ticket.titulo, "ticket created");
        Ok(ticket)
    }

    async fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, ServiceError> {
        let ticket = self.db.update_ticket(id, update).await?;
        tracing::info!(
            id = %ticket.id,
            status = ticket.status.as_str(),
            descricao_changed = update.descricao.is_some(),
            "ticket updated"
        );
        Ok(ticket)
    }

    async fn list_images(&self) -> Result<HashMap<String, Vec<TicketImage>>, ServiceError> {
        let images = self.db.list_images().await?;
        Ok(group_images(
            images.into_iter().map(|i| self.with_url(i)).collect(),
        ))
    }

    async fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, ServiceError> {
        let images = self.db.list_ticket_images(ticket_id).await?;
        Ok(images.into_iter().map(|i| self.with_url(i)).collect())
    }

    async fn upload_image(
        &self,
        ticket_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<TicketImage, ServiceError> {
        let bad_name = || ServiceError::InvalidInput(format!("bad file name {filename:?}"));
        let name = sanitize_filename(filename).ok_or_else(bad_name)?;
        let key = ticket_image_key(ticket_id, Utc::now().timestamp_millis(), name)
            .ok_or_else(bad_name)?;
        // Fail before writing any bytes when the ticket is gone.
        self.db.get_ticket(ticket_id).await?;

        let size = data.len() as i64;
        self.store.put(&key, Bytes::from(data)).await?;

        match self.db.create_ticket_image(ticket_id, name, &key, size).await {
            Ok(image) => {
                tracing::info!(ticket_id, key = %key, size, "image uploaded");
                Ok(self.with_url(image))
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&key).await {
                    tracing::warn!(key = %key, error = %cleanup, "orphaned image object");
                }
                Err(e.into())
            }
        }
    }

    async fn report(&self, year: Option<i32>, zone: Zone) -> Result<Report, ServiceError> {
        // Unrestricted fetch so the year list covers every ticket.
        let tickets = self.db.list_tickets(None).await?;
        Ok(Report::build(&tickets, year, zone))
    }

    async fn export(
        &self,
        format: ExportFormat,
        query: &TicketQuery,
    ) -> Result<Vec<u8>, ServiceError> {
        let tickets = self.list_tickets(query).await?;
        let data = export::export(format, &tickets)?;
        tracing::info!(format = format.extension(), rows = tickets.len(), "export built");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilhetes_core::ticket::{Grupo, Responsavel, Status, Tipo};
    use bilhetes_db::SqliteDatabase;
    use bilhetes_store::{LocalStore, StoreConfig};
    use chrono::TimeZone;

    fn service(dir: &std::path::Path) -> LocalService {
        let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let store = Arc::new(LocalStore::new(&StoreConfig {
            local_data_dir: Some(dir.to_string_lossy().to_string()),
            public_base_url: Some("http://bilhetes.local".into()),
            ..Default::default()
        }));
        LocalService::new(db, store)
    }

    fn printer_jam() -> CreateTicket {
        CreateTicket {
            titulo: "Printer jam".into(),
            responsavel: Responsavel::Erik,
            grupo: Grupo::Hardware,
            tipo: Tipo::Corretiva,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let err = svc
            .create_ticket(&CreateTicket::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn list_applies_filter_after_year() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        svc.create_ticket(&printer_jam()).await.unwrap();
        svc.create_ticket(&CreateTicket {
            titulo: "VPN down".into(),
            grupo: Grupo::Redes,
            ..Default::default()
        })
        .await
        .unwrap();

        let mut query = TicketQuery::default();
        query.filter.grupo = Some(Grupo::Redes);
        let found = svc.list_tickets(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].titulo, "VPN down");
    }

    #[tokio::test]
    async fn upload_stores_bytes_and_records_relation() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let ticket = svc.create_ticket(&printer_jam()).await.unwrap();

        let image = svc
            .upload_image(&ticket.id, "C:\\fotos\\bandeja.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(image.filename, "bandeja.png");
        assert_eq!(image.size_bytes, 3);
        assert!(image.store_key.starts_with(&format!("tickets/{}/", ticket.id)));
        assert!(image.store_key.ends_with("-bandeja.png"));
        assert_eq!(
            image.url,
            format!("http://bilhetes.local/files/{}", image.store_key)
        );

        let stored = svc.store().get(&image.store_key).await.unwrap();
        assert_eq!(stored.as_ref(), &[1, 2, 3]);

        let grouped = svc.list_images().await.unwrap();
        assert_eq!(grouped[&ticket.id].len(), 1);
        assert_eq!(grouped[&ticket.id][0].url, image.url);
    }

    #[tokio::test]
    async fn upload_to_missing_ticket_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let err = svc
            .upload_image("nope", "a.png", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(svc.store().list("tickets").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_empty_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let ticket = svc.create_ticket(&printer_jam()).await.unwrap();
        let err = svc.upload_image(&ticket.id, "", vec![1]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn report_lists_all_years_but_counts_one() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        for (year, grupo) in [(2023, Grupo::Software), (2024, Grupo::Hardware)] {
            svc.create_ticket(&CreateTicket {
                criadoem: Some(Utc.with_ymd_and_hms(year, 3, 1, 12, 0, 0).unwrap()),
                grupo,
                ..printer_jam()
            })
            .await
            .unwrap();
        }

        let report = svc.report(Some(2024), Zone::utc()).await.unwrap();
        assert_eq!(report.anos, vec![2023, 2024]);
        assert_eq!(report.total, 1);
        let sw = report
            .por_grupo
            .iter()
            .find(|c| c.value == Grupo::Software)
            .unwrap();
        assert_eq!(sw.count, 0);
    }

    #[tokio::test]
    async fn year_and_report_use_the_query_zone() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        // 22:00 on 31 December 2023 at -03:00
        svc.create_ticket(&CreateTicket {
            criadoem: Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()),
            ..printer_jam()
        })
        .await
        .unwrap();
        let brt = Zone::parse_str("-03:00").unwrap();

        let listed = svc
            .list_tickets(&TicketQuery::year(Some(2023)).in_zone(brt))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        let listed = svc
            .list_tickets(&TicketQuery::year(Some(2023)).in_zone(Zone::utc()))
            .await
            .unwrap();
        assert!(listed.is_empty());

        let report = svc.report(Some(2023), brt).await.unwrap();
        assert_eq!(report.anos, vec![2023]);
        assert_eq!(report.total, 1);
        assert_eq!(svc.report(Some(2024), Zone::utc()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn export_respects_query() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let t = svc.create_ticket(&printer_jam()).await.unwrap();
        svc.update_ticket(
            &t.id,
            &UpdateTicket {
                status: Some(Status::Fechado),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        svc.create_ticket(&CreateTicket {
            titulo: "Outro".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let mut query = TicketQuery::default();
        query.filter.status = Some(Status::Fechado);
        let csv = svc.export(ExportFormat::Csv, &query).await.unwrap();
        let rows = export::from_csv(&csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "fechado");
    }
}
