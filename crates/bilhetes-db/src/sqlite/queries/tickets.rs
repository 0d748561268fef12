use std::ops::Range;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use bilhetes_core::ticket::{CreateTicket, Grupo, Responsavel, Status, Ticket, Tipo, UpdateTicket};

use super::super::{not_found_or_internal, SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_ticket(row: &Row) -> rusqlite::Result<Ticket> {
    let responsavel_str: String = row.get("responsavel")?;
    let grupo_str: Option<String> = row.get("grupo")?;
    let tipo_str: Option<String> = row.get("tipo")?;
    let status_str: String = row.get("status")?;
    Ok(Ticket {
        id: row.get("id")?,
        titulo: row.get("titulo")?,
        descricao: row.get("descricao")?,
        responsavel: Responsavel::parse_str(&responsavel_str).unwrap_or_default(),
        grupo: grupo_str.and_then(|s| Grupo::parse_str(&s)),
        tipo: tipo_str.and_then(|s| Tipo::parse_str(&s)),
        status: Status::parse_str(&status_str).unwrap_or_default(),
        criadoem: row.get("criadoem")?,
    })
}

impl SqliteDatabase {
    pub fn create_ticket_sync(&self, input: &CreateTicket) -> Result<Ticket, DbError> {
        input
            .validate()
            .map_err(|e| DbError::InvalidInput(e.to_string()))?;
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let criadoem = input.criadoem.unwrap_or_else(Utc::now);

            conn.execute(
                "INSERT INTO tickets (id, titulo, descricao, responsavel, grupo, tipo, status, criadoem)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    input.titulo.trim(),
                    input.descricao,
                    input.responsavel.as_str(),
                    input.grupo.as_str(),
                    input.tipo.as_str(),
                    input.status.as_str(),
                    criadoem,
                ],
            )
            .to_db()?;

            conn.query_row(
                "SELECT * FROM tickets WHERE id = ?1",
                params![id],
                row_to_ticket,
            )
            .to_db()
        })
    }

    pub fn get_ticket_sync(&self, id: &str) -> Result<Ticket, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM tickets WHERE id = ?1",
                params![id],
                row_to_ticket,
            )
            .map_err(not_found_or_internal(format!("ticket {id}")))
        })
    }

    pub fn list_tickets_sync(
        &self,
        created: Option<&Range<DateTime<Utc>>>,
    ) -> Result<Vec<Ticket>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM tickets");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            // julianday() compares instants, whatever offset a row was written with.
            if let Some(range) = created {
                param_values.push(Box::new(range.start));
                param_values.push(Box::new(range.end));
                sql.push_str(&format!(
                    " WHERE julianday(criadoem) >= julianday(?{})",
                    param_values.len() - 1
                ));
                sql.push_str(&format!(
                    " AND julianday(criadoem) < julianday(?{})",
                    param_values.len()
                ));
            }
            sql.push_str(" ORDER BY julianday(criadoem) DESC, rowid DESC");

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql).to_db()?;
            let tickets = stmt
                .query_map(params_ref.as_slice(), row_to_ticket)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(tickets)
        })
    }

    pub fn update_ticket_sync(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, DbError> {
        if update.is_empty() {
            return self.get_ticket_sync(id);
        }
        self.with_conn(|conn| {
            let mut sets = Vec::new();
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(status) = update.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sets.push(format!("status = ?{}", param_values.len()));
            }
            if let Some(ref descricao) = update.descricao {
                param_values.push(Box::new(descricao.clone()));
                sets.push(format!("descricao = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let sql = format!(
                "UPDATE tickets SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );
            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let changed = conn.execute(&sql, params_ref.as_slice()).to_db()?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("ticket {id}")));
            }

            conn.query_row(
                "SELECT * FROM tickets WHERE id = ?1",
                params![id],
                row_to_ticket,
            )
            .to_db()
        })
    }
}
