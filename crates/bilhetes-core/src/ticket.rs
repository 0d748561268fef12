use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Aberto,
    EmAndamento,
    Fechado,
}

impl Status {
    /// Board column order.
    pub const ALL: &[Status] = &[Status::Aberto, Status::EmAndamento, Status::Fechado];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Aberto => "aberto",
            Status::EmAndamento => "em_andamento",
            Status::Fechado => "fechado",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Status::Aberto => "Aberto",
            Status::EmAndamento => "Em andamento",
            Status::Fechado => "Fechado",
        }
    }

    /// Accepts the canonical form and the spaced form older records used.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "aberto" => Some(Status::Aberto),
            "em_andamento" | "em andamento" => Some(Status::EmAndamento),
            "fechado" => Some(Status::Fechado),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Routing category of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Grupo {
    #[default]
    #[serde(rename = "software")]
    Software,
    #[serde(rename = "hardware")]
    Hardware,
    #[serde(rename = "ajuda/duvida")]
    AjudaDuvida,
    #[serde(rename = "suprimentos")]
    Suprimentos,
    #[serde(rename = "busca de imagens")]
    BuscaDeImagens,
    #[serde(rename = "redes")]
    Redes,
}

impl Grupo {
    pub const ALL: &[Grupo] = &[
        Grupo::Software,
        Grupo::Hardware,
        Grupo::AjudaDuvida,
        Grupo::Suprimentos,
        Grupo::BuscaDeImagens,
        Grupo::Redes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grupo::Software => "software",
            Grupo::Hardware => "hardware",
            Grupo::AjudaDuvida => "ajuda/duvida",
            Grupo::Suprimentos => "suprimentos",
            Grupo::BuscaDeImagens => "busca de imagens",
            Grupo::Redes => "redes",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Grupo::Software => "Software",
            Grupo::Hardware => "Hardware",
            Grupo::AjudaDuvida => "Ajuda/Dúvida",
            Grupo::Suprimentos => "Suprimentos",
            Grupo::BuscaDeImagens => "Busca de Imagens",
            Grupo::Redes => "Redes",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Grupo::ALL.iter().copied().find(|g| g.as_str() == s)
    }

    /// Position in `ALL`, used to index per-group tables.
    pub fn index(&self) -> usize {
        Grupo::ALL.iter().position(|g| g == self).unwrap_or(0)
    }
}

impl fmt::Display for Grupo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Kind of work a ticket asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tipo {
    #[default]
    #[serde(rename = "preventiva")]
    Preventiva,
    #[serde(rename = "corretiva")]
    Corretiva,
    #[serde(rename = "configuração")]
    Configuracao,
    #[serde(rename = "suporte usuario")]
    SuporteUsuario,
    #[serde(rename = "suprimento")]
    Suprimento,
    #[serde(rename = "CFTV")]
    Cftv,
}

impl Tipo {
    pub const ALL: &[Tipo] = &[
        Tipo::Preventiva,
        Tipo::Corretiva,
        Tipo::Configuracao,
        Tipo::SuporteUsuario,
        Tipo::Suprimento,
        Tipo::Cftv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tipo::Preventiva => "preventiva",
            Tipo::Corretiva => "corretiva",
            Tipo::Configuracao => "configuração",
            Tipo::SuporteUsuario => "suporte usuario",
            Tipo::Suprimento => "suprimento",
            Tipo::Cftv => "CFTV",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tipo::Preventiva => "Preventiva",
            Tipo::Corretiva => "Corretiva",
            Tipo::Configuracao => "Configuração",
            Tipo::SuporteUsuario => "Suporte usuário",
            Tipo::Suprimento => "Suprimento",
            Tipo::Cftv => "CFTV",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Tipo::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    pub fn index(&self) -> usize {
        Tipo::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

impl fmt::Display for Tipo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Responsavel {
    #[default]
    Erik,
    Wesley,
    Wilson,
}

impl Responsavel {
    pub const ALL: &[Responsavel] = &[Responsavel::Erik, Responsavel::Wesley, Responsavel::Wilson];

    pub fn as_str(&self) -> &'static str {
        match self {
            Responsavel::Erik => "Erik",
            Responsavel::Wesley => "Wesley",
            Responsavel::Wilson => "Wilson",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Responsavel::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Responsavel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub titulo: String,
    pub descricao: String,
    pub responsavel: Responsavel,
    pub grupo: Option<Grupo>,
    pub tipo: Option<Tipo>,
    pub status: Status,
    pub criadoem: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTicket {
    pub titulo: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub responsavel: Responsavel,
    #[serde(default)]
    pub grupo: Grupo,
    #[serde(default)]
    pub tipo: Tipo,
    #[serde(default)]
    pub status: Status,
    /// Creation time for back-filled records. The store assigns "now" when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criadoem: Option<DateTime<Utc>>,
}

impl CreateTicket {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.titulo.trim().is_empty() {
            return Err(CoreError::InvalidInput("titulo must not be empty".into()));
        }
        Ok(())
    }
}

/// The only fields that change after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTicket {
    pub status: Option<Status>,
    pub descricao: Option<String>,
}

impl UpdateTicket {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.descricao.is_none()
    }
}
