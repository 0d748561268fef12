use std::collections::BTreeSet;

use bilhetes_core::ticket::{Grupo, Ticket, Tipo};
use bilhetes_core::Zone;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount<T> {
    pub value: T,
    pub count: usize,
    /// Share of the report total, rounded to one decimal. Zero when the total is zero.
    pub percentage: f64,
}

/// Tickets per calendar month, January first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries<T> {
    pub value: T,
    pub months: [usize; 12],
}

impl<T> MonthlySeries<T> {
    pub fn total(&self) -> usize {
        self.months.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Year the report is restricted to; `None` covers every ticket.
    pub year: Option<i32>,
    pub total: usize,
    pub por_grupo: Vec<CategoryCount<Grupo>>,
    pub por_tipo: Vec<CategoryCount<Tipo>>,
    pub mensal_grupo: Vec<MonthlySeries<Grupo>>,
    pub mensal_tipo: Vec<MonthlySeries<Tipo>>,
    /// Years present in the unrestricted input, ascending.
    pub anos: Vec<i32>,
}

impl Report {
    /// Years and months are calendar periods in `zone`.
    pub fn build(tickets: &[Ticket], year: Option<i32>, zone: Zone) -> Self {
        let selected = filter_by_year(tickets, year, zone);
        let total = selected.len();

        let por_grupo = Grupo::ALL
            .iter()
            .map(|&grupo| {
                let count = selected.iter().filter(|t| t.grupo == Some(grupo)).count();
                CategoryCount {
                    value: grupo,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();

        let por_tipo = Tipo::ALL
            .iter()
            .map(|&tipo| {
                let count = selected.iter().filter(|t| t.tipo == Some(tipo)).count();
                CategoryCount {
                    value: tipo,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();

        let mut mensal_grupo: Vec<MonthlySeries<Grupo>> = Grupo::ALL
            .iter()
            .map(|&value| MonthlySeries {
                value,
                months: [0; 12],
            })
            .collect();
        let mut mensal_tipo: Vec<MonthlySeries<Tipo>> = Tipo::ALL
            .iter()
            .map(|&value| MonthlySeries {
                value,
                months: [0; 12],
            })
            .collect();

        for ticket in &selected {
            let month = zone.date_of(&ticket.criadoem).month0() as usize;
            // Unclassified tickets count towards the total but not the histograms.
            if let Some(grupo) = ticket.grupo {
                mensal_grupo[grupo.index()].months[month] += 1;
            }
            if let Some(tipo) = ticket.tipo {
                mensal_tipo[tipo.index()].months[month] += 1;
            }
        }

        Self {
            year,
            total,
            por_grupo,
            por_tipo,
            mensal_grupo,
            mensal_tipo,
            anos: available_years(tickets, zone),
        }
    }
}

/// Tickets created in `year`, or all of them when `year` is `None`.
pub fn filter_by_year(tickets: &[Ticket], year: Option<i32>, zone: Zone) -> Vec<&Ticket> {
    tickets
        .iter()
        .filter(|t| year.map_or(true, |y| zone.date_of(&t.criadoem).year() == y))
        .collect()
}

pub fn available_years(tickets: &[Ticket], zone: Zone) -> Vec<i32> {
    tickets
        .iter()
        .map(|t| zone.date_of(&t.criadoem).year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = count as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilhetes_core::ticket::{Responsavel, Status};
    use chrono::{TimeZone, Utc};

    fn ticket(
        id: &str,
        grupo: Option<Grupo>,
        tipo: Option<Tipo>,
        y: i32,
        m: u32,
        d: u32,
    ) -> Ticket {
        Ticket {
            id: id.into(),
            titulo: format!("Ticket {id}"),
            descricao: String::new(),
            responsavel: Responsavel::Wilson,
            grupo,
            tipo,
            status: Status::Aberto,
            criadoem: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        }
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket("1", Some(Grupo::Hardware), Some(Tipo::Corretiva), 2024, 1, 5),
            ticket("2", Some(Grupo::Hardware), Some(Tipo::Preventiva), 2024, 1, 20),
            ticket("3", Some(Grupo::Redes), Some(Tipo::Configuracao), 2024, 6, 1),
            ticket("4", None, None, 2024, 7, 1),
            ticket("5", Some(Grupo::Software), Some(Tipo::SuporteUsuario), 2023, 11, 30),
        ]
    }

    fn build(tickets: &[Ticket], year: Option<i32>) -> Report {
        Report::build(tickets, year, Zone::utc())
    }

    fn count_of<T: PartialEq + Copy>(rows: &[CategoryCount<T>], value: T) -> &CategoryCount<T> {
        rows.iter().find(|r| r.value == value).unwrap()
    }

    #[test]
    fn empty_input_reports_zero_percentages() {
        let report = build(&[], Some(2024));
        assert_eq!(report.total, 0);
        for row in &report.por_grupo {
            assert_eq!(row.count, 0);
            assert_eq!(row.percentage, 0.0);
            assert!(!row.percentage.is_nan());
        }
        for row in &report.por_tipo {
            assert_eq!(row.percentage, 0.0);
        }
        assert!(report.anos.is_empty());
    }

    #[test]
    fn counts_and_percentages_for_a_year() {
        let report = build(&sample(), Some(2024));
        assert_eq!(report.total, 4);

        let hw = count_of(&report.por_grupo, Grupo::Hardware);
        assert_eq!(hw.count, 2);
        assert_eq!(hw.percentage, 50.0);

        let redes = count_of(&report.por_grupo, Grupo::Redes);
        assert_eq!(redes.percentage, 25.0);

        let sw = count_of(&report.por_grupo, Grupo::Software);
        assert_eq!(sw.count, 0);

        assert_eq!(report.por_grupo.len(), Grupo::ALL.len());
        assert_eq!(report.por_tipo.len(), Tipo::ALL.len());
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 3), 100.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn monthly_buckets_sum_to_category_count() {
        let tickets = sample();
        let report = build(&tickets, Some(2024));
        for series in &report.mensal_grupo {
            let count = count_of(&report.por_grupo, series.value).count;
            assert_eq!(series.total(), count, "{:?}", series.value);
        }
        for series in &report.mensal_tipo {
            let count = count_of(&report.por_tipo, series.value).count;
            assert_eq!(series.total(), count, "{:?}", series.value);
        }

        let hw = &report.mensal_grupo[Grupo::Hardware.index()];
        assert_eq!(hw.months[0], 2);
        assert_eq!(hw.months[1..].iter().sum::<usize>(), 0);
    }

    #[test]
    fn unclassified_tickets_are_left_out_of_histograms() {
        let report = build(&sample(), Some(2024));
        let july: usize = report.mensal_grupo.iter().map(|s| s.months[6]).sum();
        assert_eq!(july, 0);
        // ...but they still count towards the total.
        assert_eq!(report.total, 4);
    }

    #[test]
    fn years_are_distinct_and_ascending() {
        let tickets = sample();
        assert_eq!(available_years(&tickets, Zone::utc()), vec![2023, 2024]);
        let report = build(&tickets, Some(2023));
        assert_eq!(report.anos, vec![2023, 2024]);
    }

    #[test]
    fn selecting_a_year_excludes_the_other() {
        let tickets = sample();
        let report = build(&tickets, Some(2023));
        assert_eq!(report.total, 1);
        assert_eq!(count_of(&report.por_grupo, Grupo::Hardware).count, 0);
        assert_eq!(count_of(&report.por_grupo, Grupo::Software).count, 1);
        let all_months: usize = report.mensal_grupo.iter().map(|s| s.total()).sum();
        assert_eq!(all_months, 1);
    }

    #[test]
    fn no_year_covers_everything() {
        let report = build(&sample(), None);
        assert_eq!(report.total, 5);
        assert_eq!(report.year, None);
    }

    #[test]
    fn years_and_months_follow_the_zone() {
        let brt = Zone::parse_str("-03:00").unwrap();
        let mut t = ticket("1", Some(Grupo::Hardware), Some(Tipo::Corretiva), 2024, 1, 1);
        // 22:00 on 31 December 2023 in -03:00
        t.criadoem = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let tickets = vec![t];

        assert_eq!(available_years(&tickets, brt), vec![2023]);
        assert_eq!(available_years(&tickets, Zone::utc()), vec![2024]);

        let local = Report::build(&tickets, Some(2023), brt);
        assert_eq!(local.total, 1);
        assert_eq!(local.mensal_grupo[Grupo::Hardware.index()].months[11], 1);
        assert_eq!(Report::build(&tickets, Some(2024), brt).total, 0);

        let utc = Report::build(&tickets, Some(2024), Zone::utc());
        assert_eq!(utc.mensal_grupo[Grupo::Hardware.index()].months[0], 1);
    }

    #[test]
    fn report_serializes_category_names() {
        let report = build(&sample(), Some(2024));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["por_grupo"][2]["value"], "ajuda/duvida");
        assert_eq!(json["mensal_tipo"][0]["months"].as_array().unwrap().len(), 12);
    }
}
