use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::AppError;
use crate::services::report::ReportBundle;

pub const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const RAW_COLUMNS: [&str; 11] = [
    "id",
    "inicio",
    "duracao_minutos",
    "status",
    "aluno",
    "serie",
    "turno",
    "professor",
    "especialidade",
    "conteudo",
    "descritor",
];

const RESUMO_COLUMNS: [&str; 5] = [
    "periodo_inicial",
    "periodo_final",
    "total_agendamentos",
    "total_horas",
    "media_duracao_min",
];

pub fn filename(start: NaiveDate, end: NaiveDate) -> String {
    format!("relatorio_agendamentos_{}_{}.xlsx", start, end)
}

fn write_header(sheet: &mut Worksheet, columns: &[&str], bold: &Format) -> Result<(), AppError> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, bold)?;
    }
    Ok(())
}

fn write_groups<'r, I>(
    workbook: &mut Workbook,
    sheet_name: &str,
    key: &str,
    rows: I,
    bold: &Format,
) -> Result<(), AppError>
where
    I: Iterator<Item = (&'r str, usize, f64)>,
{
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;
    write_header(sheet, &[key, "agendamentos", "horas"], bold)?;
    sheet.set_column_width(0, 32)?;
    for (i, (chave, agendamentos, horas)) in rows.enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, chave)?;
        sheet.write_number(r, 1, agendamentos as f64)?;
        sheet.write_number(r, 2, horas)?;
    }
    Ok(())
}

/// Renders the bundle as an xlsx workbook: raw rows, summary, then one sheet per grouping.
pub fn render(bundle: &ReportBundle) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let datetime = Format::new().set_num_format("yyyy-mm-dd hh:mm");
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Agendamentos")?;
    write_header(sheet, &RAW_COLUMNS, &bold)?;
    sheet.set_column_width(1, 18)?;
    for (i, row) in bundle.agendamentos_rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.id)?;
        sheet.write_datetime_with_format(r, 1, &row.inicio, &datetime)?;
        sheet.write_number(r, 2, row.duracao_minutos as f64)?;
        sheet.write_string(r, 3, row.status.as_str())?;
        sheet.write_string(r, 4, &row.aluno)?;
        sheet.write_string(r, 5, &row.serie)?;
        sheet.write_string(r, 6, &row.turno)?;
        sheet.write_string(r, 7, &row.professor)?;
        sheet.write_string(r, 8, &row.especialidade)?;
        sheet.write_string(r, 9, &row.conteudo)?;
        sheet.write_string(r, 10, &row.descritor)?;
    }

    let resumo = &bundle.resumo;
    let sheet = workbook.add_worksheet();
    sheet.set_name("Resumo")?;
    write_header(sheet, &RESUMO_COLUMNS, &bold)?;
    sheet.write_datetime_with_format(1, 0, &resumo.periodo_inicial, &date)?;
    sheet.write_datetime_with_format(1, 1, &resumo.periodo_final, &date)?;
    sheet.write_number(1, 2, resumo.total_agendamentos as f64)?;
    sheet.write_number(1, 3, resumo.total_horas)?;
    sheet.write_number(1, 4, resumo.media_duracao_min)?;

    write_groups(
        &mut workbook,
        "Por Professor",
        "professor",
        bundle
            .by_professor
            .iter()
            .map(|g| (g.professor.as_str(), g.agendamentos, g.horas)),
        &bold,
    )?;
    write_groups(
        &mut workbook,
        "Por Aluno",
        "aluno",
        bundle
            .by_aluno
            .iter()
            .map(|g| (g.aluno.as_str(), g.agendamentos, g.horas)),
        &bold,
    )?;
    write_groups(
        &mut workbook,
        "Por Conteúdo",
        "conteudo",
        bundle
            .by_conteudo
            .iter()
            .map(|g| (g.conteudo.as_str(), g.agendamentos, g.horas)),
        &bold,
    )?;
    write_groups(
        &mut workbook,
        "Mensal",
        "mes",
        bundle
            .monthly
            .iter()
            .map(|g| (g.mes.as_str(), g.agendamentos, g.horas)),
        &bold,
    )?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportRecord, Status};
    use crate::services::report::{ReportRange, aggregate};
    use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};
    use chrono::NaiveDateTime;
    use std::io::Cursor;

    fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn record(id: &str, inicio: NaiveDateTime, professor: &str, aluno: &str) -> ReportRecord {
        ReportRecord {
            id: id.to_string(),
            inicio,
            duracao_minutos: Some(45),
            status: Status::Concluido,
            aluno: Some(aluno.to_string()),
            serie: Some("3".to_string()),
            turno: Some("T".to_string()),
            professor: Some(professor.to_string()),
            especialidade: Some("Português".to_string()),
            conteudo: Some("Leitura".to_string()),
            descritor: None,
        }
    }

    fn range() -> ReportRange {
        ReportRange {
            start: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        }
    }

    fn header(range: &calamine::Range<Data>) -> Vec<String> {
        range
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_filename_uses_literal_dates() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(
            filename(start, end),
            "relatorio_agendamentos_2026-02-01_2026-02-28.xlsx"
        );
    }

    #[test]
    fn test_workbook_layout_reads_back() {
        let records = vec![
            record("a1", at(2, 3, 14, 30), "Rita", "Ana"),
            record("a2", at(2, 4, 9, 0), "Rita", "Bia"),
            record("a3", at(3, 10, 16, 15), "Caio", "Ana"),
        ];
        let bundle = aggregate(range(), records);
        let bytes = render(&bundle).expect("render");

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).expect("open xlsx");
        assert_eq!(
            workbook.sheet_names(),
            vec![
                "Agendamentos",
                "Resumo",
                "Por Professor",
                "Por Aluno",
                "Por Conteúdo",
                "Mensal"
            ]
        );

        let raw = workbook.worksheet_range("Agendamentos").unwrap();
        assert_eq!(header(&raw), RAW_COLUMNS);
        assert_eq!(raw.height(), bundle.agendamentos_rows.len() + 1);
        for (i, row) in bundle.agendamentos_rows.iter().enumerate() {
            let r = (i + 1) as u32;
            assert_eq!(raw.get_value((r, 0)), Some(&Data::String(row.id.clone())));
            let cell = raw.get_value((r, 1)).unwrap();
            assert!(matches!(cell, Data::DateTime(_)), "inicio cell: {cell:?}");
            let read = cell.as_datetime().unwrap();
            assert!((read - row.inicio).num_seconds().abs() < 1, "{read} vs {}", row.inicio);
        }

        let resumo = workbook.worksheet_range("Resumo").unwrap();
        assert_eq!(header(&resumo), RESUMO_COLUMNS);
        assert_eq!(
            resumo.get_value((1, 0)).and_then(|c| c.as_date()),
            Some(bundle.resumo.periodo_inicial)
        );
        assert_eq!(resumo.get_value((1, 2)), Some(&Data::Float(3.0)));

        let por_professor = workbook.worksheet_range("Por Professor").unwrap();
        assert_eq!(header(&por_professor), ["professor", "agendamentos", "horas"]);
        assert_eq!(por_professor.height(), bundle.by_professor.len() + 1);
        assert_eq!(por_professor.get_value((1, 0)), Some(&Data::String("Rita".to_string())));

        let mensal = workbook.worksheet_range("Mensal").unwrap();
        assert_eq!(header(&mensal), ["mes", "agendamentos", "horas"]);
        assert_eq!(mensal.height(), 3);
    }

    #[test]
    fn test_empty_report_renders_workbook() {
        let bytes = render(&aggregate(range(), vec![])).expect("render");
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).expect("open xlsx");
        assert_eq!(workbook.sheet_names().len(), 6);
        let raw = workbook.worksheet_range("Agendamentos").unwrap();
        assert_eq!(raw.height(), 1);
    }
}
