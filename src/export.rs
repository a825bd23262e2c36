use std::collections::HashMap;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use crate::db::{PublicationRow, metrics::MetricExportRow};

pub const CSV_DELIMITER: u8 = b';';

const PUBLICATION_HEADERS: [&str; 10] = [
    "ID",
    "Название",
    "Год",
    "Журнал",
    "Источник",
    "Ссылка",
    "Цитирования",
    "DOI/ID",
    "Статус",
    "Авторы",
];

const METRIC_HEADERS: [&str; 10] = [
    "Преподаватель",
    "Кафедра",
    "Год",
    "Публикаций",
    "Цитирований",
    "h-индекс",
    "РИНЦ",
    "Scopus",
    "WoS",
    "Google Scholar",
];

fn publication_record(publication: &PublicationRow, authors: &HashMap<i64, Vec<String>>) -> [String; 10] {
    let author_list = authors
        .get(&publication.id)
        .map(|names| names.join(", "))
        .unwrap_or_default();

    [
        publication.id.to_string(),
        publication.title.clone(),
        publication.year.to_string(),
        publication.journal.clone(),
        publication.source.clone(),
        publication.link.clone(),
        publication.citations.to_string(),
        publication.doi.clone(),
        publication.status().as_str().to_string(),
        author_list,
    ]
}

pub fn publications_csv(
    publications: &[PublicationRow],
    authors: &HashMap<i64, Vec<String>>,
) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(Vec::new());

    writer
        .write_record(PUBLICATION_HEADERS)
        .context("failed to write publication header")?;
    for publication in publications {
        writer
            .write_record(publication_record(publication, authors))
            .with_context(|| format!("failed to write publication {}", publication.id))?;
    }

    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush publication csv: {err}"))
}

pub fn metrics_csv(rows: &[MetricExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(Vec::new());

    writer
        .write_record(METRIC_HEADERS)
        .context("failed to write metrics header")?;
    for row in rows {
        writer
            .write_record([
                row.lecturer_fio.clone(),
                row.department.clone(),
                row.year.to_string(),
                row.total_publications.to_string(),
                row.total_citations.to_string(),
                row.h_index.to_string(),
                row.rinc.to_string(),
                row.scopus.to_string(),
                row.wos.to_string(),
                row.google_scholar.to_string(),
            ])
            .context("failed to write metrics row")?;
    }

    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush metrics csv: {err}"))
}

pub fn publications_xlsx(
    publications: &[PublicationRow],
    authors: &HashMap<i64, Vec<String>>,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Публикации")
        .context("failed to name worksheet")?;

    for (col, header) in PUBLICATION_HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .context("failed to write xlsx header")?;
    }

    for (idx, publication) in publications.iter().enumerate() {
        let row = (idx + 1) as u32;
        let record = publication_record(publication, authors);
        for (col, value) in record.iter().enumerate() {
            match col {
                0 => worksheet.write_number(row, 0, publication.id as f64),
                2 => worksheet.write_number(row, 2, f64::from(publication.year)),
                6 => worksheet.write_number(row, 6, f64::from(publication.citations)),
                _ => worksheet.write_string(row, col as u16, value),
            }
            .context("failed to write xlsx cell")?;
        }
    }

    worksheet.autofit();

    workbook
        .save_to_buffer()
        .context("failed to serialize publications workbook")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn publication(id: i64, title: &str) -> PublicationRow {
        PublicationRow {
            id,
            title: title.to_string(),
            year: 2023,
            journal: "Информатика и образование".to_string(),
            source: "РИНЦ".to_string(),
            link: String::new(),
            citations: 5,
            doi: "10.1234/example1".to_string(),
            status: "approved".to_string(),
            review_comment: None,
            revision_deadline: None,
            reviewer_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn publications_csv_uses_semicolons_and_joins_authors() {
        let mut authors = HashMap::new();
        authors.insert(1, vec!["Иванов И.И.".to_string(), "Петрова М.С.".to_string()]);

        let bytes = publications_csv(&[publication(1, "Paper X")], &authors).expect("csv");
        let text = String::from_utf8(bytes).expect("utf-8");
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("ID;Название;Год;Журнал;Источник;Ссылка;Цитирования;DOI/ID;Статус;Авторы")
        );
        assert_eq!(
            lines.next(),
            Some("1;Paper X;2023;Информатика и образование;РИНЦ;;5;10.1234/example1;approved;Иванов И.И., Петрова М.С.")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_quotes_fields_containing_delimiter() {
        let bytes =
            publications_csv(&[publication(7, "Data; models")], &HashMap::new()).expect("csv");
        let text = String::from_utf8(bytes).expect("utf-8");
        assert!(text.contains("7;\"Data; models\";2023"));
    }

    #[test]
    fn metrics_csv_has_header_only_when_empty() {
        let bytes = metrics_csv(&[]).expect("csv");
        let text = String::from_utf8(bytes).expect("utf-8");
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Преподаватель;Кафедра;Год"));
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = publications_xlsx(&[publication(1, "Paper X")], &HashMap::new()).expect("xlsx");
        assert!(bytes.starts_with(b"PK"));
    }
}
