//! CSV import of artefacts and export of visits.

use crate::store::{Database, NewArtefact};
use crate::validate::{optional, parse_optional_date};
use crate::{Error, Result};
use std::fs::File;
use std::path::Path;

/// A row of an artefact import file
#[derive(Debug, serde::Deserialize)]
struct ArtefactRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    material: Option<String>,
    #[serde(default)]
    acquisition_date: Option<String>,
}

/// A row in the visits export
#[derive(Debug, serde::Serialize)]
struct VisitRow<'a> {
    visit_id: u64,
    visit_date: String,
    visitor_id: u64,
    visitor_name: &'a str,
    exhibit_id: u64,
    exhibit_title: &'a str,
}

/// Create an artefact for every row of a CSV file with a header line of
/// `name,description,material,acquisition_date`.
///
/// Rows with a blank name are skipped. Any malformed date aborts the whole
/// import before anything is added. Returns the number of artefacts created.
pub fn import_artefacts_csv(db: &mut Database, path: &Path) -> Result<usize> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(strip_bom(file)?);

    let mut pending = Vec::new();
    for (index, row) in reader.deserialize::<ArtefactRow>().enumerate() {
        let row = row?;
        if row.name.trim().is_empty() {
            tracing::debug!("Skipping row {} with no name", index + 2);
            continue;
        }
        let acquisition_date = parse_optional_date(row.acquisition_date.as_deref())
            .map_err(|e| Error::Validation(format!("Row {}: {}", index + 2, e)))?;
        pending.push(NewArtefact {
            name: row.name,
            description: optional(row.description.as_deref()),
            material: optional(row.material.as_deref()),
            acquisition_date,
        });
    }

    let count = pending.len();
    for new in pending {
        db.create_artefact(new)?;
    }
    tracing::info!("Imported {} artefacts from {:?}", count, path);
    Ok(count)
}

/// Readers starting with a UTF-8 byte order mark have it removed
fn strip_bom(file: File) -> Result<impl std::io::Read> {
    use std::io::{BufRead, BufReader};

    let mut reader = BufReader::new(file);
    let has_bom = reader.fill_buf()?.starts_with(b"\xEF\xBB\xBF");
    if has_bom {
        reader.consume(3);
    }
    Ok(reader)
}

/// Write every visit, joined with visitor and exhibit names, to a CSV file
///
/// The file is replaced if it exists and synced to disk before returning.
/// Returns the number of rows written.
pub fn export_visits_csv(db: &Database, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut count = 0;
    for visit in db.visits() {
        let visitor = db.visitor(visit.visitor_id)?;
        let exhibit = db.exhibit(visit.exhibit_id)?;
        writer.serialize(VisitRow {
            visit_id: visit.id,
            visit_date: visit.visit_date.to_string(),
            visitor_id: visitor.id,
            visitor_name: &visitor.full_name,
            exhibit_id: exhibit.id,
            exhibit_title: &exhibit.title,
        })?;
        count += 1;
    }
    if count == 0 {
        writer.write_record([
            "visit_id",
            "visit_date",
            "visitor_id",
            "visitor_name",
            "exhibit_id",
            "exhibit_title",
        ])?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} visits to {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewExhibit, NewVisitor};
    use chrono::NaiveDate;

    #[test]
    fn test_import_artefacts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("artefacts.csv");
        std::fs::write(
            &path,
            "name,description,material,acquisition_date\n\
             Roman Coin,Silver denarius,silver,2020-03-14\n\
             ,orphan row,,\n\
             Clay Pot,,,\n",
        )
        .unwrap();

        let mut db = Database::default();
        assert_eq!(import_artefacts_csv(&mut db, &path).unwrap(), 2);

        let coin = &db.artefacts()[0];
        assert_eq!(coin.name, "Roman Coin");
        assert_eq!(coin.material.as_deref(), Some("silver"));
        assert_eq!(coin.acquisition_date, NaiveDate::from_ymd_opt(2020, 3, 14));

        let pot = &db.artefacts()[1];
        assert_eq!(pot.description, None);
        assert_eq!(pot.acquisition_date, None);
    }

    #[test]
    fn test_import_tolerates_bom() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bom.csv");
        std::fs::write(&path, "\u{feff}name,material\nFlint Axe,flint\n").unwrap();

        let mut db = Database::default();
        assert_eq!(import_artefacts_csv(&mut db, &path).unwrap(), 1);
        assert_eq!(db.artefacts()[0].name, "Flint Axe");
    }

    #[test]
    fn test_import_bad_date_adds_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "name,acquisition_date\nGood,2020-01-01\nBad,14/03/2020\n",
        )
        .unwrap();

        let mut db = Database::default();
        let err = import_artefacts_csv(&mut db, &path).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().starts_with("Row 3:"));
        assert!(db.artefacts().is_empty());
    }

    #[test]
    fn test_import_missing_file() {
        let mut db = Database::default();
        let result = import_artefacts_csv(&mut db, Path::new("/nonexistent/artefacts.csv"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_export_visits() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out").join("visits.csv");

        let mut db = Database::default();
        db.create_exhibit(NewExhibit {
            title: "Stone Age".into(),
            ..Default::default()
        })
        .unwrap();
        db.create_visitor(NewVisitor {
            full_name: "Dee".into(),
            email: "dee@example.com".into(),
            ..Default::default()
        })
        .unwrap();
        db.record_visit(1, 1, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap())
            .unwrap();

        assert_eq!(export_visits_csv(&db, &path).unwrap(), 1);
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("visit_id,visit_date,visitor_id,visitor_name,exhibit_id,exhibit_title")
        );
        assert_eq!(lines.next(), Some("1,2024-02-02,1,Dee,1,Stone Age"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty_writes_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("visits.csv");
        assert_eq!(export_visits_csv(&Database::default(), &path).unwrap(), 0);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("visit_id,visit_date"));
    }
}
