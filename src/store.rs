use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::CouncilConfig;
use crate::models::{ClassGroup, Gender, Gradebook, Identity, Student, SubjectKey, TermId};
use crate::pipeline;

pub fn load_gradebook(path: &Path, config: &CouncilConfig) -> anyhow::Result<Gradebook> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read gradebook {}", path.display()))?;
    gradebook_from_json(&raw, config)
        .with_context(|| format!("failed to load gradebook {}", path.display()))
}

/// Parses a stored gradebook and re-derives its averages and ranks from the
/// raw marks; cached values in the document are not trusted.
pub fn gradebook_from_json(raw: &str, config: &CouncilConfig) -> anyhow::Result<Gradebook> {
    let gradebook: Gradebook = serde_json::from_str(raw).context("gradebook is not valid JSON")?;
    Ok(pipeline::restore_derived(gradebook, config)?)
}

pub fn save_gradebook(path: &Path, gradebook: &Gradebook) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(gradebook)?;
    std::fs::write(path, raw)
        .with_context(|| format!("failed to write gradebook {}", path.display()))?;
    Ok(())
}

/// Demo dataset: one class with a spread of results across the three terms.
pub fn seed(config: &CouncilConfig) -> anyhow::Result<Gradebook> {
    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Amine Hadj Ahmed",
            Gender::Male,
            "2007-04-12",
            "RN-2024-001",
            [17.5, 18.0, 18.4],
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Sarah Mansouri",
            Gender::Female,
            "2007-09-30",
            "RN-2024-002",
            [14.2, 13.6, 15.1],
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Karim Saidi",
            Gender::Male,
            "2008-01-05",
            "RN-2024-003",
            [9.4, 9.8, 9.2],
        ),
        (
            Uuid::parse_str("8b1d0f3e-5c7a-4e21-9a5f-2f6d4c1b7e90")?,
            "Lydia Zerrouki",
            Gender::Female,
            "2007-12-18",
            "RN-2024-004",
            [11.3, 12.4, 12.9],
        ),
        (
            Uuid::parse_str("f2c4e6a8-1b3d-4f5e-8a7c-9d0e1f2a3b4c")?,
            "Omar Bouzid",
            Gender::Male,
            "2007-06-27",
            "RN-2024-005",
            [7.8, 8.5, 10.6],
        ),
    ];

    let mut class = ClassGroup::new("3s1", "3 Sci 1");
    class.major = "Experimental sciences".to_string();
    class.year = config.school.school_year.clone();

    for (id, name, gender, birth_date, registration_number, bases) in students {
        let mut student = Student::new(Identity {
            name: name.to_string(),
            gender,
            birth_date: NaiveDate::parse_from_str(birth_date, "%Y-%m-%d")
                .context("invalid seed birth date")?,
            registration_number: registration_number.to_string(),
        });
        student.id = id;

        for (term, base) in TermId::ALL.into_iter().zip(bases) {
            for (offset, subject) in SubjectKey::ALL.into_iter().enumerate() {
                let swing = (offset % 5) as f64 * 0.4 - 0.8;
                let clamp = |value: f64| value.clamp(0.0, 20.0);
                student
                    .term_mut(term)
                    .subjects
                    .entry_mut(subject)
                    .set_marks(clamp(base + swing), clamp(base - swing / 2.0), clamp(base));
            }
        }
        class.students.push(student);
    }

    let gradebook = Gradebook {
        classes: vec![class],
    };
    Ok(pipeline::bulk_recompute(&gradebook, config)?)
}

#[derive(serde::Deserialize)]
struct CsvRow {
    class_id: String,
    class_name: String,
    registration_number: String,
    full_name: String,
    gender: Gender,
    birth_date: NaiveDate,
    term: TermId,
    subject: SubjectKey,
    evaluation: f64,
    test: f64,
    exam: f64,
    remark: Option<String>,
}

fn check_mark(row: usize, field: &str, value: f64) -> anyhow::Result<()> {
    if !(0.0..=20.0).contains(&value) {
        bail!("row {row}: {field} must be between 0 and 20, got {value}");
    }
    Ok(())
}

pub fn import_csv(
    gradebook: &mut Gradebook,
    csv_path: &Path,
    config: &CouncilConfig,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    import_csv_reader(gradebook, file, config)
}

/// Upserts students by registration number and stores their raw marks, then
/// refreshes averages, decisions and term ranks of every touched class.
/// Marks outside `[0, 20]` are rejected before anything is written.
pub fn import_csv_reader<R: Read>(
    gradebook: &mut Gradebook,
    reader: R,
    config: &CouncilConfig,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 2;
        let row = result.with_context(|| format!("row {row_number}: malformed record"))?;
        check_mark(row_number, "evaluation", row.evaluation)?;
        check_mark(row_number, "test", row.test)?;
        check_mark(row_number, "exam", row.exam)?;
        rows.push(row);
    }

    let mut staged = gradebook.clone();
    let mut touched = BTreeSet::new();

    for row in &rows {
        if staged.class(&row.class_id).is_none() {
            staged
                .classes
                .push(ClassGroup::new(row.class_id.clone(), row.class_name.clone()));
        }
        let class = staged
            .class_mut(&row.class_id)
            .context("class vanished during import")?;

        let identity = Identity {
            name: row.full_name.clone(),
            gender: row.gender,
            birth_date: row.birth_date,
            registration_number: row.registration_number.clone(),
        };
        let position = class
            .students
            .iter()
            .position(|student| student.identity.registration_number == row.registration_number);
        let student = match position {
            Some(index) => {
                let student = &mut class.students[index];
                student.identity = identity;
                student
            }
            None => {
                class.students.push(Student::new(identity));
                let last = class.students.len() - 1;
                &mut class.students[last]
            }
        };

        let score = student.term_mut(row.term).subjects.entry_mut(row.subject);
        score.set_marks(row.evaluation, row.test, row.exam);
        if let Some(remark) = &row.remark {
            score.remark = remark.clone();
        }
        touched.insert(row.class_id.clone());
    }

    for class_id in &touched {
        if let Some(class) = staged.class_mut(class_id) {
            pipeline::refresh_class(class, config)?;
        }
    }

    tracing::info!(rows = rows.len(), classes = touched.len(), "imported marks");
    *gradebook = staged;
    Ok(rows.len())
}
