use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use sociometric::models::{Question, RawResponse, ResponseValue, Student};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("6f1c2a4e-8d3b-4f7a-9c21-5b8e0d4a7f13", "Avery Lee", 11, "F"),
        ("a2d47c91-3e5f-4b86-8a0d-7c1f9e2b6d48", "Jules Moreno", 11, "M"),
        ("c93e1b7d-4a28-4f6c-b5e0-2d8a7f1c9e36", "Kiara Patel", 12, "F"),
        ("1e8f5a3c-7b92-4d4e-a6c1-9f3b2e7d5a80", "Noah Fischer", 11, "M"),
        ("54b2d9e7-1c6a-4e3f-8b7d-0a9c5e2f1b64", "Lena Okafor", 12, "F"),
        ("e7a30c5f-9d14-4b2a-a8e6-3c7f1d9b4e02", "Mateo Rossi", 11, "M"),
    ];
    let mut ids = Vec::new();

    for (id, name, age, gender) in students {
        let id = Uuid::parse_str(id)?;
        sqlx::query(
            r#"
            INSERT INTO sociometric.students (id, full_name, group_id, age, gender)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, group_id = EXCLUDED.group_id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind("5A")
        .bind(age)
        .bind(gender)
        .execute(pool)
        .await?;
        ids.push(id);
    }

    let questions = vec![
        (
            "0b5e8d21-6c3f-4a97-b1e4-8f2d7a9c3e51",
            "Who would you choose to work with on a class project?",
            "choice",
        ),
        (
            "7d2c9f4a-1e8b-4c65-a3d7-5b0e9f2a8c14",
            "Who would you not choose to work with?",
            "rejection",
        ),
        (
            "f41a6e3b-9c7d-4d28-8e5f-2a1b7c9d0e63",
            "Who gets picked on or left out by classmates?",
            "victimization",
        ),
    ];
    let mut question_ids = Vec::new();

    for (id, text, category) in questions {
        let id = Uuid::parse_str(id)?;
        sqlx::query(
            r#"
            INSERT INTO sociometric.questions (id, text, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET text = EXCLUDED.text, category = EXCLUDED.category
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(category)
        .execute(pool)
        .await?;
        question_ids.push(id);
    }

    let answered_at = Utc
        .with_ymd_and_hms(2026, 2, 2, 9, 30, 0)
        .single()
        .context("invalid seed timestamp")?;
    // (respondent, question, nominated students) by position in the lists above
    let answers: Vec<(usize, usize, Vec<usize>)> = vec![
        (0, 0, vec![1, 2]),
        (1, 0, vec![0, 2]),
        (2, 0, vec![0, 1]),
        (3, 0, vec![4]),
        (4, 0, vec![3]),
        (0, 1, vec![5]),
        (1, 1, vec![5]),
        (3, 1, vec![5]),
        (4, 2, vec![5]),
        (2, 2, vec![5]),
    ];

    for (respondent, question, targets) in answers {
        let value = targets
            .iter()
            .map(|target| ids[*target].to_string())
            .collect::<Vec<_>>()
            .join(",");
        let source_key = format!("seed-{respondent}-{question}");

        sqlx::query(
            r#"
            INSERT INTO sociometric.responses
            (id, student_id, question_id, value, answered_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ids[respondent])
        .bind(question_ids[question])
        .bind(value)
        .bind(answered_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_students(pool: &PgPool, group_id: &str) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        "SELECT id, full_name, group_id, age, gender \
         FROM sociometric.students \
         WHERE group_id = $1 \
         ORDER BY full_name, id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load students for group {group_id}"))?;

    let mut students = Vec::new();
    for row in rows {
        let age: Option<i32> = row.get("age");
        students.push(Student {
            id: row.get("id"),
            name: row.get("full_name"),
            group_id: row.get("group_id"),
            age: age.and_then(|value| u32::try_from(value).ok()),
            gender: row.get("gender"),
        });
    }

    Ok(students)
}

pub async fn fetch_responses(
    pool: &PgPool,
    group_ids: &[String],
) -> anyhow::Result<Vec<RawResponse>> {
    let rows = sqlx::query(
        "SELECT r.student_id, r.question_id, r.value, r.answered_at \
         FROM sociometric.responses r \
         JOIN sociometric.students s ON s.id = r.student_id \
         WHERE s.group_id = ANY($1) \
         ORDER BY r.answered_at, r.id",
    )
    .bind(group_ids)
    .fetch_all(pool)
    .await
    .context("failed to load survey responses")?;

    let mut responses = Vec::new();
    for row in rows {
        let value: String = row.get("value");
        let timestamp: DateTime<Utc> = row.get("answered_at");
        responses.push(RawResponse {
            student_id: row.get("student_id"),
            question_id: row.get("question_id"),
            value: ResponseValue::from_stored(&value),
            timestamp,
        });
    }

    Ok(responses)
}

pub async fn fetch_questions(pool: &PgPool) -> anyhow::Result<Vec<Question>> {
    let rows = sqlx::query("SELECT id, text, category, subject_id FROM sociometric.questions")
        .fetch_all(pool)
        .await
        .context("failed to load survey questions")?;

    Ok(rows
        .into_iter()
        .map(|row| Question {
            id: row.get("id"),
            text: row.get("text"),
            category: row.get("category"),
            subject_id: row.get("subject_id"),
        })
        .collect())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: Uuid,
        question_id: Uuid,
        value: String,
        answered_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO sociometric.responses
            (id, student_id, question_id, value, answered_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.student_id)
        .bind(row.question_id)
        .bind(&row.value)
        .bind(row.answered_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
