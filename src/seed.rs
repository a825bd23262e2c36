use anyhow::{Context, Result, anyhow};
use sqlx::PgPool;
use tracing::info;

use crate::{
    db::{
        self, content,
        lecturers::{self, LecturerFields},
        metrics::{self, MetricValues},
        publications::{self, PublicationFields},
        users::{self, NewUser},
    },
    roles::Role,
    web::auth::hash_password,
};

struct DemoLecturer {
    fields: LecturerFields,
    account_password: &'static str,
}

fn demo_lecturers() -> Vec<DemoLecturer> {
    let lecturer = |fio: &str, position: &str, department: &str, degree: &str, orcid: &str, email: &str| {
        DemoLecturer {
            fields: LecturerFields {
                fio: fio.to_string(),
                position: position.to_string(),
                department: department.to_string(),
                academic_degree: degree.to_string(),
                orcid: orcid.to_string(),
                email: email.to_string(),
            },
            account_password: "lecturer",
        }
    };

    vec![
        lecturer(
            "Иванов Иван Иванович",
            "доцент",
            "Кафедра информационных технологий",
            "к.т.н.",
            "0000-0001-2345-6789",
            "ivanov@university.ru",
        ),
        lecturer(
            "Петрова Мария Сергеевна",
            "профессор",
            "Кафедра экономики",
            "д.э.н.",
            "0000-0002-3333-2222",
            "petrova@university.ru",
        ),
        lecturer(
            "Сидоров Алексей Петрович",
            "ассистент",
            "Кафедра математики",
            "",
            "",
            "sidorov@university.ru",
        ),
    ]
}

fn demo_publications() -> Vec<PublicationFields> {
    let publication = |title: &str, year: i32, journal: &str, source: &str, link: &str, citations: i32, doi: &str| {
        PublicationFields {
            title: title.to_string(),
            year,
            journal: journal.to_string(),
            source: source.to_string(),
            link: link.to_string(),
            citations,
            doi: doi.to_string(),
        }
    };

    vec![
        publication(
            "Моделирование процессов обработки данных",
            2023,
            "Информатика и образование",
            "РИНЦ",
            "https://elibrary.ru/example1",
            5,
            "10.1234/example1",
        ),
        publication(
            "Экономический анализ инноваций",
            2022,
            "Экономика и управление",
            "Scopus",
            "https://scopus.com/example2",
            10,
            "10.1234/example2",
        ),
        publication(
            "Современные методы обучения",
            2021,
            "Педагогика XXI века",
            "WoS",
            "",
            3,
            "10.1234/example3",
        ),
    ]
}

/// Authors per publication, indexed into the demo lecturer list.
/// Five links in total: one joint paper each for the first two publications.
const DEMO_AUTHORSHIP: [&[usize]; 3] = [&[0, 1], &[1, 0], &[2]];

const DEMO_METRICS: [(usize, i32, MetricValues); 3] = [
    (
        0,
        2023,
        MetricValues {
            total_publications: 7,
            total_citations: 24,
            h_index: 3,
            rinc: 5,
            scopus: 1,
            wos: 1,
            google_scholar: 0,
        },
    ),
    (
        1,
        2023,
        MetricValues {
            total_publications: 12,
            total_citations: 54,
            h_index: 6,
            rinc: 2,
            scopus: 8,
            wos: 2,
            google_scholar: 0,
        },
    ),
    (
        2,
        2023,
        MetricValues {
            total_publications: 3,
            total_citations: 6,
            h_index: 1,
            rinc: 0,
            scopus: 0,
            wos: 1,
            google_scholar: 2,
        },
    ),
];

async fn create_account(
    pool: &PgPool,
    fio: &str,
    email: &str,
    password: &str,
    role: Role,
    lecturer_id: Option<i64>,
) -> Result<i64> {
    let password_hash =
        hash_password(password).map_err(|err| anyhow!("failed to hash password for {email}: {err}"))?;
    users::create_user(
        pool,
        &NewUser {
            fio,
            email,
            password_hash: &password_hash,
            role,
            lecturer_id,
        },
    )
    .await
    .with_context(|| format!("failed to insert user {email}"))
}

/// Drops the store, recreates the schema and fills it with demo rows.
pub async fn reset_and_seed(pool: &PgPool) -> Result<()> {
    db::reset(pool).await?;

    create_account(pool, "Администратор", "admin@university.ru", "admin", Role::Admin, None).await?;
    create_account(pool, "Научный сотрудник", "user@university.ru", "user", Role::Staff, None).await?;

    let mut lecturer_ids = Vec::new();
    for demo in demo_lecturers() {
        let lecturer_id = lecturers::create_lecturer(pool, &demo.fields)
            .await
            .with_context(|| format!("failed to insert lecturer {}", demo.fields.fio))?;
        create_account(
            pool,
            &demo.fields.fio,
            &demo.fields.email,
            demo.account_password,
            Role::Lecturer,
            Some(lecturer_id),
        )
        .await?;
        lecturer_ids.push(lecturer_id);
    }

    for (fields, authors) in demo_publications().iter().zip(DEMO_AUTHORSHIP) {
        let author_ids: Vec<i64> = authors.iter().map(|idx| lecturer_ids[*idx]).collect();
        publications::create_publication(pool, fields, &author_ids)
            .await
            .with_context(|| format!("failed to insert publication {}", fields.title))?;
    }

    for (idx, year, values) in DEMO_METRICS {
        metrics::set_metrics(pool, lecturer_ids[idx], year, &values)
            .await
            .context("failed to insert demo metrics")?;
    }

    content::create_feedback(
        pool,
        "Абитуриент",
        "student@example.com",
        "Где посмотреть список публикаций кафедры экономики?",
    )
    .await
    .context("failed to insert demo feedback")?;

    content::create_news(
        pool,
        "Открыт приём отчётов за 2023 год",
        "Преподаватели могут подать публикации за 2023 год через личный кабинет до конца квартала.",
    )
    .await
    .context("failed to insert demo news")?;

    content::create_faq(
        pool,
        "Как добавить публикацию?",
        "Войдите в личный кабинет преподавателя и заполните форму на странице «Мои публикации».",
    )
    .await
    .context("failed to insert demo faq")?;
    content::create_faq(
        pool,
        "Кто проверяет публикации?",
        "Публикации проверяют сотрудники научного отдела: одобряют, отклоняют или отправляют на доработку.",
    )
    .await
    .context("failed to insert demo faq")?;

    info!(lecturers = lecturer_ids.len(), "demo data seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorship_yields_five_links() {
        let links: usize = DEMO_AUTHORSHIP.iter().map(|authors| authors.len()).sum();
        assert_eq!(links, 5);
        assert_eq!(DEMO_AUTHORSHIP.len(), demo_publications().len());
    }

    #[test]
    fn demo_indexes_stay_in_range() {
        let count = demo_lecturers().len();
        assert!(DEMO_AUTHORSHIP.iter().flat_map(|a| a.iter()).all(|idx| *idx < count));
        assert!(DEMO_METRICS.iter().all(|(idx, _, _)| *idx < count));
    }
}
