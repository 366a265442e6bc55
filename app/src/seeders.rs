//! `campus db:seed`: a demo school with an admin account
//!
//! Running it twice leaves the existing demo school untouched.

use campus::{env, FrameworkError, DB};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use crate::models::{academic_sessions, class_sections, now, schools, users};
use crate::policies::Role;

const DEMO_CODE: &str = "DEMO";

pub async fn run() -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    if schools::Entity::find()
        .filter(schools::Column::Code.eq(DEMO_CODE))
        .one(db.inner())
        .await?
        .is_some()
    {
        tracing::info!(code = DEMO_CODE, "demo school already seeded");
        return Ok(());
    }

    let email: String = env("SEED_ADMIN_EMAIL", "admin@campus.test".to_string());
    let password: String = env("SEED_ADMIN_PASSWORD", "password".to_string());
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| FrameworkError::internal(e.to_string()))?;
    let now = now();

    let txn = db.inner().begin().await?;
    let school = schools::ActiveModel {
        name: Set("Campus Demo School".to_string()),
        code: Set(DEMO_CODE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    users::ActiveModel {
        school_id: Set(school.id),
        name: Set("Administrator".to_string()),
        email: Set(email.clone()),
        password: Set(hash),
        role: Set(Role::Admin.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let (starts_on, ends_on) = school_year(Utc::now().date_naive())?;
    academic_sessions::ActiveModel {
        school_id: Set(school.id),
        name: Set(format!("{}/{}", starts_on.year(), ends_on.year())),
        starts_on: Set(starts_on),
        ends_on: Set(ends_on),
        is_current: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for grade in 1..=3 {
        class_sections::ActiveModel {
            school_id: Set(school.id),
            name: Set(format!("Grade {} A", grade)),
            grade_level: Set(grade),
            section: Set("A".to_string()),
            capacity: Set(30),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!(school_id = school.id, %email, "demo school seeded");
    Ok(())
}

/// September to June around `today`
fn school_year(today: NaiveDate) -> Result<(NaiveDate, NaiveDate), FrameworkError> {
    let first = if today.month() >= 9 { today.year() } else { today.year() - 1 };
    let starts_on = NaiveDate::from_ymd_opt(first, 9, 1);
    let ends_on = NaiveDate::from_ymd_opt(first + 1, 6, 30);
    starts_on
        .zip(ends_on)
        .ok_or_else(|| FrameworkError::internal("invalid school year"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use sea_orm::PaginatorTrait;

    #[test]
    fn school_year_spans_september_to_june() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(school_year(date(2025, 10, 19)).unwrap(), (date(2025, 9, 1), date(2026, 6, 30)));
        assert_eq!(school_year(date(2026, 3, 1)).unwrap(), (date(2025, 9, 1), date(2026, 6, 30)));
    }

    #[tokio::test]
    async fn seeding_twice_creates_one_demo_school() {
        let app = TestApp::new().await;

        run().await.unwrap();
        run().await.unwrap();

        let schools = schools::Entity::find()
            .filter(schools::Column::Code.eq(DEMO_CODE))
            .count(app.conn())
            .await
            .unwrap();
        assert_eq!(schools, 1);
    }
}
