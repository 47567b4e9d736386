use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};

use crate::{
    application::pagination::{OffsetPage, Page},
    application::repos::{
        ApplicationFilter, ApplicationPatch, ApplicationsRepo, NewApplication, RepoError,
    },
    domain::{
        entities::ApplicationRecord,
        types::{ApplicationStatus, ApplicationType},
    },
};

use super::{PgRepositories, map_sqlx_error};

const APPLICATION_COLUMNS: &str = "id, first_name, last_name, email, phone, application_type, \
     status, resume_path, admin_notes, nationality, date_of_birth, address_line_1, \
     address_line_2, city, state, zip_code, country, education_level, program_major, languages, \
     available_days, available_times, interests, skills_experience, motivation, emergency_name, \
     emergency_relationship, emergency_phone, reference_name, reference_contact, \
     has_medical_condition, agrees_to_terms, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    application_type: ApplicationType,
    status: ApplicationStatus,
    resume_path: Option<String>,
    admin_notes: String,
    nationality: Option<String>,
    date_of_birth: Date,
    address_line_1: Option<String>,
    address_line_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: String,
    education_level: Option<String>,
    program_major: Option<String>,
    languages: Option<String>,
    available_days: Json<Vec<String>>,
    available_times: Json<Vec<String>>,
    interests: Json<Vec<String>>,
    skills_experience: Option<String>,
    motivation: Option<String>,
    emergency_name: Option<String>,
    emergency_relationship: Option<String>,
    emergency_phone: Option<String>,
    reference_name: Option<String>,
    reference_contact: Option<String>,
    has_medical_condition: bool,
    agrees_to_terms: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ApplicationRow> for ApplicationRecord {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            application_type: row.application_type,
            status: row.status,
            resume_path: row.resume_path,
            admin_notes: row.admin_notes,
            nationality: row.nationality,
            date_of_birth: row.date_of_birth,
            address_line_1: row.address_line_1,
            address_line_2: row.address_line_2,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            country: row.country,
            education_level: row.education_level,
            program_major: row.program_major,
            languages: row.languages,
            available_days: row.available_days.0,
            available_times: row.available_times.0,
            interests: row.interests.0,
            skills_experience: row.skills_experience,
            motivation: row.motivation,
            emergency_name: row.emergency_name,
            emergency_relationship: row.emergency_relationship,
            emergency_phone: row.emergency_phone,
            reference_name: row.reference_name,
            reference_contact: row.reference_contact,
            has_medical_condition: row.has_medical_condition,
            agrees_to_terms: row.agrees_to_terms,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q ApplicationFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(kind) = filter.application_type {
        qb.push(" AND application_type = ");
        qb.push_bind(kind);
    }
    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (");
        qb.push("first_name ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR last_name ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR email ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR phone ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(")");
    }
}

#[async_trait]
impl ApplicationsRepo for PgRepositories {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: OffsetPage,
    ) -> Result<Page<ApplicationRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE 1=1 "
        ));
        apply_filter(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {} {}, id {}",
            filter.sort_by.column(),
            filter.sort_order.as_sql(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<ApplicationRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM applications WHERE 1=1 ");
        apply_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(ApplicationRecord::from).collect();
        Ok(Page::new(records, page, Self::convert_count(total)?))
    }

    async fn find_application(&self, id: i64) -> Result<Option<ApplicationRecord>, RepoError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ApplicationRecord::from))
    }

    async fn create_application(
        &self,
        params: NewApplication,
    ) -> Result<ApplicationRecord, RepoError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "INSERT INTO applications (first_name, last_name, email, phone, application_type, \
             resume_path, nationality, date_of_birth, address_line_1, address_line_2, city, \
             state, zip_code, country, education_level, program_major, languages, \
             available_days, available_times, interests, skills_experience, motivation, \
             emergency_name, emergency_relationship, emergency_phone, reference_name, \
             reference_contact, has_medical_condition, agrees_to_terms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29) \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(params.first_name)
        .bind(params.last_name)
        .bind(params.email)
        .bind(params.phone)
        .bind(params.application_type)
        .bind(params.resume_path)
        .bind(params.nationality)
        .bind(params.date_of_birth)
        .bind(params.address_line_1)
        .bind(params.address_line_2)
        .bind(params.city)
        .bind(params.state)
        .bind(params.zip_code)
        .bind(params.country)
        .bind(params.education_level)
        .bind(params.program_major)
        .bind(params.languages)
        .bind(Json(params.available_days))
        .bind(Json(params.available_times))
        .bind(Json(params.interests))
        .bind(params.skills_experience)
        .bind(params.motivation)
        .bind(params.emergency_name)
        .bind(params.emergency_relationship)
        .bind(params.emergency_phone)
        .bind(params.reference_name)
        .bind(params.reference_contact)
        .bind(params.has_medical_condition)
        .bind(params.agrees_to_terms)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ApplicationRecord::from(row))
    }

    async fn update_application(
        &self,
        id: i64,
        patch: ApplicationPatch,
    ) -> Result<ApplicationRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE applications SET updated_at = now()");

        if let Some(status) = patch.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(admin_notes) = patch.admin_notes {
            qb.push(", admin_notes = ");
            qb.push_bind(admin_notes);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {APPLICATION_COLUMNS}"));

        let row = qb
            .build_query_as::<ApplicationRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ApplicationRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_application(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
