//! Volunteer and intern applications: public submission, admin review.

use std::sync::Arc;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

use crate::application::error::AppError;
use crate::application::events::UploadedFile;
use crate::application::pagination::{OffsetPage, Page};
use crate::application::repos::{
    ApplicationFilter, ApplicationPatch, ApplicationSortKey, ApplicationsRepo, NewApplication,
    SortOrder,
};
use crate::application::validate::{
    FieldErrors, looks_like_email, non_blank, parse_date, parse_form_bool,
};
use crate::domain::entities::ApplicationRecord;
use crate::domain::files::FileRule;
use crate::domain::types::{ApplicationStatus, ApplicationType};
use crate::infra::blob::BlobStorage;

const RESUME_PREFIX: &str = "applications/resumes";

#[derive(Debug, Clone, Default)]
pub struct ApplicationListParams {
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Raw submission fields as they arrive on the form.
#[derive(Debug, Clone, Default)]
pub struct ApplicationInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub application_type: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub education_level: Option<String>,
    pub program_major: Option<String>,
    pub languages: Option<String>,
    pub available_days: Vec<String>,
    pub available_times: Vec<String>,
    pub interests: Vec<String>,
    pub skills_experience: Option<String>,
    pub motivation: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_relationship: Option<String>,
    pub emergency_phone: Option<String>,
    pub reference_name: Option<String>,
    pub reference_contact: Option<String>,
    pub has_medical_condition: Option<String>,
    pub agrees_to_terms: Option<String>,
    pub resume: Option<UploadedFile>,
}

pub struct ApplicationService {
    repo: Arc<dyn ApplicationsRepo>,
    blobs: Arc<BlobStorage>,
}

impl ApplicationService {
    pub fn new(repo: Arc<dyn ApplicationsRepo>, blobs: Arc<BlobStorage>) -> Self {
        Self { repo, blobs }
    }

    pub fn resolve_filter(
        params: &ApplicationListParams,
    ) -> Result<(ApplicationFilter, OffsetPage), AppError> {
        let mut errors = FieldErrors::new();

        let status = match non_blank(params.status.as_deref()) {
            Some(raw) => match ApplicationStatus::try_from(raw) {
                Ok(status) => Some(status),
                Err(()) => {
                    errors.add("status", "must be one of pending, approved, rejected");
                    None
                }
            },
            None => None,
        };

        let application_type = match non_blank(params.application_type.as_deref()) {
            Some(raw) => match ApplicationType::try_from(raw) {
                Ok(kind) => Some(kind),
                Err(()) => {
                    errors.add("application_type", "must be `volunteer` or `intern`");
                    None
                }
            },
            None => None,
        };

        let sort_by = match non_blank(params.sort_by.as_deref()) {
            Some(raw) => match ApplicationSortKey::try_from(raw) {
                Ok(key) => key,
                Err(()) => {
                    errors.add("sort_by", "is not a sortable column");
                    ApplicationSortKey::CreatedAt
                }
            },
            None => ApplicationSortKey::CreatedAt,
        };

        let sort_order = match non_blank(params.sort_order.as_deref()) {
            Some(raw) => match SortOrder::try_from(raw) {
                Ok(order) => order,
                Err(()) => {
                    errors.add("sort_order", "must be `asc` or `desc`");
                    SortOrder::Desc
                }
            },
            None => SortOrder::Desc,
        };

        errors.into_result().map_err(AppError::validation)?;

        let filter = ApplicationFilter {
            status,
            application_type,
            search: non_blank(params.search.as_deref()).map(str::to_string),
            sort_by,
            sort_order,
        };
        Ok((filter, OffsetPage::new(params.page, params.per_page)))
    }

    pub async fn list(
        &self,
        filter: &ApplicationFilter,
        page: OffsetPage,
    ) -> Result<Page<ApplicationRecord>, AppError> {
        Ok(self.repo.list_applications(filter, page).await?)
    }

    pub async fn get(&self, id: i64) -> Result<ApplicationRecord, AppError> {
        self.repo
            .find_application(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Public submission endpoint. Every required field is checked before
    /// anything is written, so a rejected submission leaves no blob behind.
    pub async fn submit(&self, input: ApplicationInput) -> Result<ApplicationRecord, AppError> {
        let mut errors = FieldErrors::new();

        let first_name = require(&mut errors, "first_name", input.first_name.as_deref());
        let last_name = require(&mut errors, "last_name", input.last_name.as_deref());
        let phone = require(&mut errors, "phone", input.phone.as_deref());
        let country = require(&mut errors, "country", input.country.as_deref());

        let email = match non_blank(input.email.as_deref()) {
            Some(value) if looks_like_email(value) => Some(value.to_string()),
            Some(_) => {
                errors.add("email", "must be a valid email address");
                None
            }
            None => {
                errors.add("email", "is required");
                None
            }
        };

        let application_type = match non_blank(input.application_type.as_deref()) {
            Some(raw) => match ApplicationType::try_from(raw) {
                Ok(kind) => Some(kind),
                Err(()) => {
                    errors.add("application_type", "must be `volunteer` or `intern`");
                    None
                }
            },
            None => {
                errors.add("application_type", "is required");
                None
            }
        };

        let date_of_birth = match non_blank(input.date_of_birth.as_deref()) {
            Some(raw) => match parse_date(raw) {
                Some(date) if date < OffsetDateTime::now_utc().date() => Some(date),
                Some(_) => {
                    errors.add("date_of_birth", "must be before today");
                    None
                }
                None => {
                    errors.add("date_of_birth", "must be a valid date (YYYY-MM-DD)");
                    None
                }
            },
            None => {
                errors.add("date_of_birth", "is required");
                None
            }
        };

        let available_days = clean_list(input.available_days);
        let available_times = clean_list(input.available_times);
        let interests = clean_list(input.interests);
        for (field, values) in [
            ("available_days", &available_days),
            ("available_times", &available_times),
            ("interests", &interests),
        ] {
            if values.is_empty() {
                errors.add(field, "is required");
            }
        }

        let has_medical_condition = parse_bool_field(
            &mut errors,
            "has_medical_condition",
            input.has_medical_condition.as_deref(),
        )
        .unwrap_or(false);

        let agrees_to_terms = match parse_bool_field(
            &mut errors,
            "agrees_to_terms",
            input.agrees_to_terms.as_deref(),
        ) {
            Some(true) => true,
            Some(false) => {
                errors.add("agrees_to_terms", "must be accepted");
                false
            }
            None => {
                errors.add("agrees_to_terms", "is required");
                false
            }
        };

        match input.resume.as_ref() {
            Some(file) => {
                if let Err(reason) =
                    FileRule::pdf().check(&file.filename, &file.content_type, file.size())
                {
                    errors.add("resume", reason);
                }
            }
            None => errors.add("resume", "is required"),
        }

        errors.into_result().map_err(AppError::validation)?;

        let resume_path = match input.resume {
            Some(file) => {
                let stored = self
                    .blobs
                    .store(RESUME_PREFIX, &file.filename, file.data.clone())
                    .await
                    .map_err(|err| {
                        AppError::unexpected(format!("failed to store resume: {err}"))
                    })?;
                Some(stored.stored_path)
            }
            None => None,
        };

        let application = self
            .repo
            .create_application(NewApplication {
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                application_type: application_type.expect("validated above"),
                resume_path,
                nationality: optional(input.nationality.as_deref()),
                date_of_birth: date_of_birth.expect("validated above"),
                address_line_1: optional(input.address_line_1.as_deref()),
                address_line_2: optional(input.address_line_2.as_deref()),
                city: optional(input.city.as_deref()),
                state: optional(input.state.as_deref()),
                zip_code: optional(input.zip_code.as_deref()),
                country: country.unwrap_or_default(),
                education_level: optional(input.education_level.as_deref()),
                program_major: optional(input.program_major.as_deref()),
                languages: optional(input.languages.as_deref()),
                available_days,
                available_times,
                interests,
                skills_experience: optional(input.skills_experience.as_deref()),
                motivation: optional(input.motivation.as_deref()),
                emergency_name: optional(input.emergency_name.as_deref()),
                emergency_relationship: optional(input.emergency_relationship.as_deref()),
                emergency_phone: optional(input.emergency_phone.as_deref()),
                reference_name: optional(input.reference_name.as_deref()),
                reference_contact: optional(input.reference_contact.as_deref()),
                has_medical_condition,
                agrees_to_terms,
            })
            .await?;

        info!(
            target = "lanterna::applications",
            application_id = application.id,
            kind = application.application_type.as_str(),
            "application submitted"
        );

        Ok(application)
    }

    pub async fn update(
        &self,
        id: i64,
        status: Option<&str>,
        admin_notes: Option<&str>,
    ) -> Result<ApplicationRecord, AppError> {
        self.repo
            .find_application(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let raw = non_blank(status)
            .ok_or_else(|| AppError::validation_message("status", "is required"))?;
        let status = ApplicationStatus::try_from(raw).map_err(|()| {
            AppError::validation_message("status", "must be one of pending, approved, rejected")
        })?;

        let mut patch = ApplicationPatch {
            status: Some(status),
            ..Default::default()
        };
        if let Some(notes) = admin_notes {
            patch.admin_notes = Some(notes.to_string());
        }

        Ok(self.repo.update_application(id, patch).await?)
    }

    pub async fn approve(&self, id: i64) -> Result<ApplicationRecord, AppError> {
        self.decide(id, ApplicationStatus::Approved, "Approved").await
    }

    pub async fn reject(&self, id: i64) -> Result<ApplicationRecord, AppError> {
        self.decide(id, ApplicationStatus::Rejected, "Rejected").await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let existing = self
            .repo
            .find_application(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(path) = existing.resume_path.as_deref() {
            self.blobs.delete_quietly(path).await;
        }

        self.repo.delete_application(id).await?;
        info!(target = "lanterna::applications", application_id = id, "application deleted");

        Ok(())
    }

    /// Record a decision, appending a timestamped note while preserving
    /// everything already written.
    async fn decide(
        &self,
        id: i64,
        status: ApplicationStatus,
        verb: &str,
    ) -> Result<ApplicationRecord, AppError> {
        let existing = self
            .repo
            .find_application(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let stamp = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(|err| AppError::unexpected(format!("failed to format timestamp: {err}")))?;

        let note = format!("{verb} on {stamp}");
        let admin_notes = if existing.admin_notes.trim().is_empty() {
            note
        } else {
            format!("{}\n\n{note}", existing.admin_notes)
        };

        let application = self
            .repo
            .update_application(
                id,
                ApplicationPatch {
                    status: Some(status),
                    admin_notes: Some(admin_notes),
                },
            )
            .await?;

        info!(
            target = "lanterna::applications",
            application_id = id,
            status = application.status.as_str(),
            "application decision recorded"
        );

        Ok(application)
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    match non_blank(value) {
        Some(text) => Some(text.to_string()),
        None => {
            errors.add(field, "is required");
            None
        }
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

fn parse_bool_field(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<bool> {
    match non_blank(raw) {
        Some(value) => match parse_form_bool(value) {
            Some(parsed) => Some(parsed),
            None => {
                errors.add(field, "must be `true` or `false`");
                None
            }
        },
        None => None,
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
