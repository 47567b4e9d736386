//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "journal_status", rename_all = "snake_case")]
pub enum JournalStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "application_type", rename_all = "snake_case")]
pub enum ApplicationType {
    Volunteer,
    Intern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "contact_status", rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    Replied,
    Closed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl JournalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalStatus::Draft => "draft",
            JournalStatus::Published => "published",
        }
    }
}

impl ApplicationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationType::Volunteer => "volunteer",
            ApplicationType::Intern => "intern",
        }
    }
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Replied => "replied",
            ContactStatus::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            _ => Err(()),
        }
    }
}

impl TryFrom<&str> for JournalStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(JournalStatus::Draft),
            "published" => Ok(JournalStatus::Published),
            _ => Err(()),
        }
    }
}

impl TryFrom<&str> for ApplicationType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "volunteer" => Ok(ApplicationType::Volunteer),
            "intern" => Ok(ApplicationType::Intern),
            _ => Err(()),
        }
    }
}

impl TryFrom<&str> for ApplicationStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(()),
        }
    }
}

impl TryFrom<&str> for ContactStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "new" => Ok(ContactStatus::New),
            "replied" => Ok(ContactStatus::Replied),
            "closed" => Ok(ContactStatus::Closed),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_status_roundtrip() {
        for raw in ["draft", "published", "cancelled"] {
            let status = EventStatus::try_from(raw).expect("known status");
            assert_eq!(status.as_str(), raw);
        }
        assert!(EventStatus::try_from("archived").is_err());
    }

    #[test]
    fn closed_enums_reject_unknown_values() {
        assert!(ContactStatus::try_from("spam").is_err());
        assert!(ApplicationStatus::try_from("waitlisted").is_err());
        assert!(JournalStatus::try_from("cancelled").is_err());
        assert!(ApplicationType::try_from("employee").is_err());
    }
}
