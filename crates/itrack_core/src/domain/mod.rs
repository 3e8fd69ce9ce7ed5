use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Ordered urgency classification. SEV1 is the most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Sev1,
    Sev2,
    Sev3,
    Sev4,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Sev1,
        Severity::Sev2,
        Severity::Sev3,
        Severity::Sev4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Sev1 => "SEV1",
            Severity::Sev2 => "SEV2",
            Severity::Sev3 => "SEV3",
            Severity::Sev4 => "SEV4",
        }
    }

    /// Sort rank used for severity ordering. Kept independent of both the textual form and
    /// the declaration order above.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Sev1 => 1,
            Severity::Sev2 => 2,
            Severity::Sev3 => 3,
            Severity::Sev4 => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

/// Lifecycle state. Transitions are unrestricted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Open,
    Mitigated,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Open, Status::Mitigated, Status::Resolved];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::Mitigated => "MITIGATED",
            Status::Resolved => "RESOLVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::parse(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unexpected {} value: {s}", stringify!($ty)).into())
                })
            }
        }
    };
}

text_enum_sql!(Severity);
text_enum_sql!(Status);

/// Service names offered to clients as suggestions. Writes accept any non-empty service.
pub const KNOWN_SERVICES: [&str; 10] = [
    "Auth",
    "Payments",
    "Backend",
    "Frontend",
    "Database",
    "API Gateway",
    "Notifications",
    "Search",
    "Analytics",
    "CDN",
];

/// Persisted incident record. Timestamps are `YYYY-MM-DD HH:MM:SS` UTC text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub service: String,
    pub severity: Severity,
    pub status: Status,
    pub owner: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A validated create payload with text already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
    pub title: String,
    pub service: String,
    pub severity: Severity,
    pub status: Status,
    pub owner: Option<String>,
    pub summary: Option<String>,
}

impl NewIncident {
    pub fn into_incident(self, id: String, now: String) -> Incident {
        Incident {
            id,
            title: self.title,
            service: self.service,
            severity: self.severity,
            status: self.status,
            owner: self.owner,
            summary: self.summary,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A validated partial update. `None` leaves the stored value untouched; for the optional
/// text fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub service: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub owner: Option<Option<String>>,
    pub summary: Option<Option<String>>,
}

impl IncidentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.service.is_none()
            && self.severity.is_none()
            && self.status.is_none()
            && self.owner.is_none()
            && self.summary.is_none()
    }

    /// Returns the record as it looks after the patch. Identity and `created_at` never change.
    pub fn apply(&self, existing: &Incident, updated_at: String) -> Incident {
        Incident {
            id: existing.id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            service: self
                .service
                .clone()
                .unwrap_or_else(|| existing.service.clone()),
            severity: self.severity.unwrap_or(existing.severity),
            status: self.status.unwrap_or(existing.status),
            owner: self.owner.clone().unwrap_or_else(|| existing.owner.clone()),
            summary: self
                .summary
                .clone()
                .unwrap_or_else(|| existing.summary.clone()),
            created_at: existing.created_at.clone(),
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Incident {
        Incident {
            id: "abc".to_string(),
            title: "DB down".to_string(),
            service: "Database".to_string(),
            severity: Severity::Sev1,
            status: Status::Open,
            owner: Some("ops@team.com".to_string()),
            summary: None,
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn severity_rank_is_explicit() {
        let ranks: Vec<u8> = Severity::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(Severity::parse("SEV3"), Some(Severity::Sev3));
        assert_eq!(Severity::parse("sev3"), None);
    }

    #[test]
    fn enums_serialize_as_wire_strings() {
        assert_eq!(serde_json::to_string(&Severity::Sev2).unwrap(), "\"SEV2\"");
        assert_eq!(
            serde_json::to_string(&Status::Mitigated).unwrap(),
            "\"MITIGATED\""
        );
    }

    #[test]
    fn patch_leaves_absent_fields_untouched() {
        let existing = sample();
        let patch = IncidentPatch {
            status: Some(Status::Resolved),
            ..Default::default()
        };
        let next = patch.apply(&existing, "2026-01-02 00:00:00".to_string());

        assert_eq!(next.status, Status::Resolved);
        assert_eq!(next.title, existing.title);
        assert_eq!(next.owner, existing.owner);
        assert_eq!(next.created_at, existing.created_at);
        assert_eq!(next.updated_at, "2026-01-02 00:00:00");
    }

    #[test]
    fn patch_can_clear_optional_text() {
        let existing = sample();
        let patch = IncidentPatch {
            owner: Some(None),
            ..Default::default()
        };
        let next = patch.apply(&existing, existing.updated_at.clone());
        assert_eq!(next.owner, None);
        assert!(!patch.is_empty());
        assert!(IncidentPatch::default().is_empty());
    }
}
