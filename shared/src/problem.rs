use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A reported urban problem as returned by the backend.
///
/// Every field but `id` is optional on the wire: the list endpoint is allowed to
/// omit coordinates, in which case the problem is kept but never drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "descricao")]
    pub description: String,
    #[serde(default, alias = "categoria_id")]
    pub category_id: Option<i64>,
    #[serde(default, alias = "protocolo")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default, alias = "endereco")]
    pub address: Option<String>,
    #[serde(default, alias = "criado_em")]
    pub created_at: Option<String>,
}

impl Problem {
    /// The map position, only when both components are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn status(&self) -> ProblemStatus {
        self.status_id
            .map(ProblemStatus::from_id)
            .unwrap_or(ProblemStatus::Unknown)
    }

    /// Creation time, accepting both RFC 3339 and the naive timestamps the backend emits.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
}

/// Category labels keyed by id, rebuilt whenever the category list is refetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    labels: HashMap<i64, String>,
}

impl CategoryIndex {
    pub fn build(categories: &[Category]) -> Self {
        Self {
            labels: categories
                .iter()
                .map(|category| (category.id, category.name.clone()))
                .collect(),
        }
    }

    pub fn label(&self, id: Option<i64>) -> Option<&str> {
        id.and_then(|id| self.labels.get(&id)).map(String::as_str)
    }
}

/// Workflow status of a problem, as numbered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemStatus {
    Pending,
    UnderReview,
    InProgress,
    Resolved,
    Cancelled,
    Unknown,
}

impl ProblemStatus {
    pub fn from_id(id: i64) -> Self {
        match id {
            1 => Self::Pending,
            2 => Self::UnderReview,
            3 => Self::InProgress,
            4 => Self::Resolved,
            5 => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::UnderReview => "Under review",
            Self::InProgress => "In progress",
            Self::Resolved => "Resolved",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_field_names() {
        let json = r#"{
            "id": 7,
            "descricao": "Buraco na rua",
            "latitude": -29.16,
            "longitude": -51.18,
            "categoria_id": 2,
            "usuario_id": 3,
            "status_id": 1,
            "endereco": "Rua Sinimbu, 100",
            "protocolo": "2025-00007",
            "criado_em": "2025-03-01T12:30:00"
        }"#;
        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.description, "Buraco na rua");
        assert_eq!(problem.category_id, Some(2));
        assert_eq!(problem.protocol.as_deref(), Some("2025-00007"));
        assert_eq!(problem.status(), ProblemStatus::Pending);
        assert_eq!(
            problem.created_at_utc().map(|dt| dt.timestamp()),
            Some(1_740_832_200)
        );
    }

    #[test]
    fn missing_coordinates_deserialize_as_none() {
        let problem: Problem =
            serde_json::from_str(r#"{"id": 1, "latitude": null, "description": "x"}"#).unwrap();
        assert_eq!(problem.latitude, None);
        assert_eq!(problem.longitude, None);
        assert_eq!(problem.coordinate(), None);
    }

    #[test]
    fn coordinate_requires_both_components() {
        let mut problem: Problem = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        problem.latitude = Some(1.0);
        assert_eq!(problem.coordinate(), None);
        problem.longitude = Some(2.0);
        assert_eq!(problem.coordinate(), Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn category_index_resolves_labels() {
        let categories: Vec<Category> = serde_json::from_str(
            r#"[{"id": 1, "nome": "Coleta de lixo"}, {"id": 2, "name": "Iluminação"}]"#,
        )
        .unwrap();
        let index = CategoryIndex::build(&categories);
        assert_eq!(index.label(Some(1)), Some("Coleta de lixo"));
        assert_eq!(index.label(Some(2)), Some("Iluminação"));
        assert_eq!(index.label(Some(3)), None);
        assert_eq!(index.label(None), None);
    }

    #[test]
    fn unknown_status_ids_map_to_unknown() {
        assert_eq!(ProblemStatus::from_id(4), ProblemStatus::Resolved);
        assert_eq!(ProblemStatus::from_id(42).label(), "Unknown");
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let problem: Problem =
            serde_json::from_str(r#"{"id": 1, "created_at": "2025-03-01T12:30:00Z"}"#).unwrap();
        assert_eq!(
            problem.created_at_utc().map(|dt| dt.timestamp()),
            Some(1_740_832_200)
        );
    }
}
