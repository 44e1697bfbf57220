use crate::runtime::ContainerSummary;

const CREATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A running container as exposed by `GET /containers`.
#[derive(Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerProperties {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub status: String,
    /// Creation time as `YYYY-MM-DD HH:MM:SS` in UTC.
    pub creation_date: String,
}

impl From<ContainerSummary> for ContainerProperties {
    fn from(value: ContainerSummary) -> Self {
        let creation_date = chrono::DateTime::from_timestamp(value.created, 0)
            .map(|created| created.format(CREATION_DATE_FORMAT).to_string())
            .unwrap_or_default();

        Self {
            id: value.id,
            names: value
                .names
                .into_iter()
                .map(|name| name.replace('/', ""))
                .collect(),
            image: value.image,
            status: value.state,
            creation_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_container_summary() {
        let summary = ContainerSummary {
            id: "8dfafdbc3a40".to_owned(),
            names: vec!["/boring_feynman".to_owned(), "/web/db".to_owned()],
            image: "ubuntu:latest".to_owned(),
            state: "running".to_owned(),
            created: 1_367_854_155,
        };
        let properties = ContainerProperties::from(summary);

        assert_eq!(properties.names, ["boring_feynman", "webdb"]);
        assert_eq!(properties.status, "running");
        assert_eq!(properties.creation_date, "2013-05-06 15:29:15");
    }

    #[test]
    fn test_json_field_names() {
        let properties = ContainerProperties {
            id: "abc".to_owned(),
            names: vec!["web".to_owned()],
            image: "nginx".to_owned(),
            status: "running".to_owned(),
            creation_date: "2024-01-01 00:00:00".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(properties).unwrap(),
            serde_json::json!({
                "Id": "abc",
                "Names": ["web"],
                "Image": "nginx",
                "Status": "running",
                "CreationDate": "2024-01-01 00:00:00",
            })
        );
    }
}
