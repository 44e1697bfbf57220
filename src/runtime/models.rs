/// A container as listed by the runtime (`GET /containers/json`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
    /// Creation time in UNIX epoch seconds.
    #[serde(default)]
    pub created: i64,
}

/// Error document returned by the runtime for non-success responses.
#[derive(Debug, serde::Deserialize)]
pub(super) struct ErrorMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_list() {
        let data = r#"[{
            "Id": "8dfafdbc3a40",
            "Names": ["/boring_feynman"],
            "Image": "ubuntu:latest",
            "ImageID": "sha256:d74508fb6632",
            "Command": "echo 1",
            "Created": 1367854155,
            "State": "running",
            "Status": "Up 2 hours"
        }]"#;
        let containers: Vec<ContainerSummary> = serde_json::from_str(data).unwrap();
        assert_eq!(
            containers,
            vec![ContainerSummary {
                id: "8dfafdbc3a40".to_owned(),
                names: vec!["/boring_feynman".to_owned()],
                image: "ubuntu:latest".to_owned(),
                state: "running".to_owned(),
                created: 1_367_854_155,
            }]
        );
    }
}
