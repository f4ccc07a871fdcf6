use anyhow::anyhow;
use gpui::{App, Task};
use serde::{Deserialize, Serialize};

use crate::RowId;

/// Notice shown once the server has accepted a move.
pub const MOVE_SAVED_NOTICE: &str = "New position saved.";

/// The single request issued when a drag is dropped on a new position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

impl MoveRequest {
    /// The request as form fields, absent ids omitted.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("subjectId", self.subject_id.clone())];
        if let Some(id) = &self.previous_sibling_id {
            fields.push(("previousSiblingId", id.clone()));
        }
        if let Some(id) = &self.parent_id {
            fields.push(("parentId", id.clone()));
        }
        if let Some(site) = &self.site {
            fields.push(("site", site.clone()));
        }
        fields
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MoveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Turn an unsuccessful response into an error carrying the server's message.
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.success {
            return Ok(());
        }
        Err(anyhow!(
            self.message
                .unwrap_or_else(|| "the server rejected the move".to_string())
        ))
    }
}

/// Where move requests go.
pub trait CommitSink {
    fn submit(&self, request: MoveRequest, cx: &mut App) -> Task<anyhow::Result<MoveResponse>>;
}

impl<F> CommitSink for F
where
    F: Fn(MoveRequest, &mut App) -> Task<anyhow::Result<MoveResponse>>,
{
    fn submit(&self, request: MoveRequest, cx: &mut App) -> Task<anyhow::Result<MoveResponse>> {
        self(request, cx)
    }
}

/// Looks up the depth of a subtree whose rows are not all loaded yet.
pub trait LevelDeltaSource {
    fn level_delta(&self, id: RowId, cx: &mut App) -> Task<anyhow::Result<usize>>;
}

impl<F> LevelDeltaSource for F
where
    F: Fn(RowId, &mut App) -> Task<anyhow::Result<usize>>,
{
    fn level_delta(&self, id: RowId, cx: &mut App) -> Task<anyhow::Result<usize>> {
        self(id, cx)
    }
}

/// How a committed move ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Saved. `expand` is the new parent if it was collapsed and should be opened.
    Saved {
        request: MoveRequest,
        expand: Option<RowId>,
    },
    /// The move was rejected or never reached the server. The rows keep their new position.
    Failed { request: MoveRequest, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MoveRequest {
        MoveRequest {
            subject_id: "12".into(),
            previous_sibling_id: None,
            parent_id: Some("7".into()),
            site: Some("en-us".into()),
        }
    }

    #[test]
    fn serializes_camel_case_without_absent_ids() {
        let json = serde_json::to_string(&request()).unwrap();
        assert_eq!(json, r#"{"subjectId":"12","parentId":"7","site":"en-us"}"#);
        let back: MoveRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request());
    }

    #[test]
    fn form_fields_skip_absent_ids() {
        assert_eq!(
            request().form_fields(),
            vec![
                ("subjectId", "12".to_string()),
                ("parentId", "7".to_string()),
                ("site", "en-us".to_string())
            ]
        );
    }

    #[test]
    fn unsuccessful_response_is_an_error() {
        assert!(MoveResponse::ok().into_result().is_ok());

        let response = MoveResponse::from_json(r#"{"success":false,"message":"locked"}"#).unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.to_string(), "locked");

        let err = MoveResponse::from_json(r#"{"success":false}"#)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "the server rejected the move");
    }
}
