//! Mail folder handlers: list (projected), create, rename, delete.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::server::AppState;
use super::types::{require_field, require_token, CreateFolderRequest, DeleteFolderRequest, RenameFolderRequest, TokenRequest};
use crate::error::Result;

/// Handle POST /api/folders
pub async fn list_folders(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<Value>> {
    let token = request.require_token()?;

    let payload = state.graph.list_folders(token).await?;
    let value: Vec<Value> = payload
        .get("value")
        .and_then(Value::as_array)
        .map(|folders| folders.iter().map(project_folder).collect())
        .unwrap_or_default();

    Ok(Json(json!({
        "@odata.context": payload.get("@odata.context").cloned().unwrap_or(Value::Null),
        "value": value,
    })))
}

/// The folder fields the browser client consumes.
fn project_folder(folder: &Value) -> Value {
    json!({
        "id": folder.get("id").cloned().unwrap_or(Value::Null),
        "displayName": folder.get("displayName").cloned().unwrap_or(Value::Null),
        "parentFolderId": folder.get("parentFolderId").cloned().unwrap_or(Value::Null),
        "childFolderCount": folder.get("childFolderCount").cloned().unwrap_or(Value::Null),
        "unreadItemCount": folder.get("unreadItemCount").cloned().unwrap_or(Value::Null),
        "totalItemCount": folder.get("totalItemCount").cloned().unwrap_or(Value::Null),
        "sizeInBytes": folder.get("sizeInBytes").cloned().unwrap_or(Value::Null),
        "isHidden": folder.get("isHidden").cloned().unwrap_or(Value::Null),
    })
}

/// Handle POST /api/folders/create
pub async fn create_folder(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let name = require_field(request.display_name.as_deref(), "Folder name is required")?;

    state.graph.create_folder(token, name).await?;

    Ok(Json(json!({ "message": "Folder created successfully" })))
}

/// Handle POST /api/folders/rename
pub async fn rename_folder(
    State(state): State<AppState>,
    Json(request): Json<RenameFolderRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let folder_id = require_field(request.folder_id.as_deref(), "Folder ID is required")?;
    let name = require_field(request.display_name.as_deref(), "Folder name is required")?;

    state.graph.rename_folder(token, folder_id, name).await?;

    Ok(Json(json!({ "message": "Folder renamed successfully" })))
}

/// Handle POST /api/folders/delete
pub async fn delete_folder(
    State(state): State<AppState>,
    Json(request): Json<DeleteFolderRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let folder_id = require_field(request.folder_id.as_deref(), "Folder ID is required")?;

    state.graph.delete_folder(token, folder_id).await?;

    Ok(Json(json!({ "message": "Folder deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_folder_keeps_known_fields() {
        let folder = json!({
            "id": "f1",
            "displayName": "Inbox",
            "parentFolderId": "root",
            "childFolderCount": 2,
            "unreadItemCount": 5,
            "totalItemCount": 40,
            "sizeInBytes": 12345,
            "isHidden": false,
            "wellKnownName": "inbox"
        });

        let projected = project_folder(&folder);
        assert_eq!(projected["displayName"], "Inbox");
        assert_eq!(projected["unreadItemCount"], 5);
        // Fields outside the projection are dropped
        assert!(projected.get("wellKnownName").is_none());
    }

    #[test]
    fn test_project_folder_missing_fields_are_null() {
        let projected = project_folder(&json!({ "id": "f1" }));
        assert_eq!(projected["displayName"], Value::Null);
    }
}
