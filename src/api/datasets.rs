//! Dataset management endpoints: folders of uploaded CSV candles.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::services::datasets::DatasetFolder;

use super::{ApiResponse, AppState};

/// GET /api/datasets
async fn list_folders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DatasetFolder>>>> {
    let folders = state.datasets.list_folders()?;
    Ok(Json(ApiResponse::new(folders)))
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// POST /api/datasets
async fn create_folder(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<Json<ApiResponse<DatasetFolder>>> {
    state.datasets.create_folder(&request.name)?;
    let file_count = state.datasets.list_files(&request.name)?.len();

    Ok(Json(ApiResponse::new(DatasetFolder {
        name: request.name,
        file_count,
    })))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub name: String,
}

/// DELETE /api/datasets/:folder
async fn delete_folder(
    State(state): State<AppState>,
    Path(folder): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    state.datasets.delete_folder(&folder)?;
    Ok(Json(ApiResponse::new(DeleteResponse {
        deleted: true,
        name: folder,
    })))
}

/// GET /api/datasets/:folder/files
async fn list_files(
    State(state): State<AppState>,
    Path(folder): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>> {
    let files = state.datasets.list_files(&folder)?;
    Ok(Json(ApiResponse::new(files)))
}

/// Response for an accepted CSV upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub folder: String,
    pub file: String,
    pub rows: usize,
}

/// POST /api/datasets/:folder/files/:file
///
/// Body is raw CSV text. Rejected uploads leave the folder untouched.
async fn upload_file(
    State(state): State<AppState>,
    Path((folder, file)): Path<(String, String)>,
    body: String,
) -> Result<Json<ApiResponse<UploadResponse>>> {
    let rows = state.datasets.save_csv(&folder, &file, &body)?;
    Ok(Json(ApiResponse::new(UploadResponse { folder, file, rows })))
}

/// DELETE /api/datasets/:folder/files/:file
async fn delete_file(
    State(state): State<AppState>,
    Path((folder, file)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    state.datasets.delete_file(&folder, &file)?;
    Ok(Json(ApiResponse::new(DeleteResponse {
        deleted: true,
        name: format!("{}/{}", folder, file),
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_folders))
        .route("/", post(create_folder))
        .route("/:folder", delete(delete_folder))
        .route("/:folder/files", get(list_files))
        .route("/:folder/files/:file", post(upload_file))
        .route("/:folder/files/:file", delete(delete_file))
}
