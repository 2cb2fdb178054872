//! Case CRUD, scoped to the authenticated owner.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use docket_core::{defaults, Case, CaseDetail, CaseInput};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

const MSG_CASE_NOT_FOUND: &str = "Kasus tidak ditemukan";
const MSG_CASE_REQUIRED: &str = "Judul, tanggal, dan tipe kasus harus diisi";

#[derive(Debug, Deserialize)]
pub struct CaseListQuery {
    #[serde(rename = "type")]
    pub case_type: Option<String>,
}

/// Case body as sent by clients. Everything is optional so that missing
/// fields produce a readable 400 instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct CaseBody {
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub case_type: Option<String>,
    pub description: Option<String>,
    pub parties: Option<String>,
    pub witnesses: Option<String>,
    pub prosecutor: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

/// Parse a hearing date.
///
/// Accepts RFC 3339 (converted to server-local time), `YYYY-MM-DDTHH:MM[:SS]`,
/// the same with a space separator, and a bare `YYYY-MM-DD` (midnight).
pub fn parse_case_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CaseBody {
    /// Validate into a [`CaseInput`]; title, date and type are required.
    pub fn into_input(self) -> Result<CaseInput, ApiError> {
        let (Some(title), Some(date), Some(case_type)) = (
            non_blank(self.title),
            non_blank(self.date),
            non_blank(self.case_type),
        ) else {
            return Err(ApiError::bad_request(MSG_CASE_REQUIRED));
        };
        let date = parse_case_date(&date)
            .ok_or_else(|| ApiError::bad_request(format!("Format tanggal tidak valid: {date}")))?;

        Ok(CaseInput {
            title,
            date,
            case_type,
            description: self.description.unwrap_or_default(),
            parties: self.parties.unwrap_or_default(),
            witnesses: self.witnesses.unwrap_or_default(),
            prosecutor: self.prosecutor.unwrap_or_default(),
            status: non_blank(self.status).unwrap_or_else(|| defaults::CASE_STATUS.to_string()),
        })
    }
}

pub async fn list_cases(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CaseListQuery>,
) -> Result<Json<Vec<Case>>, ApiError> {
    let case_type = non_blank(query.case_type);
    let cases = state
        .db
        .cases
        .list_for_owner(claims.user_id, case_type.as_deref())
        .await?;
    Ok(Json(cases))
}

pub async fn get_case(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CaseDetail>, ApiError> {
    state
        .db
        .cases
        .get_detail(id, claims.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(MSG_CASE_NOT_FOUND))
}

pub async fn create_case(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CaseBody>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let input = body.into_input()?;
    let case = state.db.cases.create(claims.user_id, &input).await?;

    info!(
        subsystem = "api",
        component = "cases",
        op = "create",
        case_id = case.id,
        user_id = claims.user_id,
        "Case created"
    );
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn update_case(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CaseBody>,
) -> Result<Json<Case>, ApiError> {
    let input = body.into_input()?;
    let case = state
        .db
        .cases
        .update(id, claims.user_id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_CASE_NOT_FOUND))?;

    info!(
        subsystem = "api",
        component = "cases",
        op = "update",
        case_id = id,
        user_id = claims.user_id,
        "Case updated"
    );
    Ok(Json(case))
}

pub async fn update_case_status(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Case>, ApiError> {
    let status = non_blank(body.status).ok_or_else(|| ApiError::bad_request("Status harus diisi"))?;
    state
        .db
        .cases
        .update_status(id, claims.user_id, &status)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(MSG_CASE_NOT_FOUND))
}

pub async fn delete_case(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.cases.delete(id, claims.user_id).await?;

    info!(
        subsystem = "api",
        component = "cases",
        op = "delete",
        case_id = id,
        user_id = claims.user_id,
        "Case deleted"
    );
    Ok(Json(json!({ "message": "Kasus berhasil dihapus" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(title: &str, date: &str, kind: &str) -> CaseBody {
        CaseBody {
            title: Some(title.into()),
            date: Some(date.into()),
            case_type: Some(kind.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_case_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_case_date("2026-10-17T09:30"), Some(expected));
        assert_eq!(parse_case_date("2026-10-17T09:30:00"), Some(expected));
        assert_eq!(parse_case_date("2026-10-17 09:30:00"), Some(expected));
        assert_eq!(
            parse_case_date("2026-10-17"),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_case_date("2026-10-17T09:30:00+07:00").is_some());
        assert_eq!(parse_case_date("besok"), None);
    }

    #[test]
    fn test_into_input_requires_title_date_type() {
        for incomplete in [
            body("", "2026-10-17", "Pidana"),
            body("Perkara A", " ", "Pidana"),
            body("Perkara A", "2026-10-17", ""),
            CaseBody::default(),
        ] {
            match incomplete.into_input() {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, MSG_CASE_REQUIRED),
                other => panic!("expected 400, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_into_input_defaults() {
        let input = body("Perkara A", "2026-10-17T09:00", "Pidana").into_input().unwrap();
        assert_eq!(input.title, "Perkara A");
        assert_eq!(input.case_type, "Pidana");
        assert_eq!(input.status, "Pending");
        assert_eq!(input.description, "");
    }

    #[test]
    fn test_into_input_rejects_bad_date() {
        assert!(matches!(
            body("Perkara A", "17/10/2026", "Pidana").into_input(),
            Err(ApiError::BadRequest(_))
        ));
    }
}
