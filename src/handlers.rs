use crate::config::Config;
use crate::crm_client::CrmClient;
use crate::enrollment::{plan_links, StudentEnrollment, CONTACTS};
use crate::errors::{AppError, ResultExt};
use crate::models::{AcademicYear, AcademicYearRow, AccountRequest, CreatedResponse};
use crate::parent_links::{ParentLinkStore, ParentRole, DEFAULT_SESSION, SESSION_HEADER};
use crate::validation::{
    missing_fields, PARENT_REQUIRED_FIELDS, STUDENT_REQUIRED_FIELDS, TEACHER_REQUIRED_FIELDS,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

const ACADEMIC_YEARS_FETCH_XML: &str = r#"<fetch version="1.0" output-format="xml-platform" mapping="logical" distinct="false">
    <entity name="new_academicyear">
        <attribute name="new_academicyearid" />
        <attribute name="new_name" />
        <attribute name="statecode" />
        <order attribute="new_name" descending="false" />
        <filter type="and">
            <condition attribute="statecode" operator="eq" value="0" />
        </filter>
    </entity>
</fetch>"#;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the CRM Web API, including its token cache.
    pub crm: CrmClient,
    /// Parents remembered per session for the next student.
    pub parent_links: ParentLinkStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        config
            .validate_limits()
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        let crm = CrmClient::new(&config)?;
        let parent_links = ParentLinkStore::new(std::time::Duration::from_secs(
            config.parent_link_ttl_secs,
        ));
        Ok(Self {
            config,
            crm,
            parent_links,
        })
    }
}

type Created = (StatusCode, Json<CreatedResponse>);

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "crm-account-gateway",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/create-account-teacher
pub async fn create_teacher(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AccountRequest>,
) -> Result<Created, AppError> {
    tracing::info!("Request body received for teacher: {:?}", request);

    let missing = missing_fields(&request, TEACHER_REQUIRED_FIELDS);
    if !missing.is_empty() {
        tracing::info!("Missing fields: {:?}", missing);
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            TEACHER_REQUIRED_FIELDS.join(", ")
        )));
    }

    let created = state
        .crm
        .create_entity(&request, CONTACTS)
        .await
        .context("Failed to create teacher")?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Teacher created successfully".to_string(),
            data: created,
        }),
    ))
}

/// POST /api/create-account-student
///
/// Creates the contact, then links its academic year and any known parents.
/// Parents come from `fatherId`/`motherId` in the body or, failing that, from
/// the parents recorded earlier in the same session.
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AccountRequest>,
) -> Result<Created, AppError> {
    tracing::info!("Request body received for student: {:?}", request);

    let missing = missing_fields(&request, STUDENT_REQUIRED_FIELDS);
    if !missing.is_empty() {
        tracing::info!("Missing fields: {:?}", missing);
        return Err(AppError::BadRequest(
            "Missing required fields for student".to_string(),
        ));
    }

    let session = session_key(&headers);
    let remembered = state.parent_links.parents(&session).await;
    let links = plan_links(&request, &remembered)?;

    let created = StudentEnrollment::new(&state.crm, state.config.rollback_on_link_failure)
        .run(&request, &links)
        .await
        .context("Failed to create student")?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Student created successfully".to_string(),
            data: created,
        }),
    ))
}

/// POST /api/create-account-parent
///
/// A `gendercode` of "1" records the new contact as the session's father,
/// "2" as its mother.
pub async fn create_parent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AccountRequest>,
) -> Result<Created, AppError> {
    tracing::info!("Request body received for parent: {:?}", request);

    let missing = missing_fields(&request, PARENT_REQUIRED_FIELDS);
    if !missing.is_empty() {
        tracing::info!("Missing fields: {:?}", missing);
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let created = state
        .crm
        .create_entity(&request, CONTACTS)
        .await
        .context("Failed to create parent")?;

    match ParentRole::from_gendercode(request.gendercode.as_ref()) {
        Some(role) => {
            state
                .parent_links
                .set_parent(&session_key(&headers), role, created.guid.to_string())
                .await;
        }
        None => tracing::debug!(
            "Parent {} has gendercode {:?}; not remembered",
            created.guid,
            request.gendercode
        ),
    }

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Parent created successfully".to_string(),
            data: created,
        }),
    ))
}

/// GET /api/academic-years
///
/// Active academic years, in the order the CRM sorted them by name.
pub async fn academic_years(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AcademicYear>>, AppError> {
    let rows: Vec<AcademicYearRow> = state
        .crm
        .fetch_xml("new_academicyears", ACADEMIC_YEARS_FETCH_XML)
        .await
        .map_err(|e| {
            tracing::error!("Error fetching academic years: {}", e);
            AppError::Unavailable("Failed to fetch academic years".to_string())
        })?;

    // Rows keep the CRM's collation order from the fetchXml `<order>`.
    let years: Vec<AcademicYear> = rows
        .into_iter()
        .filter(AcademicYearRow::is_active)
        .map(AcademicYear::from)
        .collect();

    Ok(Json(years))
}

fn session_key(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}
