//! Student creation as one logical operation: create the contact, then link
//! its academic year and parents. When a link fails the contact can be
//! deleted again so the CRM is not left with a half-linked student.

use crate::crm_client::{CrmClient, LookupLink};
use crate::errors::AppError;
use crate::models::{AccountRequest, CreatedEntity};
use crate::parent_links::{ParentLinks, ParentRole};
use crate::validation::id_string;

pub const CONTACTS: &str = "contacts";
pub const ACADEMIC_YEARS: &str = "new_academicyears";
pub const ACADEMIC_YEAR_LOOKUP: &str = "new_AcademicYearlookup";

/// One `@odata.bind` the student needs after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub lookup_field: &'static str,
    pub target_entity_set: &'static str,
    pub target_id: String,
}

/// Works out the links for a student in execution order: academic year,
/// then father, then mother. Parent ids sent with the request win over the
/// ones remembered for the session.
pub fn plan_links(
    request: &AccountRequest,
    remembered: &ParentLinks,
) -> Result<Vec<PlannedLink>, AppError> {
    let academic_year = request
        .academic_year_id
        .as_ref()
        .and_then(id_string)
        .ok_or_else(|| {
            AppError::BadRequest("academicYearId must be a record identifier".to_string())
        })?;

    let mut links = vec![PlannedLink {
        lookup_field: ACADEMIC_YEAR_LOOKUP,
        target_entity_set: ACADEMIC_YEARS,
        target_id: academic_year,
    }];

    for (role, field, explicit) in [
        (ParentRole::Father, "fatherId", &request.father_id),
        (ParentRole::Mother, "motherId", &request.mother_id),
    ] {
        let parent = match explicit {
            Some(value) => Some(id_string(value).ok_or_else(|| {
                AppError::BadRequest(format!("{} must be a record identifier", field))
            })?),
            None => remembered.get(role).map(str::to_string),
        };

        if let Some(target_id) = parent {
            links.push(PlannedLink {
                lookup_field: role.lookup_field(),
                target_entity_set: CONTACTS,
                target_id,
            });
        }
    }

    Ok(links)
}

pub struct StudentEnrollment<'a> {
    crm: &'a CrmClient,
    rollback_on_failure: bool,
}

impl<'a> StudentEnrollment<'a> {
    pub fn new(crm: &'a CrmClient, rollback_on_failure: bool) -> Self {
        Self {
            crm,
            rollback_on_failure,
        }
    }

    /// Creates the student and applies `links` in order, stopping at the
    /// first failure.
    pub async fn run(
        &self,
        request: &AccountRequest,
        links: &[PlannedLink],
    ) -> Result<CreatedEntity, AppError> {
        let created = self.crm.create_entity(request, CONTACTS).await?;
        let student_id = created.guid.to_string();

        for link in links {
            let outcome = self
                .crm
                .link_lookup(LookupLink {
                    entity_set: CONTACTS,
                    entity_id: &student_id,
                    lookup_field: link.lookup_field,
                    target_entity_set: link.target_entity_set,
                    target_id: &link.target_id,
                })
                .await;

            if let Err(err) = outcome {
                self.compensate(&student_id).await;
                return Err(err);
            }
        }

        Ok(created)
    }

    async fn compensate(&self, student_id: &str) {
        if !self.rollback_on_failure {
            tracing::warn!(
                "Student {} left in CRM with incomplete lookups (rollback disabled)",
                student_id
            );
            return;
        }

        match self.crm.delete_entity(CONTACTS, student_id).await {
            Ok(()) => tracing::info!("Rolled back student {} after link failure", student_id),
            Err(e) => tracing::error!("Failed to roll back student {}: {}", student_id, e),
        }
    }
}
