use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status reason every contact created through the gateway starts with.
pub const CONTACT_STATUS_CODE: i64 = 100000001;

/// Incoming body shared by the teacher, student and parent endpoints.
///
/// Values are kept as raw JSON so they reach the CRM exactly as the caller
/// sent them. Keys the gateway does not know are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountRequest {
    #[serde(rename = "firstName")]
    pub first_name: Option<Value>,
    #[serde(rename = "lastName")]
    pub last_name: Option<Value>,
    pub email: Option<Value>,
    pub telephone1: Option<Value>,
    pub gendercode: Option<Value>,
    pub familystatuscode: Option<Value>,
    pub new_academicqualification: Option<Value>,
    pub jobtitle: Option<Value>,
    pub new_jobplace: Option<Value>,
    pub new_type: Option<Value>,
    pub new_nationalid: Option<Value>,
    pub new_chronicdiseases: Option<Value>,
    pub birthdate: Option<Value>,
    pub new_assignedinanoherschool: Option<Value>,
    pub new_previousassignedschool: Option<Value>,
    pub new_transferreason: Option<Value>,
    pub new_ageatnexteducationalyear: Option<Value>,
    pub new_graduationschool: Option<Value>,
    pub new_graduationuniversity: Option<Value>,
    pub new_otheracademicqualification: Option<Value>,
    pub new_previouswork: Option<Value>,
    pub new_moderntechnologies: Option<Value>,
    pub new_expectedsalary: Option<Value>,
    pub new_workingfield: Option<Value>,
    pub new_workingreason: Option<Value>,

    /// Academic year record the student is linked to.
    #[serde(rename = "academicYearId")]
    pub academic_year_id: Option<Value>,
    /// Explicit father contact for a student; wins over the session's parent.
    #[serde(rename = "fatherId")]
    pub father_id: Option<Value>,
    /// Explicit mother contact for a student; wins over the session's parent.
    #[serde(rename = "motherId")]
    pub mother_id: Option<Value>,
}

impl AccountRequest {
    /// Looks a field up by its wire name, as used in the required-field lists.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let value = match name {
            "firstName" => &self.first_name,
            "lastName" => &self.last_name,
            "email" => &self.email,
            "telephone1" => &self.telephone1,
            "gendercode" => &self.gendercode,
            "familystatuscode" => &self.familystatuscode,
            "new_academicqualification" => &self.new_academicqualification,
            "jobtitle" => &self.jobtitle,
            "new_jobplace" => &self.new_jobplace,
            "new_type" => &self.new_type,
            "new_nationalid" => &self.new_nationalid,
            "new_chronicdiseases" => &self.new_chronicdiseases,
            "birthdate" => &self.birthdate,
            "new_assignedinanoherschool" => &self.new_assignedinanoherschool,
            "new_previousassignedschool" => &self.new_previousassignedschool,
            "new_transferreason" => &self.new_transferreason,
            "new_ageatnexteducationalyear" => &self.new_ageatnexteducationalyear,
            "academicYearId" => &self.academic_year_id,
            "fatherId" => &self.father_id,
            "motherId" => &self.mother_id,
            _ => return None,
        };
        value.as_ref()
    }

    /// Maps the request onto the CRM contact attributes.
    pub fn to_contact_record(&self) -> ContactRecord {
        ContactRecord {
            firstname: self.first_name.clone(),
            lastname: self.last_name.clone(),
            emailaddress1: self.email.clone(),
            telephone1: self.telephone1.clone(),
            gendercode: self.gendercode.clone(),
            familystatuscode: self.familystatuscode.clone(),
            new_academicqualification: self.new_academicqualification.clone(),
            jobtitle: self.jobtitle.clone(),
            new_jobplace: self.new_jobplace.clone(),
            new_type: self.new_type.clone(),
            new_nationalid: self.new_nationalid.clone(),
            new_chronicdiseases: self.new_chronicdiseases.clone(),
            birthdate: self.birthdate.clone(),
            new_assignedinanoherschool: self.new_assignedinanoherschool.clone(),
            new_previousassignedschool: self.new_previousassignedschool.clone(),
            new_transferreason: self.new_transferreason.clone(),
            new_ageatnexteducationalyear: self.new_ageatnexteducationalyear.clone(),
            statuscode: CONTACT_STATUS_CODE,
            new_graduationschool: self.new_graduationschool.clone(),
            new_graduationuniversity: self.new_graduationuniversity.clone(),
            new_otheracademicqualification: self.new_otheracademicqualification.clone(),
            new_previouswork: self.new_previouswork.clone(),
            new_moderntechnologies: self.new_moderntechnologies.clone(),
            new_expectedsalary: self.new_expectedsalary.clone(),
            new_workingfield: self.new_workingfield.clone(),
            new_workingreason: self.new_workingreason.clone(),
        }
    }
}

/// Contact attributes as posted to the CRM. Unset attributes serialize as
/// explicit `null`.
#[derive(Debug, Clone, Serialize)]
pub struct ContactRecord {
    pub firstname: Option<Value>,
    pub lastname: Option<Value>,
    pub emailaddress1: Option<Value>,
    pub telephone1: Option<Value>,
    pub gendercode: Option<Value>,
    pub familystatuscode: Option<Value>,
    pub new_academicqualification: Option<Value>,
    pub jobtitle: Option<Value>,
    pub new_jobplace: Option<Value>,
    pub new_type: Option<Value>,
    pub new_nationalid: Option<Value>,
    pub new_chronicdiseases: Option<Value>,
    pub birthdate: Option<Value>,
    pub new_assignedinanoherschool: Option<Value>,
    pub new_previousassignedschool: Option<Value>,
    pub new_transferreason: Option<Value>,
    pub new_ageatnexteducationalyear: Option<Value>,
    pub statuscode: i64,
    pub new_graduationschool: Option<Value>,
    pub new_graduationuniversity: Option<Value>,
    pub new_otheracademicqualification: Option<Value>,
    pub new_previouswork: Option<Value>,
    pub new_moderntechnologies: Option<Value>,
    pub new_expectedsalary: Option<Value>,
    pub new_workingfield: Option<Value>,
    pub new_workingreason: Option<Value>,
}

/// Identifier of a record the CRM just created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedEntity {
    pub guid: Uuid,
}

/// Body of every successful account creation.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub data: CreatedEntity,
}

/// Row of the academic-year fetchXml query.
#[derive(Debug, Clone, Deserialize)]
pub struct AcademicYearRow {
    pub new_academicyearid: String,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub statecode: Option<i64>,
}

impl AcademicYearRow {
    /// Rows without a `statecode` are trusted to match the query filter.
    pub fn is_active(&self) -> bool {
        self.statecode.map_or(true, |state| state == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: String,
    pub name: Option<String>,
}

impl From<AcademicYearRow> for AcademicYear {
    fn from(row: AcademicYearRow) -> Self {
        Self {
            id: row.new_academicyearid,
            name: row.new_name,
        }
    }
}

/// OData collection envelope (`{"value": [...]}`).
#[derive(Debug, Deserialize)]
pub struct ODataCollection<T> {
    pub value: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contact_record_maps_fields_and_forces_status() {
        let request: AccountRequest = serde_json::from_value(json!({
            "firstName": "Sara",
            "lastName": "Haddad",
            "email": "sara@example.com",
            "gendercode": "2",
            "new_expectedsalary": 1500,
            "statuscode": 1,
            "unknownKey": "ignored"
        }))
        .unwrap();

        let record = serde_json::to_value(request.to_contact_record()).unwrap();
        assert_eq!(record["firstname"], "Sara");
        assert_eq!(record["lastname"], "Haddad");
        assert_eq!(record["emailaddress1"], "sara@example.com");
        assert_eq!(record["gendercode"], "2");
        assert_eq!(record["new_expectedsalary"], 1500);
        assert_eq!(record["statuscode"], CONTACT_STATUS_CODE);
        assert!(record.get("unknownKey").is_none());
    }

    #[test]
    fn test_unset_attributes_are_explicit_nulls() {
        let record = serde_json::to_value(AccountRequest::default().to_contact_record()).unwrap();
        let object = record.as_object().unwrap();
        assert_eq!(object.len(), 26);
        assert!(object.contains_key("new_workingreason"));
        assert!(object["new_workingreason"].is_null());
        assert!(object["telephone1"].is_null());
    }

    #[test]
    fn test_routing_keys_stay_out_of_the_record() {
        let request: AccountRequest = serde_json::from_value(json!({
            "academicYearId": "ay",
            "fatherId": "f",
            "motherId": "m"
        }))
        .unwrap();
        let record = serde_json::to_value(request.to_contact_record()).unwrap();
        assert!(record.get("academicYearId").is_none());
        assert!(record.get("fatherId").is_none());
        assert_eq!(request.field("academicYearId"), Some(&json!("ay")));
    }

    #[test]
    fn test_academic_year_row_activity() {
        let row: AcademicYearRow = serde_json::from_value(json!({
            "new_academicyearid": "1",
            "new_name": "2024/2025",
            "statecode": 1
        }))
        .unwrap();
        assert!(!row.is_active());

        let row: AcademicYearRow =
            serde_json::from_value(json!({ "new_academicyearid": "2" })).unwrap();
        assert!(row.is_active());
        assert_eq!(AcademicYear::from(row).name, None);
    }
}
