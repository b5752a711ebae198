use chrono::NaiveDate;
use shared::{Child as SharedChild, ChildAgeResponse, ChildListResponse};

use crate::domain::models::Child as DomainChild;

/// Mapper from domain children to the shared DTOs. Age is computed against
/// the `today` the caller passes in.
pub struct ChildMapper;

impl ChildMapper {
    pub fn to_dto(domain: DomainChild, today: NaiveDate) -> SharedChild {
        let age_in_months = domain.age_in_months(today);
        SharedChild {
            id: domain.id,
            first_name: domain.first_name,
            last_name: domain.last_name,
            document_number: domain.document_number,
            birth_date: domain.birth_date,
            gender: domain.gender,
            blood_type: domain.blood_type,
            birth_weight_kg: domain.birth_weight_kg,
            birth_height_cm: domain.birth_height_cm,
            age_in_months,
            deleted_at: domain.deleted_at,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(children: Vec<DomainChild>, today: NaiveDate) -> ChildListResponse {
        ChildListResponse {
            children: children.into_iter().map(|c| Self::to_dto(c, today)).collect(),
        }
    }

    pub fn to_age_dto(domain: &DomainChild, age_in_months: u32) -> ChildAgeResponse {
        ChildAgeResponse {
            child_id: domain.id,
            birth_date: domain.birth_date,
            age_in_months,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::Gender;

    #[test]
    fn test_to_dto_computes_age() {
        let now = Utc::now();
        let child = DomainChild {
            id: 3,
            first_name: "Mateo".to_string(),
            last_name: "Diaz".to_string(),
            document_number: "RC-100".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            gender: Gender::Male,
            blood_type: None,
            birth_weight_kg: Some(3.4),
            birth_height_cm: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let dto = ChildMapper::to_dto(child.clone(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(dto.age_in_months, 0);
        let dto = ChildMapper::to_dto(child, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(dto.age_in_months, 1);
        assert_eq!(dto.document_number, "RC-100");
    }
}
