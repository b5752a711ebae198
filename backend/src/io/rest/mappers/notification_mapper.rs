use shared::{Notification as SharedNotification, NotificationListResponse};

use crate::domain::models::Notification as DomainNotification;

pub struct NotificationMapper;

impl NotificationMapper {
    pub fn to_dto(domain: DomainNotification) -> SharedNotification {
        SharedNotification {
            id: domain.id,
            user_id: domain.user_id,
            guardian_id: domain.guardian_id,
            title: domain.title,
            message: domain.message,
            read: domain.read,
            read_at: domain.read_at,
            created_at: domain.created_at,
        }
    }

    pub fn to_list_dto(notifications: Vec<DomainNotification>) -> NotificationListResponse {
        NotificationListResponse {
            notifications: notifications.into_iter().map(Self::to_dto).collect(),
        }
    }
}
