use chrono::Utc;
use shared::CreateNotificationRequest;
use tracing::info;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::Notification;
use crate::domain::validation::FieldErrors;
use crate::storage::repositories::{guardian_repository, notification_repository, user_repository};
use crate::storage::DbConnection;

/// Service for messages addressed to a user or a guardian
#[derive(Clone)]
pub struct NotificationService {
    db: DbConnection,
}

impl NotificationService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_notification(&self, request: CreateNotificationRequest) -> DomainResult<Notification> {
        info!(
            "Creating notification: user={:?}, guardian={:?}",
            request.user_id, request.guardian_id
        );

        let mut errors = FieldErrors::new();
        errors.require_text("title", &request.title, 200);
        errors.require_text("message", &request.message, 2000);
        if request.user_id.is_some() == request.guardian_id.is_some() {
            errors.add("user_id", "exactly one of user_id and guardian_id must be set");
        }
        errors.into_result()?;

        let mut tx = self.db.begin().await?;

        if let Some(user_id) = request.user_id {
            if user_repository::find_by_id(&mut *tx, user_id).await?.is_none() {
                return Err(DomainError::not_found("User", user_id));
            }
        }
        if let Some(guardian_id) = request.guardian_id {
            if guardian_repository::find_by_id(&mut *tx, guardian_id).await?.is_none() {
                return Err(DomainError::not_found("Guardian", guardian_id));
            }
        }

        let mut notification = Notification {
            id: 0,
            user_id: request.user_id,
            guardian_id: request.guardian_id,
            title: request.title.trim().to_string(),
            message: request.message.trim().to_string(),
            read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        notification.id = notification_repository::insert(&mut *tx, &notification).await?;
        tx.commit().await?;

        info!("Created notification with ID: {}", notification.id);
        Ok(notification)
    }

    pub async fn get_notification(&self, notification_id: i64) -> DomainResult<Notification> {
        let mut conn = self.db.acquire().await?;
        notification_repository::find_by_id(&mut conn, notification_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification", notification_id))
    }

    pub async fn list_for_user(&self, user_id: i64, unread_only: bool) -> DomainResult<Vec<Notification>> {
        let mut conn = self.db.acquire().await?;
        Ok(notification_repository::list_for_user(&mut conn, user_id, unread_only).await?)
    }

    pub async fn list_for_guardian(&self, guardian_id: i64) -> DomainResult<Vec<Notification>> {
        let mut conn = self.db.acquire().await?;
        if guardian_repository::find_by_id(&mut conn, guardian_id).await?.is_none() {
            return Err(DomainError::not_found("Guardian", guardian_id));
        }
        Ok(notification_repository::list_for_guardian(&mut conn, guardian_id).await?)
    }

    pub async fn unread_count(&self, user_id: i64) -> DomainResult<i64> {
        let mut conn = self.db.acquire().await?;
        Ok(notification_repository::count_unread_for_user(&mut conn, user_id).await?)
    }

    /// Marking an already read notification keeps the original read time
    pub async fn mark_read(&self, notification_id: i64) -> DomainResult<Notification> {
        let mut tx = self.db.begin().await?;
        let mut notification = notification_repository::find_by_id(&mut *tx, notification_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification", notification_id))?;

        if !notification.read {
            notification.mark_read(Utc::now());
            notification_repository::mark_read(&mut *tx, &notification).await?;
        }
        tx.commit().await?;

        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> DomainResult<u64> {
        let mut tx = self.db.begin().await?;
        let updated = notification_repository::mark_all_read_for_user(&mut *tx, user_id, Utc::now()).await?;
        tx.commit().await?;

        info!("Marked {} notifications read for user {}", updated, user_id);
        Ok(updated)
    }

    pub async fn delete_notification(&self, notification_id: i64) -> DomainResult<()> {
        let mut tx = self.db.begin().await?;
        if !notification_repository::delete(&mut *tx, notification_id).await? {
            return Err(DomainError::not_found("Notification", notification_id));
        }
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{seed_guardian, seed_user, setup_db};
    use shared::Role;

    fn to_user(user_id: i64, title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            user_id: Some(user_id),
            guardian_id: None,
            title: title.to_string(),
            message: "Your child's next dose is due next week".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exactly_one_recipient_is_required() {
        let db = setup_db().await;
        let user = seed_user(&db, "parent", Role::Parent).await;
        let guardian = seed_guardian(&db, "G-1").await;
        let service = NotificationService::new(db);

        let mut both = to_user(user.id, "Reminder");
        both.guardian_id = Some(guardian.id);
        assert!(matches!(
            service.create_notification(both).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut neither = to_user(user.id, "Reminder");
        neither.user_id = None;
        assert!(matches!(
            service.create_notification(neither).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        assert!(matches!(
            service.create_notification(to_user(999, "Reminder")).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_read_tracking() {
        let db = setup_db().await;
        let user = seed_user(&db, "parent", Role::Parent).await;
        let service = NotificationService::new(db);

        let first = service.create_notification(to_user(user.id, "First")).await.unwrap();
        service.create_notification(to_user(user.id, "Second")).await.unwrap();
        service.create_notification(to_user(user.id, "Third")).await.unwrap();
        assert_eq!(service.unread_count(user.id).await.unwrap(), 3);

        let read = service.mark_read(first.id).await.unwrap();
        assert!(read.read);
        let read_at = read.read_at;
        assert_eq!(service.mark_read(first.id).await.unwrap().read_at, read_at);

        assert_eq!(service.list_for_user(user.id, true).await.unwrap().len(), 2);
        assert_eq!(service.mark_all_read(user.id).await.unwrap(), 2);
        assert_eq!(service.unread_count(user.id).await.unwrap(), 0);
        assert_eq!(service.list_for_user(user.id, false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_guardian_notifications_and_delete() {
        let db = setup_db().await;
        let guardian = seed_guardian(&db, "G-1").await;
        let service = NotificationService::new(db);

        let created = service
            .create_notification(CreateNotificationRequest {
                user_id: None,
                guardian_id: Some(guardian.id),
                title: "Appointment".to_string(),
                message: "Please confirm Thursday's visit".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(service.list_for_guardian(guardian.id).await.unwrap(), vec![created.clone()]);

        service.delete_notification(created.id).await.unwrap();
        assert!(service.get_notification(created.id).await.is_err());
    }
}
