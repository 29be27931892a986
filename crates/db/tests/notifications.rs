use chrono::{Duration, Utc};
use sqlx::PgPool;
use surat_db::models::notification::CreateNotification;
use surat_db::models::user::CreateUser;
use surat_db::repositories::{NotificationRepo, UserRepo};
use uuid::Uuid;

fn notification(user_id: Uuid, disposition_id: Uuid) -> CreateNotification {
    CreateNotification {
        user_id,
        kind: "disposition_assigned".to_string(),
        title: "New disposition".to_string(),
        message: "You have been assigned: Review draft".to_string(),
        disposition_id: Some(disposition_id),
        activity_id: None,
        activity_title: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicates_inside_window_are_suppressed(pool: PgPool) {
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            name: "u".into(),
            email: "u@example.org".into(),
            role: "staff".into(),
        },
    )
    .await
    .unwrap();
    let disposition = Uuid::new_v4();
    let since = Utc::now() - Duration::minutes(10);

    let first = NotificationRepo::create_unless_recent(&pool, &notification(user.id, disposition), since)
        .await
        .unwrap();
    let second = NotificationRepo::create_unless_recent(&pool, &notification(user.id, disposition), since)
        .await
        .unwrap();
    let other = NotificationRepo::create_unless_recent(&pool, &notification(user.id, Uuid::new_v4()), since)
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert!(other.is_some());
    assert_eq!(NotificationRepo::unread_count(&pool, user.id).await.unwrap(), 2);

    let first = first.unwrap();
    assert!(NotificationRepo::mark_read(&pool, first.id, user.id).await.unwrap());
    assert!(!NotificationRepo::mark_read(&pool, first.id, user.id).await.unwrap());
    assert_eq!(NotificationRepo::mark_all_read(&pool, user.id).await.unwrap(), 1);

    let all = NotificationRepo::list_for_user(&pool, user.id, false, 50, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|n| n.is_read));
}
