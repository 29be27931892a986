use sqlx::PgPool;

/// Connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    surat_db::health_check(&pool).await.unwrap();

    let tables = [
        "users",
        "letters",
        "activities",
        "dispositions",
        "disposition_history",
        "notifications",
    ];
    for table in tables {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("{table} lookup failed: {e}"));
        assert!(exists, "{table} should exist");
    }

    for function in ["link_letter_to_activity", "unlink_letter_from_activity"] {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_proc WHERE proname = $1)")
                .bind(function)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(exists, "{function} should exist");
    }
}

/// History rows cannot be rewritten.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_is_append_only(pool: PgPool) {
    let id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO disposition_history (disposition_id, action, performed_by) \
         VALUES (gen_random_uuid(), 'created', gen_random_uuid()) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let update = sqlx::query("UPDATE disposition_history SET new_value = 'x' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM disposition_history WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());
}
