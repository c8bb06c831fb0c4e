//! Cross-builder tests for the qb module.

use crate::client::testing::RecordingClient;
use crate::qb::{self, Expr, MutationQb, SqlQb};
use crate::types::Param;
use serde_json::json;

#[test]
fn select_with_join_group_having() {
    let sql = qb::select_from("users u")
        .select("u.*, COUNT(o.id) as order_count")
        .left_join("orders o", "u.id = o.user_id")
        .eq("u.status", "active")
        .group_by("u.id")
        .having_gt("COUNT(o.id)", 5i64)
        .order_by_desc("order_count")
        .limit(10)
        .to_sql();

    assert_eq!(
        sql,
        "SELECT u.*, COUNT(o.id) as order_count FROM users u \
         LEFT JOIN orders o ON u.id = o.user_id WHERE u.status = $1 \
         GROUP BY u.id HAVING COUNT(o.id) > $2 ORDER BY order_count DESC LIMIT 10"
    );
}

#[test]
fn nested_expression_in_builder() {
    let sql = qb::select("posts")
        .eq("published", true)
        .and_expr(Expr::or(vec![
            Expr::eq("author_id", 1i64),
            Expr::and(vec![Expr::eq("featured", true), Expr::gt("score", 10i32)]),
        ]))
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM posts WHERE published = $1 AND (author_id = $2 OR (featured = $3 AND score > $4))"
    );
}

#[test]
fn where_template_and_raw() {
    let sql = qb::select("events")
        .where_template("tags @> ?::text[]", [vec!["a", "b"]])
        .raw("deleted_at IS NULL")
        .to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM events WHERE tags @> $1::text[] AND deleted_at IS NULL"
    );
}

#[test]
fn builders_snapshot_for_batches() {
    let built = qb::insert_into("users")
        .set("name", "bob")
        .returning("id")
        .build()
        .unwrap();
    assert_eq!(built.sql, "INSERT INTO users (name) VALUES ($1) RETURNING id");
    assert_eq!(built.params, vec![Param::new("bob")]);
}

#[tokio::test]
async fn insert_fetch_one_maps_returning() {
    let client = RecordingClient::with_rows(vec![vec![("id", json!(42))]]);
    let id: serde_json::Value = qb::insert("users")
        .set("name", "carol")
        .returning("id")
        .fetch_one(&client)
        .await
        .unwrap();
    assert_eq!(id, json!({"id": 42}));
}

#[tokio::test]
async fn delete_execute_sends_safe_sql() {
    let client = RecordingClient::default();
    qb::delete_from("sessions").execute(&client).await.unwrap();
    assert_eq!(client.last().sql, "DELETE FROM sessions WHERE 1=0");
}

#[tokio::test]
async fn invalid_update_never_reaches_client() {
    let client = RecordingClient::default();
    assert!(qb::update("users").eq("id", 1).execute(&client).await.is_err());
    assert!(client.calls.lock().unwrap().is_empty());
}
