//! Integration tests for Model against PostgreSQL
//!
//! Skipped unless DATABASE_URL points at a database the tests may create
//! and drop tables in.

use modelhaus::prelude::*;

async fn setup_pool() -> Option<PgPool> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping PostgreSQL tests");
            return None;
        }
    };

    Some(
        PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to database"),
    )
}

async fn reset_tables(pool: &PgPool, prefix: &str) {
    let author = format!("{}_author", prefix);
    let article = format!("{}_article", prefix);

    let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", author))
        .execute(pool)
        .await;
    let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", article))
        .execute(pool)
        .await;

    sqlx::query(&format!(
        "CREATE TABLE {} (id SERIAL PRIMARY KEY, title TEXT NOT NULL, tags JSONB)",
        article
    ))
    .execute(pool)
    .await
    .expect("Failed to create article table");

    sqlx::query(&format!(
        "CREATE TABLE {} (id SERIAL PRIMARY KEY, name TEXT NOT NULL, active BOOLEAN NOT NULL DEFAULT TRUE, article_id INTEGER REFERENCES {}(id))",
        author, article
    ))
    .execute(pool)
    .await
    .expect("Failed to create author table");
}

async fn drop_tables(pool: &PgPool, prefix: &str) {
    for table in ["author", "article"] {
        let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {}_{} CASCADE", prefix, table))
            .execute(pool)
            .await;
    }
}

#[tokio::test]
async fn test_crud_round_trip() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    let prefix = "mh_crud";
    reset_tables(&pool, prefix).await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let articles = haus.model("mh_crud_article").build().unwrap();

    let created = articles
        .insert(record_from([
            ("title", json!("Hello")),
            ("tags", json!(["rust", "sql"])),
        ]))
        .await
        .unwrap();
    assert_eq!(created["title"], json!("Hello"));
    assert_eq!(created["tags"], json!(["rust", "sql"]));

    let id = created["id"].clone();
    let fetched = articles.find_by_id(id.clone()).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    let updated = articles
        .update(record_from([("id", id.clone()), ("title", json!("Hello again"))]))
        .await
        .unwrap();
    assert_eq!(updated["title"], json!("Hello again"));
    assert_eq!(articles.count_all().await.unwrap(), 1);

    assert!(articles.remove(id.clone()).await.unwrap());
    assert!(articles.find_by_id(id).await.unwrap().is_none());

    drop_tables(&pool, prefix).await;
}

#[tokio::test]
async fn test_joins_and_custom_filters() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    let prefix = "mh_join";
    reset_tables(&pool, prefix).await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let articles = haus.model("mh_join_article").build().unwrap();
    let article = articles
        .insert(record_from([("title", json!("Some cool title"))]))
        .await
        .unwrap();

    let plain_authors = haus.model("mh_join_author").build().unwrap();
    for name in ["John", "Jane"] {
        plain_authors
            .insert(record_from([
                ("name", json!(name)),
                ("article_id", article["id"].clone()),
            ]))
            .await
            .unwrap();
    }

    let authors = haus
        .model("mh_join_author")
        .columns(["mh_join_author.name", "mh_join_article.title AS article_title"])
        .join(JoinSpec::equality(
            "mh_join_article",
            "mh_join_article.id",
            "mh_join_author.article_id",
        ))
        .sync_filter("titleLike", |value, query| {
            let pattern = format!("%{}%", value.as_str().unwrap_or_default());
            query.where_raw("mh_join_article.title LIKE ?", vec![json!(pattern)]);
        })
        .build()
        .unwrap();

    let rows = authors
        .find(record_from([("titleLike", json!("cool")), ("name", json!("Jane"))]))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        record_from([
            ("name", json!("Jane")),
            ("article_title", json!("Some cool title")),
        ])
    );

    drop_tables(&pool, prefix).await;
}

async fn run_all(pool: &PgPool, statements: &[&str]) {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to run {}: {}", statement, e));
    }
}

#[tokio::test]
async fn test_reserved_and_mixed_case_table_names() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    run_all(
        &pool,
        &[
            r#"DROP TABLE IF EXISTS "user" CASCADE"#,
            r#"DROP TABLE IF EXISTS "Posts" CASCADE"#,
            r#"CREATE TABLE "Posts" (id SERIAL PRIMARY KEY, "Title" TEXT NOT NULL)"#,
            r#"CREATE TABLE "user" (id SERIAL PRIMARY KEY, name TEXT NOT NULL, "postId" INTEGER REFERENCES "Posts"(id))"#,
        ],
    )
    .await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let posts = haus.model("Posts").build().unwrap();
    let post = posts
        .insert(record_from([("Title", json!("Quoted"))]))
        .await
        .unwrap();
    assert_eq!(post["Title"], json!("Quoted"));

    let users = haus.model("user").build().unwrap();
    let ada = users
        .insert(record_from([("name", json!("Ada")), ("postId", post["id"].clone())]))
        .await
        .unwrap();
    assert_eq!(users.find_by_id(ada["id"].clone()).await.unwrap().unwrap(), ada);

    let renamed = users
        .update(record_from([("id", ada["id"].clone()), ("name", json!("Ada L."))]))
        .await
        .unwrap();
    assert_eq!(renamed["name"], json!("Ada L."));

    let authors = haus
        .model("user")
        .columns(["user.name", "Posts.Title AS postTitle"])
        .join(JoinSpec::equality("Posts", "Posts.id", "user.postId"))
        .build()
        .unwrap();
    let rows = authors.find(record_from([("name", json!("Ada L."))])).await.unwrap();
    assert_eq!(
        rows,
        vec![record_from([
            ("name", json!("Ada L.")),
            ("postTitle", json!("Quoted")),
        ])]
    );

    assert_eq!(users.count_all().await.unwrap(), 1);
    assert!(users.remove(ada["id"].clone()).await.unwrap());
    assert_eq!(users.count_all().await.unwrap(), 0);

    run_all(
        &pool,
        &[r#"DROP TABLE IF EXISTS "user" CASCADE"#, r#"DROP TABLE IF EXISTS "Posts" CASCADE"#],
    )
    .await;
}

#[tokio::test]
async fn test_failing_after_hooks_keep_the_write() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    let prefix = "mh_hooks";
    reset_tables(&pool, prefix).await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let articles = haus
        .model("mh_hooks_article")
        .after_insert(|_record| async { Err::<Record, _>(ModelError::Hook("after insert".to_string())) })
        .after_update(|_record| async { Err::<Record, _>(ModelError::Hook("after update".to_string())) })
        .build()
        .unwrap();

    let err = articles
        .insert(record_from([("title", json!("Persisted"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Hook(msg) if msg == "after insert"));

    let plain = haus.model("mh_hooks_article").build().unwrap();
    let stored = plain
        .find(record_from([("title", json!("Persisted"))]))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);

    let err = articles
        .update(record_from([("id", stored[0]["id"].clone()), ("title", json!("Changed"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Hook(msg) if msg == "after update"));
    let changed = plain.find_by_id(stored[0]["id"].clone()).await.unwrap().unwrap();
    assert_eq!(changed["title"], json!("Changed"));

    drop_tables(&pool, prefix).await;
}

#[tokio::test]
async fn test_text_columns_keep_strings_verbatim() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    run_all(
        &pool,
        &[
            "DROP TABLE IF EXISTS mh_text_note CASCADE",
            "CREATE TABLE mh_text_note (id SERIAL PRIMARY KEY, body TEXT, reference VARCHAR(64), code CHAR(3))",
        ],
    )
    .await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let notes = haus.model("mh_text_note").build().unwrap();

    let timestamp = "2024-01-01T00:00:00Z";
    let uuid = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let created = notes
        .insert(record_from([
            ("body", json!(timestamp)),
            ("reference", json!(uuid)),
            ("code", json!("abc")),
        ]))
        .await
        .unwrap();
    assert_eq!(created["body"], json!(timestamp));
    assert_eq!(created["reference"], json!(uuid));
    assert_eq!(created["code"], json!("abc"));

    let found = notes
        .find(record_from([("body", json!(timestamp)), ("reference", json!(uuid))]))
        .await
        .unwrap();
    assert_eq!(found, vec![created.clone()]);

    let cleared = notes
        .update(record_from([("id", created["id"].clone()), ("body", Value::Null)]))
        .await
        .unwrap();
    assert_eq!(cleared["body"], Value::Null);

    run_all(&pool, &["DROP TABLE IF EXISTS mh_text_note CASCADE"]).await;
}

#[tokio::test]
async fn test_typed_columns_round_trip() {
    let Some(pool) = setup_pool().await else {
        return;
    };
    run_all(
        &pool,
        &[
            "DROP TABLE IF EXISTS mh_typed_item CASCADE",
            "CREATE TABLE mh_typed_item (\
                id SERIAL PRIMARY KEY, \
                price NUMERIC(10, 2), \
                opens_at TIME, \
                payload BYTEA, \
                scores INT4[], \
                labels TEXT[], \
                created_at TIMESTAMPTZ, \
                token UUID, \
                ttl INTERVAL, \
                stock INTEGER)",
        ],
    )
    .await;

    let haus = ModelHaus::with_connection(Connection::new(PgExecutor::new(pool.clone())));
    let items = haus.model("mh_typed_item").build().unwrap();

    let token = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let created = items
        .insert(record_from([
            ("price", json!("12.50")),
            ("opens_at", json!("09:30:00")),
            ("payload", json!("\\xdeadbeef")),
            ("scores", json!([1, 2, 3])),
            ("labels", json!(["new", "sale"])),
            ("created_at", json!("2024-01-01T00:00:00Z")),
            ("token", json!(token)),
            ("ttl", json!({"months": 0, "days": 1, "microseconds": 0})),
            ("stock", Value::Null),
        ]))
        .await
        .unwrap();

    assert_eq!(created["price"], json!("12.50"));
    assert_eq!(created["opens_at"], json!("09:30:00"));
    assert_eq!(created["payload"], json!("\\xdeadbeef"));
    assert_eq!(created["scores"], json!([1, 2, 3]));
    assert_eq!(created["labels"], json!(["new", "sale"]));
    assert_eq!(created["created_at"], json!("2024-01-01T00:00:00+00:00"));
    assert_eq!(created["token"], json!(token));
    assert_eq!(created["ttl"], json!({"months": 0, "days": 1, "microseconds": 0}));
    assert_eq!(created["stock"], Value::Null);

    // Filter values convert to the column's type
    let by_token = items.find(record_from([("token", json!(token))])).await.unwrap();
    assert_eq!(by_token.len(), 1);
    let by_time = items
        .find(record_from([("created_at", json!("2024-01-01T00:00:00Z"))]))
        .await
        .unwrap();
    assert_eq!(by_time.len(), 1);

    let repriced = items
        .update(record_from([("id", created["id"].clone()), ("price", json!(3)), ("stock", json!("7"))]))
        .await
        .unwrap();
    assert_eq!(repriced["price"], json!("3.00"));
    assert_eq!(repriced["stock"], json!(7));

    run_all(&pool, &["DROP TABLE IF EXISTS mh_typed_item CASCADE"]).await;
}

#[tokio::test]
async fn test_coordinator_pool_from_config() {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return;
    };
    let config = DatabaseConfig::new(
        "localhost".to_string(), 5432, "unused".to_string(),
        "postgres".to_string(), "password".to_string(),
        1, 2, 5, 60, 0,
    )
    .with_url(database_url);

    let haus = ModelHaus::new(config).await.unwrap();
    assert!(haus.pool().is_some());
    assert_eq!(haus.connection().backend_name(), "postgres");
    haus.health_check().await.unwrap();
}
