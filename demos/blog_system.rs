//! # Blog System Example
//!
//! This example walks through a small blog built on ModelHaus models:
//! - Authors and posts joined into one result
//! - A custom filter that searches by post title
//! - Hooks that normalize and decorate records
//! - A concrete model with its own queries
//!
//! Runs against PostgreSQL when `modelhaus.toml` (or `MODELHAUS_CONFIG`)
//! is present, and against the in-memory executor otherwise.

use modelhaus::prelude::*;

/// Posts with a couple of domain-specific queries
struct PostModel {
    model: Model,
}

impl PostModel {
    fn new(haus: &ModelHaus) -> Result<Self, ModelError> {
        let model = haus
            .model("post")
            .before_insert(|mut record| async move {
                if let Some(Value::String(title)) = record.get("title") {
                    let trimmed = title.trim().to_string();
                    record.insert("title".to_string(), json!(trimmed));
                }
                Ok(record)
            })
            .build()?;
        Ok(Self { model })
    }

    async fn find_by_title(&self, title: &str) -> Result<Vec<Record>, ModelError> {
        self.model.find(record_from([("title", json!(title))])).await
    }

    async fn published_count(&self) -> Result<i64, ModelError> {
        Ok(self.model.connection().table("post").count("id").await?)
    }
}

fn in_memory_blog() -> MemoryExecutor {
    MemoryExecutor::new()
        .with_rows(
            "post",
            vec![
                record_from([("id", json!(1)), ("title", json!("Hello, blog"))]),
                record_from([("id", json!(2)), ("title", json!("Ownership in practice"))]),
            ],
        )
        .with_rows(
            "author",
            vec![
                record_from([
                    ("id", json!(1)),
                    ("name", json!("Ada")),
                    ("post_id", json!(1)),
                ]),
                record_from([
                    ("id", json!(2)),
                    ("name", json!("Grace")),
                    ("post_id", json!(2)),
                ]),
            ],
        )
}

async fn open() -> Result<ModelHaus, ModelError> {
    match AppConfig::load() {
        Ok(config) => {
            println!("🔌 Connecting to PostgreSQL from configuration");
            ModelHaus::from_config(&config).await
        }
        Err(err) => {
            println!("💾 No database configuration ({}); using in-memory tables", err);
            Ok(ModelHaus::with_connection(Connection::new(in_memory_blog())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("📝 ModelHaus Blog System Example");
    println!("===============================");

    let mut haus = open().await?;
    haus.health_check().await?;
    println!("✅ Backend: {}", haus.connection().backend_name());

    // 1. Authors joined with their post, searchable by title
    let authors = haus
        .model("author")
        .columns(["author.id", "author.name", "post.title AS post_title"])
        .join(JoinSpec::equality("post", "post.id", "author.post_id"))
        .sync_filter("postTitle", |value, query| {
            query.where_eq("post.title", value);
        })
        .before_insert(|mut record| async move {
            if let Some(Value::String(name)) = record.get("name") {
                let capitalized = name
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c })
                    .collect::<String>();
                record.insert("name".to_string(), json!(capitalized));
            }
            Ok(record)
        })
        .after_insert(|mut record| async move {
            record.insert("welcome".to_string(), json!(true));
            Ok(record)
        })
        .build()?;
    haus.register_model("authors".to_string(), authors)?;

    let authors = haus.get_model("authors")?;
    println!("\n👥 {} authors", authors.count_all().await?);
    for author in authors.find(Record::new()).await? {
        println!("   {} wrote \"{}\"", author["name"], author["post_title"]);
    }

    // 2. Custom filter
    let found = authors
        .find(record_from([("postTitle", json!("Ownership in practice"))]))
        .await?;
    println!("\n🔍 Authors of \"Ownership in practice\": {}", found.len());

    // 3. Writes with hooks
    let posts = PostModel::new(&haus)?;
    let post = posts
        .model
        .insert(record_from([("title", json!("  Async without tears  "))]))
        .await?;
    println!("\n🆕 Created post {} titled {}", post["id"], post["title"]);

    let author = authors
        .insert(record_from([("name", json!("linus")), ("post_id", post["id"].clone())]))
        .await?;
    println!("🆕 Created author {} (welcome flag: {})", author["name"], author["welcome"]);

    let renamed = posts
        .model
        .upsert(record_from([
            ("id", post["id"].clone()),
            ("title", json!("Async without fear")),
        ]))
        .await?;
    println!("✏️  Renamed post {} to {}", renamed["id"], renamed["title"]);

    // 4. Domain queries on the concrete model
    let matches = posts.find_by_title("Async without fear").await?;
    println!("\n📚 Posts titled \"Async without fear\": {}", matches.len());
    println!("📚 Posts in total: {}", posts.published_count().await?);

    // 5. Cleanup
    let removed = authors.remove(author["id"].clone()).await?;
    println!("\n🗑️  Removed author: {}", removed);
    println!("👥 {} authors remain", authors.count_all().await?);

    println!("\n🎉 Blog system example completed!");
    Ok(())
}
