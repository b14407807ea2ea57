use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use crate::AppConfig;

#[derive(Clone)]
pub struct Db(pub Pool<Sqlite>);

impl Db {
    pub async fn connect(cfg: &AppConfig) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&cfg.database_url)
            .await?;
        Ok(Self(pool))
    }

    /// Single pinned connection: every new `:memory:` connection would be a separate database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.0).await?;
        Ok(())
    }
}
