//! MongoDB connection lifecycle.
use bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};

use crate::config::Mongo;
use crate::user::User;

pub const DEFAULT_DATABASE_NAME: &str = "userbase";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const USERS_COLLECTION: &str = "users";

/// Live MongoDB handle.
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    db: mongodb::Database,
}

impl Database {
    /// Init database connection and check it answers.
    pub async fn connect(
        config: &Mongo,
        environment: &str,
    ) -> Result<Self, mongodb::error::Error> {
        let mut options =
            ClientOptions::parse(config.connection_string(environment)).await?;
        options.max_pool_size = Some(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE));

        let name = config
            .database
            .clone()
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_owned());

        let client = Client::with_options(options)?;
        let db = client.database(&name);
        db.run_command(doc! { "ping": 1 }).await?;

        tracing::info!(database = %name, "mongodb connected");

        Ok(Self { client, db })
    }

    /// Users collection.
    pub fn users(&self) -> Collection<User> {
        self.db.collection(USERS_COLLECTION)
    }

    /// Create the users indexes if missing.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let active = IndexModel::builder().keys(doc! { "isActive": 1 }).build();

        self.users().create_indexes([email, active]).await?;
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) {
        self.client.shutdown().await;
        tracing::info!("mongodb disconnected");
    }
}
