use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::{Client, NoTls};

/// Id of the item seeded with a rank last refreshed long ago
pub const STALE_ITEM_ID: i32 = 6;

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Create a static CLI instance
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        // Start PostgreSQL container
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        // Connect and create schema
        let (client, connection) = tokio_postgres::connect(&connection_string, NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });

        // Load and execute schema
        let schema = include_str!("schema.sql");
        client.batch_execute(schema).await?;

        Ok(TestDatabase {
            connection_string,
            _container: container
        })
    }

    pub async fn get_client(&self) -> Result<Client, Box<dyn std::error::Error>> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });

        Ok(client)
    }

    /// Seeds 4 users and 6 items:
    /// - users 1-3 keep the same top list: items 1, 2, 3, 4
    /// - user 4 rates items 1-5 from 5.0 down to 1.0 and has no top list
    /// - item 6 has no comparisons but still carries a rank from a run long ago
    pub async fn seed_test_data(&self) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;

        client
            .batch_execute(
                "INSERT INTO users (id, username) VALUES
                 (1, 'first'), (2, 'second'), (3, 'third'), (4, 'fourth');

                 INSERT INTO items (id, name) VALUES
                 (1, 'Steel Vengeance'), (2, 'Fury 325'), (3, 'Maverick'), (4, 'Intimidator 305'),
                 (5, 'Boomerang');

                 INSERT INTO items (id, name, score, rank, previous_rank, valid_duels, updated_at) VALUES
                 (6, 'Demolished', 88.0, 1, 2, 300, '2024-01-01 00:00:00+00');

                 INSERT INTO top_lists (id, user_id) VALUES (1, 1), (2, 2), (3, 3);

                 INSERT INTO top_list_entries (top_list_id, item_id, position) VALUES
                 (1, 1, 1), (1, 2, 2), (1, 3, 3), (1, 4, 4),
                 (2, 1, 1), (2, 2, 2), (2, 3, 3), (2, 4, 4),
                 (3, 1, 1), (3, 2, 2), (3, 3, 3), (3, 4, 4);

                 INSERT INTO ratings (user_id, item_id, value) VALUES
                 (4, 1, 5.0), (4, 2, 4.0), (4, 3, 3.0), (4, 4, 2.0), (4, 5, 1.0);"
            )
            .await?;

        Ok(())
    }
}
