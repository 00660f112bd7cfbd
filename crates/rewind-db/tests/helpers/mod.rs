//! Test helpers: a throwaway Postgres with the workspace migrations applied.
//!
//! The Postgres suites need Docker and are ignored by default. Run them with
//! `cargo test -p rewind-db -- --ignored`.

#![allow(dead_code)]

use chrono::NaiveDate;
use rewind_db::setup_database;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// Pool plus the container it points at. The container stops when this drops.
pub struct TestDb {
    pub pool: PgPool,
    pub _container: ContainerAsync<Postgres>,
}

/// Start an isolated database and run the migrations against it.
pub async fn setup_test_db() -> TestDb {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");

    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    let pool = setup_database(&connection_string)
        .await
        .expect("Failed to set up test database");

    TestDb {
        pool,
        _container: container,
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}
