use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds the connection pool and runs a `SELECT 1` to fail fast on a bad URL.
pub fn establish_pool(
    database_url: &str,
    max_size: u32,
) -> Result<PgPool, diesel::r2d2::PoolError> {
    log::info!("Connecting to database (pool size {})", max_size);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(max_size).build(manager)?;

    let mut conn = pool.get()?;
    match diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result::<i32>(&mut conn)
    {
        Ok(test_query) => log::info!("Database test query result: {}", test_query),
        Err(e) => log::error!("Database test query failed: {}", e),
    }
    Ok(pool)
}
