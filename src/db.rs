use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::voter::{NewVoter, VoterRecord};

pub trait Db {
    /// Inserts a pending registration in its own transaction. Fails with
    /// `DuplicateRegistration` if the fingerprint or voter ID is taken.
    fn insert(&self, voter: NewVoter) -> BoxFuture<'_, Result<VoterRecord, BackendError>>;
}

pub use self::sqlite::*;

mod sqlite {
    use std::str::FromStr;
    use std::time::Duration;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::error::ErrorKind;
    use sqlx::migrate::MigrateError;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
    use sqlx::{self, Connection};
    use time::OffsetDateTime;

    use crate::config::Config;
    use crate::errors::BackendError;
    use crate::voter::{NewVoter, VoterRecord, VoterStatus};

    const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    pub struct SqliteDb {
        pool: SqlitePool,
    }

    impl SqliteDb {
        pub fn new(pool: SqlitePool) -> Self {
            SqliteDb { pool }
        }

        /// Builds a pool from the configuration. No connection is opened
        /// until the first request needs one, so an unreachable database
        /// surfaces as a per-request `DatabaseConnection` error.
        pub fn from_config(config: &Config) -> Result<Self, sqlx::Error> {
            let options = SqliteConnectOptions::from_str(&config.connection_string)?
                .create_if_missing(true)
                .busy_timeout(BUSY_TIMEOUT);

            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.acquire_timeout)
                .connect_lazy_with(options);

            Ok(SqliteDb::new(pool))
        }

        /// Applies any outstanding migrations from `migrations/`.
        pub async fn initialize(&self) -> Result<(), MigrateError> {
            sqlx::migrate!().run(&self.pool).await
        }

        pub async fn count_all(&self) -> Result<i64, BackendError> {
            let query = sqlx::query_as::<_, (i64,)>(include_str!("queries/count.sql"));

            let (count,) = query.fetch_one(&self.pool).await.map_err(map_sqlx_error)?;

            Ok(count)
        }

        /// Looks a registration up by its (already normalized) voter ID.
        pub async fn retrieve(&self, voter_id: &str) -> Result<Option<VoterRecord>, BackendError> {
            let query = sqlx::query(include_str!("queries/retrieve_voter.sql"));

            let record = query
                .bind(voter_id)
                .try_map(|row: SqliteRow| {
                    let status: String = try_get(&row, "status")?;
                    let status = VoterStatus::from_str(&status)
                        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

                    Ok(VoterRecord {
                        id: try_get(&row, "id")?,
                        name: try_get(&row, "name")?,
                        date_of_birth: try_get(&row, "dob")?,
                        id_fingerprint: try_get(&row, "aadhaar_hash")?,
                        voter_id: try_get(&row, "voter_id")?,
                        phone_number: try_get(&row, "phone_number")?,
                        photo_reference: try_get(&row, "photo_path")?,
                        status,
                        registered_at: try_get(&row, "registered_at")?,
                    })
                })
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(record)
        }
    }

    // this can be simplified once async functions in traits are usable
    // behind `dyn`
    impl super::Db for SqliteDb {
        fn insert(&self, voter: NewVoter) -> BoxFuture<'_, Result<VoterRecord, BackendError>> {
            async move {
                // released back to the pool on every return path
                let mut connection = self
                    .pool
                    .acquire()
                    .await
                    .map_err(|source| BackendError::DatabaseConnection { source })?;

                // rolled back on drop unless committed
                let mut transaction = connection.begin().await.map_err(map_sqlx_error)?;

                let registered_at = OffsetDateTime::now_utc();
                let query = sqlx::query(include_str!("queries/create_voter.sql"));

                let id = query
                    .bind(&voter.name)
                    .bind(&voter.date_of_birth)
                    .bind(voter.fingerprint.as_str())
                    .bind(&voter.voter_id)
                    .bind(&voter.phone_number)
                    .bind(voter.photo.to_db_string())
                    .bind(VoterStatus::Pending.as_str())
                    .bind(registered_at)
                    .execute(&mut *transaction)
                    .await
                    .map_err(map_sqlx_error)?
                    .last_insert_rowid();

                transaction.commit().await.map_err(map_sqlx_error)?;

                Ok(VoterRecord::new(id, registered_at, voter))
            }
            .boxed()
        }
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Sqlite> + sqlx::decode::Decode<'a, sqlx::Sqlite>>(
        row: &'a SqliteRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::Row;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if matches!(e.kind(), ErrorKind::UniqueViolation) => {
                BackendError::DuplicateRegistration
            }
            _ => BackendError::Sqlx { source: error },
        }
    }

}
