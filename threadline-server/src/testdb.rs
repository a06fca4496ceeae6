#![cfg(test)]

use std::{panic::AssertUnwindSafe, path::Path, time::Duration};

use postgresfixture::cluster::ClusterError;

use crate::{create_sqlx_pool, extractors::PgPool, MIGRATOR};

pub const TEST_POOL_SIZE: u32 = 8;

/// Server-side bound on every statement run by tests
pub const TEST_STATEMENT_TIMEOUT: Duration = Duration::from_secs(2);

fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Some(postgresfixture::cluster::Cluster::new(data, runtime?))
}

pub fn new_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed initializing tokio runtime")
}

/// Cluster errors that mean the local postgresql can't host test clusters
fn skip_reason(err: &ClusterError) -> Option<String> {
    match err {
        ClusterError::UnsupportedVersion(v) => {
            Some(format!("postgresql {v} is not supported by postgresfixture"))
        }
        _ => None,
    }
}

/// Runs `test` against a freshly migrated database in a throw-away cluster.
///
/// Tests are skipped when no usable postgresql binaries are on the path.
pub fn with_test_db<F>(name: &str, test: F)
where
    F: FnOnce(&tokio::runtime::Runtime, PgPool),
{
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
    let lockfile = tempfile::tempfile().expect("creating tempfile");
    let datadir = tempfile::tempdir().expect("creating tempdir");
    let datadir_path: &Path = datadir.as_ref();
    let cluster = match build_pg_cluster(datadir_path) {
        Some(cluster) => cluster,
        None => {
            eprintln!("skipping {name}: postgresql seems to not be installed in path");
            return;
        }
    };
    let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
    let outcome = postgresfixture::coordinate::run_and_destroy(
        &cluster,
        lockfile.into(),
        AssertUnwindSafe(|| {
            cluster
                .createdb("test_db")
                .expect("creating test_db database");
            let runtime = new_runtime();
            let pool = runtime.block_on(async move {
                let pool = create_sqlx_pool(
                    &format!("postgresql://?host={}&dbname=test_db", datadir_path),
                    TEST_POOL_SIZE,
                    Duration::from_secs(10),
                    TEST_STATEMENT_TIMEOUT,
                )
                .await
                .expect("creating sqlx pool");
                MIGRATOR
                    .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                    .await
                    .expect("failed applying migrations");
                PgPool::new(pool)
            });
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| test(&runtime, pool.clone())));
            runtime.block_on(pool.close());
            outcome
        }),
    );
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => match skip_reason(&err) {
            Some(reason) => {
                eprintln!("skipping {name}: {reason}");
                return;
            }
            None => panic!("coordinating spinup and shutdown of the pg cluster: {err}"),
        },
    };
    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
}

/// Empties the comments table and restarts its id sequence
pub async fn reset(pool: &PgPool) {
    let mut conn = pool.acquire().await.expect("getting db cleanup connection");
    sqlx::query(include_str!("../reset-test-db.sql"))
        .execute(&mut *conn)
        .await
        .expect("failed cleaning up database");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_postgres_is_skipped() {
        let version = "16.2".parse().unwrap();
        assert!(skip_reason(&ClusterError::UnsupportedVersion(version)).is_some());
        assert!(skip_reason(&ClusterError::InUse).is_none());
    }
}
