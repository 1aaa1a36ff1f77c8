//! Pool setup for the configuration store.

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::Result;

/// Builds the pool options a configuration store connects with.
pub(crate) fn pool_options(config: &PostgresConfig) -> Result<PoolOptions<Postgres>> {
    config.validate()?;

    Ok(PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(config.min_connections())
        .acquire_timeout(config.connect_timeout())
        .max_lifetime(config.max_lifetime())
        .idle_timeout(config.idle_timeout()))
}

/// Opens the pool. Fails when the first connection cannot be established
/// within `connect_timeout_ms`.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub(crate) async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    let options = pool_options(config)?;
    info!(
        pool_size = config.pool_size,
        min_connections = config.min_connections(),
        connect_timeout_ms = config.connect_timeout_ms,
        "Connecting to the configuration database"
    );

    let pool = options.connect(&config.url).await?;
    debug!(open = pool.size(), "Configuration database pool ready");
    Ok(pool)
}

/// Replaces the password of a database URL with `****`.
pub fn mask_password(url: &str) -> String {
    let Some(at) = url.find('@') else {
        return url.to_string();
    };
    let userinfo_start = url.find("://").map_or(0, |p| p + 3);
    match url[userinfo_start..at].find(':') {
        Some(colon) => {
            let colon = userinfo_start + colon;
            format!("{}:****{}", &url[..colon], &url[at..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://app:secret@db:5432/config"),
            "postgres://app:****@db:5432/config"
        );
        assert_eq!(mask_password("postgres://db/config"), "postgres://db/config");
        assert_eq!(
            mask_password("postgres://app@db/config"),
            "postgres://app@db/config"
        );
    }

    #[test]
    fn test_pool_options_follow_config() {
        let mut config = PostgresConfig::new("postgres://db/config").with_pool_size(3);
        config.idle_timeout_ms = None;

        let options = pool_options(&config).unwrap();
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(1800)));
        assert_eq!(options.get_idle_timeout(), None);
    }

    #[test]
    fn test_invalid_config_never_builds_a_pool() {
        let config = PostgresConfig::new("postgres://db/config").with_pool_size(0);
        assert!(pool_options(&config).is_err());
    }
}
