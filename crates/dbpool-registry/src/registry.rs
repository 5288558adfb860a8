//! Container lifecycle for named data sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use dbpool::{ConnectionFactory, HealthResult, Pool, PoolConfig, PoolError};

use crate::properties::DataSourceProperties;

/// Name of the primary data source when none is specified.
pub const DEFAULT_DATA_SOURCE: &str = "default";

/// All managed data sources of a process, started and stopped together.
///
/// Plays the container's role: every configured pool is constructed
/// eagerly at [`start`](DataSourceRegistry::start) so misconfiguration and
/// unreachable databases abort startup rather than the first request, and
/// [`shutdown_all`](DataSourceRegistry::shutdown_all) is the process-exit
/// hook that always completes.
pub struct DataSourceRegistry {
    pools: BTreeMap<String, Pool>,
}

impl DataSourceRegistry {
    /// Start every configured data source.
    ///
    /// `factories` supplies the backend for each data source, keyed by name
    /// and config (typically dispatching on [`PoolConfig::driver`]). If any
    /// pool fails to start, the ones already started are closed again and
    /// the error is returned; startup is all-or-nothing.
    pub async fn start<P>(
        properties: DataSourceProperties,
        mut factories: P,
    ) -> Result<Self, PoolError>
    where
        P: FnMut(&str, &PoolConfig) -> Arc<dyn ConnectionFactory>,
    {
        let mut pools: BTreeMap<String, Pool> = BTreeMap::new();

        for (name, config) in properties.iter() {
            let factory = factories(name, config);
            match Pool::from_shared(config.clone(), factory).await {
                Ok(pool) => {
                    tracing::info!(datasource = name, "data source started");
                    pools.insert(name.to_string(), pool);
                }
                Err(err) => {
                    tracing::error!(datasource = name, error = %err, "data source failed to start");
                    for (started, pool) in &pools {
                        tracing::info!(datasource = %started, "rolling back started data source");
                        pool.close().await;
                    }
                    return Err(err);
                }
            }
        }

        Ok(Self { pools })
    }

    /// Start every data source with one shared backend factory.
    pub async fn start_with_factory(
        properties: DataSourceProperties,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self, PoolError> {
        Self::start(properties, |_, _| Arc::clone(&factory)).await
    }

    /// Look up a data source by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    /// The primary data source, if one named `default` is configured.
    #[must_use]
    pub fn default_data_source(&self) -> Option<&Pool> {
        self.get(DEFAULT_DATA_SOURCE)
    }

    /// Managed data source names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Number of managed data sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether the registry manages no data sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Probe every data source and collect the results.
    pub async fn health(&self) -> Vec<HealthResult> {
        let mut results = Vec::with_capacity(self.pools.len());
        for (name, pool) in &self.pools {
            results.push(pool.health(name).await);
        }
        results
    }

    /// Close every data source.
    ///
    /// Always completes: per-pool close failures are logged inside the
    /// pool, never raised here. Safe to call more than once.
    pub async fn shutdown_all(&self) {
        for (name, pool) in &self.pools {
            pool.close().await;
            tracing::info!(datasource = %name, "data source stopped");
        }
    }
}

impl std::fmt::Debug for DataSourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceRegistry")
            .field("data_sources", &self.pools.keys().collect::<Vec<_>>())
            .finish()
    }
}
