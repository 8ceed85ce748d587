use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use scylla::prepared_statement::PreparedStatement;
use scylla::transport::errors::QueryError;
use scylla::{Session, SessionBuilder};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::astra::{SniTunnels, fetch_metadata};
use crate::bundle::SecureConnectBundle;
use crate::connect::Credentials;
use crate::schema::{CREATE_TABLE, DROP_TABLE, SELECT_ALL, SELECT_ONE, UPSERT};
use crate::store::WordCountStore;
use crate::{Result, StoreError, WordCount};

const SELECT_PEERS: &str = "SELECT host_id, rpc_address FROM system.peers";

/// Cassandra-backed word-count store.
///
/// Dropping the last clone closes the session and its tunnels.
#[derive(Clone, Debug)]
pub struct CassandraWordCountStore {
    session: Arc<Session>,
    upsert: Arc<OnceCell<PreparedStatement>>,
    tunnels: Option<Arc<SniTunnels>>,
}

impl CassandraWordCountStore {
    /// Opens an authenticated session to the cluster a secure connect
    /// bundle describes.
    #[tracing::instrument(skip(credentials), fields(bundle = %credentials.bundle.display()))]
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        let bundle = SecureConnectBundle::open(&credentials.bundle)?;
        let metadata = fetch_metadata(&bundle.metadata_client()?, &bundle.metadata_url()).await?;

        let tunnels = SniTunnels::open(
            &metadata.contact_info.sni_proxy_address,
            &metadata.host_ids()?,
            &bundle.ssl_context()?,
        )
        .await?;

        Self::connect_through(tunnels, credentials).await
    }

    /// Opens a session whose connections all go through `tunnels`.
    ///
    /// A first session, with no translation, only reaches the contact node;
    /// it reads the peers so the second session can route every node.
    pub async fn connect_through(tunnels: SniTunnels, credentials: &Credentials) -> Result<Self> {
        let bootstrap = open_session(&tunnels, credentials, HashMap::new()).await?;
        let peers = discover_peers(&bootstrap).await?;
        drop(bootstrap);

        let session = open_session(&tunnels, credentials, tunnels.translation(&peers)).await?;
        tracing::info!(
            nodes = tunnels.routes().len(),
            peers = peers.len(),
            "connected through SNI proxy"
        );

        Ok(Self {
            session: Arc::new(session),
            upsert: Arc::new(OnceCell::new()),
            tunnels: Some(Arc::new(tunnels)),
        })
    }

    /// Wraps an already established session.
    pub fn from_session(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            upsert: Arc::new(OnceCell::new()),
            tunnels: None,
        }
    }

    /// Gets a reference to the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Gets the tunnels the session connects through, if any.
    pub fn tunnels(&self) -> Option<&SniTunnels> {
        self.tunnels.as_deref()
    }

    async fn execute_ddl(&self, statement: &'static str) -> Result<()> {
        self.session
            .query_unpaged(statement, ())
            .await
            .map_err(|err| StoreError::schema(statement, err))?;
        Ok(())
    }

    async fn prepared_upsert(&self) -> std::result::Result<&PreparedStatement, QueryError> {
        self.upsert
            .get_or_try_init(|| self.session.prepare(UPSERT))
            .await
    }
}

async fn open_session(
    tunnels: &SniTunnels,
    credentials: &Credentials,
    translation: HashMap<SocketAddr, SocketAddr>,
) -> Result<Session> {
    tunnels
        .routes()
        .iter()
        .fold(SessionBuilder::new(), |builder, route| builder.known_node_addr(route.local))
        .user(&credentials.client_id, &credentials.secret)
        .address_translator(Arc::new(translation))
        .build()
        .await
        .map_err(|err| StoreError::Connectivity(Box::new(err)))
}

async fn discover_peers(session: &Session) -> Result<Vec<(Uuid, IpAddr)>> {
    let rows = session
        .query_unpaged(SELECT_PEERS, ())
        .await
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?
        .rows_typed::<(Uuid, Option<IpAddr>)>()
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?;

    Ok(rows
        .into_iter()
        .filter_map(|(host_id, address)| address.map(|address| (host_id, address)))
        .collect())
}

#[async_trait]
impl WordCountStore for CassandraWordCountStore {
    async fn drop_table(&self) -> Result<()> {
        self.execute_ddl(DROP_TABLE).await
    }

    async fn create_table(&self) -> Result<()> {
        self.execute_ddl(CREATE_TABLE).await
    }

    async fn upsert(&self, pair: &WordCount) -> Result<()> {
        let prepared = self
            .prepared_upsert()
            .await
            .map_err(|err| StoreError::write(&pair.word, err))?;

        self.session
            .execute_unpaged(prepared, (pair.word.as_str(), pair.count))
            .await
            .map_err(|err| StoreError::write(&pair.word, err))?;

        metrics::counter!("wordcount_upserts").increment(1);
        Ok(())
    }

    async fn get(&self, word: &str) -> Result<Option<WordCount>> {
        let result = self
            .session
            .query_unpaged(SELECT_ONE, (word,))
            .await
            .map_err(|err| StoreError::Read(Box::new(err)))?;

        let mut rows = result
            .rows_typed::<(String, i64)>()
            .map_err(|err| StoreError::Read(Box::new(err)))?;

        rows.next()
            .transpose()
            .map_err(|err| StoreError::Read(Box::new(err)))
            .map(|row| row.map(WordCount::from))
    }

    async fn all(&self) -> Result<Vec<WordCount>> {
        let result = self
            .session
            .query_unpaged(SELECT_ALL, ())
            .await
            .map_err(|err| StoreError::Read(Box::new(err)))?;

        let mut pairs = result
            .rows_typed::<(String, i64)>()
            .map_err(|err| StoreError::Read(Box::new(err)))?
            .map(|row| row.map(WordCount::from))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| StoreError::Read(Box::new(err)))?;

        // Partition order is token order, not word order.
        pairs.sort_by(|a, b| a.word.cmp(&b.word));
        Ok(pairs)
    }
}
