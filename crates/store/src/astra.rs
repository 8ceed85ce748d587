//! Astra's connection protocol.
//!
//! The metadata service behind the bundle's `host:port` names an SNI proxy
//! and the host id of every node. A CQL connection reaches a node by
//! opening TLS to the proxy with the node's host id as server name.
//!
//! The driver cannot choose a server name per connection, so each node gets
//! a loopback tunnel: the driver speaks plain CQL to the tunnel, and the
//! tunnel carries it over TLS to the proxy under that node's host id.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use openssl::ssl::{Ssl, SslContext};
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_openssl::SslStream;
use uuid::Uuid;

use crate::{Result, StoreError};

/// Response of the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterMetadata {
    pub version: u32,
    #[serde(default)]
    pub region: Option<String>,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub local_dc: String,
    pub contact_points: Vec<String>,
    pub sni_proxy_address: String,
}

impl ClusterMetadata {
    /// Host ids of the contact points.
    pub fn host_ids(&self) -> Result<Vec<Uuid>> {
        self.contact_info
            .contact_points
            .iter()
            .map(|point| {
                Uuid::parse_str(point).map_err(|err| {
                    StoreError::Connectivity(format!("bad contact point `{point}`: {err}").into())
                })
            })
            .collect()
    }
}

/// Fetches the cluster metadata.
#[tracing::instrument(skip(client))]
pub async fn fetch_metadata(client: &Client, url: &str) -> Result<ClusterMetadata> {
    let metadata = client
        .get(url)
        .send()
        .await
        .and_then(Response::error_for_status)
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?
        .json::<ClusterMetadata>()
        .await
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?;

    tracing::debug!(
        proxy = %metadata.contact_info.sni_proxy_address,
        contact_points = metadata.contact_info.contact_points.len(),
        "fetched cluster metadata"
    );
    Ok(metadata)
}

/// A loopback listener standing in for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub host_id: Uuid,
    pub local: SocketAddr,
}

/// Loopback tunnels to the SNI proxy, one per node. Dropping the value
/// stops accepting; open connections run until either side closes.
#[derive(Debug)]
pub struct SniTunnels {
    routes: Vec<Route>,
    accept_tasks: Vec<JoinHandle<()>>,
}

impl SniTunnels {
    /// Opens a tunnel for every host id.
    pub async fn open(proxy: &str, host_ids: &[Uuid], tls: &SslContext) -> Result<Self> {
        if host_ids.is_empty() {
            return Err(StoreError::Connectivity(
                "cluster metadata lists no contact points".into(),
            ));
        }

        let proxy: Arc<str> = Arc::from(proxy);
        let mut tunnels = Self {
            routes: Vec::with_capacity(host_ids.len()),
            accept_tasks: Vec::with_capacity(host_ids.len()),
        };

        for &host_id in host_ids {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
            let local = listener.local_addr()?;
            tunnels.accept_tasks.push(tokio::spawn(accept_loop(
                listener,
                Arc::clone(&proxy),
                host_id,
                tls.clone(),
            )));
            tunnels.routes.push(Route { host_id, local });
        }

        tracing::debug!(%proxy, tunnels = tunnels.routes.len(), "opened SNI tunnels");
        Ok(tunnels)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The loopback address standing in for a node.
    pub fn local_addr(&self, host_id: Uuid) -> Option<SocketAddr> {
        self.routes
            .iter()
            .find(|route| route.host_id == host_id)
            .map(|route| route.local)
    }

    /// Address translation for the driver, from the peers' reported
    /// addresses to their tunnels. Peers without a tunnel are left out and
    /// the driver skips them.
    ///
    /// A peer is reported with the port of the control connection, which can
    /// be any tunnel, so every tunnel port is mapped.
    pub fn translation(&self, peers: &[(Uuid, IpAddr)]) -> HashMap<SocketAddr, SocketAddr> {
        let mut translation = HashMap::new();
        for &(host_id, address) in peers {
            let Some(target) = self.local_addr(host_id) else {
                tracing::debug!(%host_id, %address, "peer has no tunnel");
                continue;
            };
            for route in &self.routes {
                translation.insert(SocketAddr::new(address, route.local.port()), target);
            }
        }
        translation
    }
}

impl Drop for SniTunnels {
    fn drop(&mut self) {
        for task in &self.accept_tasks {
            task.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, proxy: Arc<str>, host_id: Uuid, tls: SslContext) {
    loop {
        match listener.accept().await {
            Ok((inbound, _)) => {
                let proxy = Arc::clone(&proxy);
                let tls = tls.clone();
                tokio::spawn(async move {
                    if let Err(err) = relay(inbound, &proxy, host_id, &tls).await {
                        tracing::warn!(%host_id, error = %err, "tunnel connection failed");
                    }
                });
            }
            Err(err) => {
                tracing::warn!(%host_id, error = %err, "tunnel stopped accepting");
                return;
            }
        }
    }
}

async fn relay(mut inbound: TcpStream, proxy: &str, host_id: Uuid, tls: &SslContext) -> Result<()> {
    let outbound = TcpStream::connect(proxy)
        .await
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?;

    let mut ssl = Ssl::new(tls)?;
    ssl.set_hostname(&host_id.to_string())?;
    let mut outbound = SslStream::new(ssl, outbound)?;
    Pin::new(&mut outbound)
        .connect()
        .await
        .map_err(|err| StoreError::Connectivity(Box::new(err)))?;

    tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await?;
    Ok(())
}
