//! Secure connect bundle: the zip archive a managed cluster hands out with
//! its endpoint description and TLS material.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use openssl::pkey::PKey;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};
use openssl::x509::X509;
use reqwest::{Certificate, Client, Identity};
use serde::Deserialize;
use zip::ZipArchive;

use crate::{Result, StoreError};

const CONFIG_ENTRY: &str = "config.json";
const CA_ENTRY: &str = "ca.crt";
const CERT_ENTRY: &str = "cert";
const KEY_ENTRY: &str = "key";

/// Endpoint description stored as `config.json` inside the bundle.
///
/// `port` serves the cluster metadata over mutual TLS. Connections go to the
/// SNI proxy the metadata names, not to `cql_port`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BundleConfig {
    pub host: String,
    pub port: u16,
    pub cql_port: u16,
    #[serde(default)]
    pub keyspace: Option<String>,
    #[serde(default, rename = "localDC")]
    pub local_dc: Option<String>,
}

/// A parsed secure connect bundle.
pub struct SecureConnectBundle {
    config: BundleConfig,
    ca_cert: Vec<u8>,
    cert: Vec<u8>,
    key: Vec<u8>,
}

impl SecureConnectBundle {
    /// Reads a bundle from a zip file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            StoreError::Bundle(format!("cannot open {}: {err}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Reads a bundle from any seekable zip source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|err| StoreError::Bundle(format!("not a zip archive: {err}")))?;

        let config: BundleConfig = serde_json::from_slice(&read_entry(&mut archive, CONFIG_ENTRY)?)?;
        let ca_cert = read_entry(&mut archive, CA_ENTRY)?;
        let cert = read_entry(&mut archive, CERT_ENTRY)?;
        let key = read_entry(&mut archive, KEY_ENTRY)?;

        tracing::debug!(host = %config.host, port = config.port, "loaded secure connect bundle");

        Ok(Self {
            config,
            ca_cert,
            cert,
            key,
        })
    }

    /// Returns the endpoint description.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Returns the URL of the metadata service.
    pub fn metadata_url(&self) -> String {
        format!("https://{}:{}/metadata", self.config.host, self.config.port)
    }

    /// Builds an HTTP client for the metadata service: it trusts the
    /// bundle's CA and presents the bundle's client certificate.
    pub fn metadata_client(&self) -> Result<Client> {
        // reqwest only takes PKCS#8 keys; bundles may carry PKCS#1.
        let key = PKey::private_key_from_pem(&self.key)?.private_key_to_pem_pkcs8()?;
        let identity = Identity::from_pkcs8_pem(&self.cert, &key)
            .map_err(|err| StoreError::Bundle(format!("unusable client certificate: {err}")))?;
        let ca = Certificate::from_pem(&self.ca_cert)
            .map_err(|err| StoreError::Bundle(format!("unusable CA certificate: {err}")))?;

        Client::builder()
            .add_root_certificate(ca)
            .identity(identity)
            .build()
            .map_err(|err| StoreError::Connectivity(Box::new(err)))
    }

    /// Builds a client TLS context that trusts the bundle's CA and presents
    /// its client certificate.
    pub fn ssl_context(&self) -> Result<SslContext> {
        let mut builder = SslContextBuilder::new(SslMethod::tls())?;

        let ca = X509::from_pem(&self.ca_cert)?;
        builder.cert_store_mut().add_cert(ca)?;

        let cert = X509::from_pem(&self.cert)?;
        builder.set_certificate(&cert)?;

        let key = PKey::private_key_from_pem(&self.key)?;
        builder.set_private_key(&key)?;
        builder.check_private_key()?;

        builder.set_verify(SslVerifyMode::PEER);
        Ok(builder.build())
    }
}

impl std::fmt::Debug for SecureConnectBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureConnectBundle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| StoreError::Bundle(format!("missing entry `{name}`: {err}")))?;
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|err| StoreError::Bundle(format!("cannot read entry `{name}`: {err}")))?;
    Ok(contents)
}
