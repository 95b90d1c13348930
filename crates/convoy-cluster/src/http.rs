//! HTTP implementation of the cluster capability.
//!
//! Speaks a small JSON/REST dialect to a fleet-style scheduler:
//!
//! - `GET /v1/units` — cluster-wide unit listing
//! - `GET /v1/state` — fine-grained unit sub-states
//! - `GET /v1/units/{name}` — raw unit file
//! - `PUT /v1/units/{name}` — set desired state / register a new unit
//! - `DELETE /v1/units/{name}` — permanently remove a unit
//!
//! Connections are opened per request; the engine issues calls strictly
//! sequentially, so there is nothing to pool.

use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ClusterApi, DesiredState, UnitListing, UnitStateRecord};
use crate::error::{ClusterError, ClusterResult};

/// HTTP client for a fleet-style scheduler endpoint.
#[derive(Debug)]
pub struct HttpClusterClient {
    /// Endpoint as given, for error messages.
    endpoint: String,
    /// host:port extracted from the endpoint.
    authority: String,
}

#[derive(Deserialize)]
struct UnitsPage {
    units: Vec<UnitListing>,
}

#[derive(Deserialize)]
struct StatesPage {
    states: Vec<UnitStateRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDetail {
    unit_file: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DesiredStateRequest {
    desired_state: DesiredState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUnitRequest<'a> {
    desired_state: DesiredState,
    unit_file: &'a str,
}

impl HttpClusterClient {
    /// Connect to a scheduler endpoint.
    ///
    /// Performs one probe request so that an unreachable or misconfigured
    /// scheduler surfaces here, before any planning or mutation happens.
    /// The caller decides whether that is fatal.
    pub async fn connect(endpoint: &str) -> ClusterResult<Self> {
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|_| ClusterError::Endpoint(endpoint.to_string()))?;
        if uri.scheme_str() != Some("http") {
            return Err(ClusterError::Endpoint(endpoint.to_string()));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| ClusterError::Endpoint(endpoint.to_string()))?
            .to_string();

        let client = Self {
            endpoint: endpoint.to_string(),
            authority,
        };
        client.send(Method::GET, "/v1/units", None).await?;
        Ok(client)
    }

    /// Issue one request and collect the response body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> ClusterResult<Bytes> {
        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|e| ClusterError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ClusterError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header("host", &self.authority)
            .header("user-agent", "convoy/0.1");
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let req = builder
            .body(Full::new(body.map(Bytes::from).unwrap_or_default()))
            .map_err(|e| ClusterError::Request(e.to_string()))?;

        debug!(%method, path, "cluster request");
        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClusterError::Request(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            return Err(ClusterError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(bytes)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClusterResult<T> {
        let bytes = self.send(Method::GET, path, None).await?;
        serde_json::from_slice(&bytes).map_err(|e| ClusterError::Decode(e.to_string()))
    }

    async fn put_json<T: Serialize>(&self, path: &str, payload: &T) -> ClusterResult<()> {
        let body = serde_json::to_vec(payload).map_err(|e| ClusterError::Decode(e.to_string()))?;
        self.send(Method::PUT, path, Some(body)).await?;
        Ok(())
    }
}

impl ClusterApi for HttpClusterClient {
    async fn list_units(&self) -> ClusterResult<Vec<UnitListing>> {
        let page: UnitsPage = self.get_json("/v1/units").await?;
        Ok(page.units)
    }

    async fn list_unit_states(&self) -> ClusterResult<Vec<UnitStateRecord>> {
        let page: StatesPage = self.get_json("/v1/state").await?;
        Ok(page.states)
    }

    async fn set_desired_state(&self, name: &str, state: DesiredState) -> ClusterResult<()> {
        self.put_json(
            &format!("/v1/units/{name}"),
            &DesiredStateRequest {
                desired_state: state,
            },
        )
        .await
    }

    async fn create_unit(&self, name: &str, template: &str) -> ClusterResult<()> {
        self.put_json(
            &format!("/v1/units/{name}"),
            &CreateUnitRequest {
                desired_state: DesiredState::Launched,
                unit_file: template,
            },
        )
        .await
    }

    async fn destroy_unit(&self, name: &str) -> ClusterResult<()> {
        self.send(Method::DELETE, &format!("/v1/units/{name}"), None)
            .await?;
        Ok(())
    }

    async fn get_unit(&self, name: &str) -> ClusterResult<String> {
        let detail: UnitDetail = self.get_json(&format!("/v1/units/{name}")).await?;
        Ok(detail.unit_file)
    }
}
