//! HTTP backend for a live Nomad cluster.
//!
//! Uses a blocking [`ureq`] agent. Status codes are never turned into
//! transport errors by the agent; every non-2xx response becomes
//! [`Error::Status`] carrying the body, which is where Nomad puts its
//! error message.

use crate::ClientConfig;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    AllocationStub, CsiVolume, CsiVolumeRegisterRequest, Deployment, Evaluation, Job,
    JobDeregisterResponse, JobRegisterRequest, JobRegisterResponse, namespace_or_default,
};
use serde::de::DeserializeOwned;
use ureq::http::Response;
use ureq::{Body, RequestBuilder};

/// Header carrying the ACL token.
const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Nomad HTTP API backend.
pub struct HttpBackend {
    agent: ureq::Agent,
    address: String,
    region: Option<String>,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a backend from client configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            address: config.address.trim_end_matches('/').to_string(),
            region: config.region.clone().filter(|r| !r.is_empty()),
            token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// Get the API address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Build the URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path)
    }

    /// Build the URL for `<collection>/<id>[/<suffix>]`, encoding the id.
    fn object_url(&self, collection: &str, id: &str, suffix: Option<&str>) -> String {
        let id = urlencoding::encode(id);
        match suffix {
            Some(suffix) => self.url(&format!("{collection}/{id}/{suffix}")),
            None => self.url(&format!("{collection}/{id}")),
        }
    }

    /// Add token, region and namespace to a request.
    fn scoped<B>(&self, mut request: RequestBuilder<B>, namespace: Option<&str>) -> RequestBuilder<B> {
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(region) = &self.region {
            request = request.query("region", region);
        }
        if let Some(ns) = namespace {
            request = request.query("namespace", namespace_or_default(ns));
        }
        request
    }

    fn get<T: DeserializeOwned>(&self, url: &str, namespace: Option<&str>) -> Result<T> {
        log::debug!("GET {url}");
        let response = self.scoped(self.agent.get(url), namespace).call()?;
        decode(response)
    }
}

/// Turn a non-success status into an error, keeping the body.
fn check(mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    log::debug!("request failed with status {status}: {}", body.trim());
    Err(Error::status(status, body.trim()))
}

fn decode<T: DeserializeOwned>(response: Response<Body>) -> Result<T> {
    let mut response = check(response)?;
    response
        .body_mut()
        .read_json()
        .map_err(|e| Error::InvalidResponse(e.to_string()))
}

impl Backend for HttpBackend {
    fn register_volume(&self, volume: &CsiVolume, namespace: &str) -> Result<()> {
        let url = self.object_url("volume/csi", &volume.id, None);
        log::debug!("PUT {url}");
        let request = CsiVolumeRegisterRequest { volumes: [volume] };
        let response = self
            .scoped(self.agent.put(&url), Some(namespace))
            .send_json(&request)?;
        check(response).map(|_| ())
    }

    fn deregister_volume(&self, id: &str, namespace: &str) -> Result<()> {
        let url = self.object_url("volume/csi", id, None);
        log::debug!("DELETE {url}");
        let response = self
            .scoped(self.agent.delete(&url), Some(namespace))
            .call()?;
        check(response).map(|_| ())
    }

    fn volume_info(&self, id: &str, namespace: &str) -> Result<CsiVolume> {
        self.get(&self.object_url("volume/csi", id, None), Some(namespace))
    }

    fn register_job(&self, job: &Job, namespace: &str) -> Result<JobRegisterResponse> {
        let url = self.url("jobs");
        log::debug!("POST {url}");
        let response = self
            .scoped(self.agent.post(&url), Some(namespace))
            .send_json(&JobRegisterRequest { job })?;
        decode(response)
    }

    fn deregister_job(&self, id: &str, namespace: &str, purge: bool) -> Result<String> {
        let url = self.object_url("job", id, None);
        log::debug!("DELETE {url} (purge={purge})");
        let response = self
            .scoped(self.agent.delete(&url), Some(namespace))
            .query("purge", if purge { "true" } else { "false" })
            .call()?;
        let resp: JobDeregisterResponse = decode(response)?;
        Ok(resp.eval_id)
    }

    fn job_info(&self, id: &str, namespace: &str) -> Result<Job> {
        self.get(&self.object_url("job", id, None), Some(namespace))
    }

    fn job_allocations(&self, id: &str, namespace: &str) -> Result<Vec<AllocationStub>> {
        let url = self.object_url("job", id, Some("allocations"));
        self.get(&url, Some(namespace))
    }

    fn evaluation_info(&self, id: &str) -> Result<Evaluation> {
        self.get(&self.object_url("evaluation", id, None), None)
    }

    fn deployment_info(&self, id: &str) -> Result<Deployment> {
        self.get(&self.object_url("deployment", id, None), None)
    }
}
