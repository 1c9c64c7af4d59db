//! Device agent API
//!
//! One method per agent action. Every method except the log stream goes
//! through [`run_with_retry`] with the client's retry policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::{
    ContainerIdResponse, DeviceInfo, DeviceInfoResponse, StatusSnapshot, TargetStateResponse,
    VersionResponse, STATUS_SUCCESS,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::errors::{AgentError, ApiError};
use crate::http::client::{Body, HttpClient, RequestDescriptor};
use crate::http::endpoints::Endpoint;
use crate::http::log_stream::LogStream;
use crate::options::{ClientOptions, DeviceAddress};
use crate::retry::{run_with_retry, RetryPolicy};

/// Device agent API trait for testability
#[async_trait]
pub trait DeviceApiExt: Send + Sync {
    /// Push a new target state to the device
    async fn set_target_state(&self, state: &Value) -> Result<(), ApiError>;

    /// Get the target state the device is applying
    async fn get_target_state(&self) -> Result<Value, ApiError>;

    /// Get device type and architecture
    async fn get_device_information(&self) -> Result<DeviceInfo, ApiError>;

    /// Get the id of the container running the given service
    async fn get_container_id(&self, service_name: &str) -> Result<String, ApiError>;

    /// Check that the agent is answering
    async fn ping(&self) -> Result<(), ApiError>;

    /// Get the agent version
    async fn get_version(&self) -> Result<String, ApiError>;

    /// Get the application status snapshot
    async fn get_status(&self) -> Result<StatusSnapshot, ApiError>;

    /// Open the live log stream. Not retried.
    async fn get_log_stream(&self) -> Result<LogStream, ApiError>;
}

/// Client for a single device agent
#[derive(Debug, Clone)]
pub struct DeviceApi {
    http_client: HttpClient,
    address: Arc<DeviceAddress>,
    base_url: Arc<Url>,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl DeviceApi {
    /// Create a new client
    pub fn new(options: ClientOptions) -> Result<Self, AgentError> {
        let base_url = options.address.base_url()?;
        let http_client = HttpClient::new(options.connect_timeout)?;

        info!("Device agent client for {}", base_url);

        Ok(Self {
            http_client,
            address: Arc::new(options.address),
            base_url: Arc::new(base_url),
            retry_policy: options.retry,
            request_timeout: options.request_timeout,
            cancel: CancellationToken::new(),
        })
    }

    /// A client whose operations stop as soon as `cancel` fires
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url, ApiError> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| ApiError::Generic(format!("invalid endpoint URL: {}", e)))
    }

    /// Run the request under the retry policy, extracting the result from
    /// each successful response inside the retried operation
    async fn fetch<T, F>(
        &self,
        label: &str,
        descriptor: RequestDescriptor,
        extract: F,
    ) -> Result<T, ApiError>
    where
        F: Fn(Body) -> Result<T, ApiError>,
    {
        let descriptor = &descriptor.timeout(self.request_timeout);
        let extract = &extract;
        let http_client = &self.http_client;

        run_with_retry(label, &self.retry_policy, &self.cancel, || async move {
            extract(http_client.send(descriptor).await?)
        })
        .await
    }
}

#[async_trait]
impl DeviceApiExt for DeviceApi {
    async fn set_target_state(&self, state: &Value) -> Result<(), ApiError> {
        let url = self.url(Endpoint::SetTargetState)?;
        let descriptor = RequestDescriptor::post(url, state.clone()).raw();
        self.fetch("set target state", descriptor, |_| Ok(())).await
    }

    async fn get_target_state(&self) -> Result<Value, ApiError> {
        let url = self.url(Endpoint::GetTargetState)?;
        self.fetch("get target state", RequestDescriptor::get(url), |body| {
            let response: TargetStateResponse = parse_json(body)?;
            Ok(response.state)
        })
        .await
    }

    async fn get_device_information(&self) -> Result<DeviceInfo, ApiError> {
        let url = self.url(Endpoint::GetDeviceInformation)?;
        self.fetch("get device information", RequestDescriptor::get(url), |body| {
            let response: DeviceInfoResponse = parse_json(body)?;
            Ok(response.info)
        })
        .await
    }

    async fn get_container_id(&self, service_name: &str) -> Result<String, ApiError> {
        let url = self.url(Endpoint::ContainerId)?;
        let descriptor = RequestDescriptor::get(url).query("serviceName", service_name);
        let label = format!("get container id for {}", service_name);
        self.fetch(&label, descriptor, |body| {
            let response: ContainerIdResponse = parse_json(body)?;
            ensure_success(&response.status)?;
            response
                .container_id
                .ok_or_else(|| missing_field("containerId"))
        })
        .await
    }

    async fn ping(&self) -> Result<(), ApiError> {
        let url = self.url(Endpoint::Ping)?;
        self.fetch("ping", RequestDescriptor::get(url).raw(), |_| Ok(()))
            .await
    }

    async fn get_version(&self) -> Result<String, ApiError> {
        let url = self.url(Endpoint::Version)?;
        self.fetch("get version", RequestDescriptor::get(url), |body| {
            let response: VersionResponse = parse_json(body)?;
            ensure_success(&response.status)?;
            response.version.ok_or_else(|| missing_field("version"))
        })
        .await
    }

    async fn get_status(&self) -> Result<StatusSnapshot, ApiError> {
        let url = self.url(Endpoint::Status)?;
        self.fetch("get status", RequestDescriptor::get(url), |body| {
            let mut object = match body.into_json()? {
                Value::Object(object) => object,
                other => {
                    return Err(ApiError::Generic(format!(
                        "expected a JSON object, got {}",
                        other
                    )))
                }
            };
            match object.remove("status") {
                Some(Value::String(status)) => ensure_success(&status)?,
                _ => return Err(non_successful()),
            }
            Ok(serde_json::from_value(Value::Object(object))?)
        })
        .await
    }

    async fn get_log_stream(&self) -> Result<LogStream, ApiError> {
        let url = self.url(Endpoint::Logs)?;
        let descriptor = RequestDescriptor::get(url).raw();

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            response = self.http_client.open(&descriptor) => response?,
        };
        Ok(LogStream::new(response))
    }
}

fn parse_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    Ok(serde_json::from_value(body.into_json()?)?)
}

fn non_successful() -> ApiError {
    ApiError::Generic("non-successful response from endpoint".to_string())
}

fn ensure_success(status: &str) -> Result<(), ApiError> {
    if status == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(non_successful())
    }
}

fn missing_field(field: &str) -> ApiError {
    ApiError::Generic(format!("response is missing `{}`", field))
}
