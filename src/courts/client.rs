//! Signed HTTP client for the reservation backend.
//!
//! Every call requires temporary credentials; the signer injects the
//! authorization material and the backend does its own verification. All
//! failures (unconfigured backend, transport, rejection, parse) collapse to
//! `None` with a logged warning, matching the rest of the session plumbing.

use serde_json::json;
use tracing::warn;

use crate::config::BackendConfig;
use crate::session::AwsCredentials;
use crate::signing::{self, RequestDescriptor, SignedRequest};

use super::{is_reservation_record, AvailabilityResponse, ReservationRequest};

#[derive(Debug, Clone)]
pub struct CourtApiClient {
    http: reqwest::Client,
    backend: BackendConfig,
    /// Signing region, shared with the identity configuration.
    region: Option<String>,
}

impl CourtApiClient {
    pub fn new(backend: BackendConfig, region: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            backend,
            region,
        }
    }

    /// Day schedule for the configured court.
    pub async fn availability(
        &self,
        credentials: &AwsCredentials,
        date: &str,
    ) -> Option<AvailabilityResponse> {
        let mut request = self.descriptor("GET", "/availability")?;
        request.query = vec![("date".to_string(), date.to_string())];

        let response = self.execute(self.sign(&request, credentials)?).await?;
        match response.json().await {
            Ok(availability) => Some(availability),
            Err(e) => {
                warn!(error = %e, "availability response malformed");
                None
            }
        }
    }

    /// Book a slot. The backend's response body is opaque to us.
    pub async fn reserve(
        &self,
        credentials: &AwsCredentials,
        reservation: &ReservationRequest,
    ) -> Option<serde_json::Value> {
        let mut request = self.descriptor("POST", "/reservation")?;
        request.headers = vec![("content-type".to_string(), "application/json".to_string())];
        request.body = Some(serde_json::to_string(reservation).expect("reservation serialize"));

        let response = self.execute(self.sign(&request, credentials)?).await?;
        match response.json().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "reservation response malformed");
                None
            }
        }
    }

    /// The caller's reservation records, filtered down from the backend's
    /// mixed listing by sort-key prefix.
    pub async fn reservations(
        &self,
        credentials: &AwsCredentials,
    ) -> Option<Vec<serde_json::Value>> {
        let request = self.descriptor("GET", "/reservationFetch")?;

        let response = self.execute(self.sign(&request, credentials)?).await?;
        let records: Vec<serde_json::Value> = match response.json().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "reservation listing malformed");
                return None;
            }
        };

        Some(records.into_iter().filter(is_reservation_record).collect())
    }

    /// Remove a reservation by id. The backend answers with plain text.
    pub async fn delete_reservation(
        &self,
        credentials: &AwsCredentials,
        reservation_id: &str,
    ) -> Option<String> {
        let mut request = self.descriptor("POST", "/reservationDelete")?;
        request.headers = vec![("content-type".to_string(), "application/json".to_string())];
        request.body = Some(json!({ "reservationId": reservation_id }).to_string());

        let response = self.execute(self.sign(&request, credentials)?).await?;
        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "delete response unreadable");
                None
            }
        }
    }

    fn descriptor(&self, method: &str, path: &str) -> Option<RequestDescriptor> {
        let host = match self.backend.host.clone() {
            Some(host) => host,
            None => {
                warn!("reservation backend not configured; skipping call");
                return None;
            }
        };
        Some(RequestDescriptor {
            method: method.to_string(),
            protocol: self.backend.protocol.clone(),
            host,
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        })
    }

    fn sign(
        &self,
        request: &RequestDescriptor,
        credentials: &AwsCredentials,
    ) -> Option<SignedRequest> {
        let region = match self.region.as_deref() {
            Some(region) => region,
            None => {
                warn!("signing region not configured; skipping call");
                return None;
            }
        };
        Some(signing::sign(
            request,
            credentials,
            region,
            &self.backend.service,
        ))
    }

    async fn execute(&self, signed: SignedRequest) -> Option<reqwest::Response> {
        let method = reqwest::Method::from_bytes(signed.method.as_bytes()).ok()?;
        let mut builder = self.http.request(method, &signed.url);
        for (name, value) in &signed.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = signed.body {
            builder = builder.body(body);
        }

        match builder.send().await {
            Ok(response) if response.status().is_success() => Some(response),
            Ok(response) => {
                warn!(status = %response.status(), "backend rejected signed request");
                None
            }
            Err(e) => {
                warn!(error = %e, "backend request failed");
                None
            }
        }
    }
}
