//! HTTP/HTTPS storage for remote track locations.
//!
//! Track hubs commonly point at bigWig/bigBed/Hi-C files hosted elsewhere.
//! Sizes come from `HEAD`, content from ranged `GET`.

use super::{ByteRange, LocationStorage};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;

pub struct HttpStorage {
    client: Client,
}

impl HttpStorage {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// HTTP ranges are inclusive; [`ByteRange`] is end-exclusive.
    fn range_header(range: &ByteRange) -> Result<String> {
        match range.end {
            Some(end) if end <= range.start => {
                Err(Error::InvalidRange(format!("{}-{}", range.start, end)))
            }
            Some(end) => Ok(format!("bytes={}-{}", range.start, end - 1)),
            None => Ok(format!("bytes={}-", range.start)),
        }
    }

    /// Servers that ignore `Range` answer 200 with the whole object.
    fn fit_to_range(status: StatusCode, body: Bytes, range: Option<&ByteRange>) -> Result<Bytes> {
        let Some(r) = range else {
            return Ok(body);
        };
        match status {
            StatusCode::PARTIAL_CONTENT => Ok(body),
            StatusCode::OK => {
                let len = body.len() as u64;
                let end = r.end.unwrap_or(len).min(len);
                if r.start >= end {
                    return Err(Error::InvalidRange(format!("{}-{}", r.start, end)));
                }
                Ok(body.slice(r.start as usize..end as usize))
            }
            other => Err(Error::Internal(format!(
                "unexpected status {} for ranged GET",
                other
            ))),
        }
    }
}

#[async_trait]
impl LocationStorage for HttpStorage {
    async fn exists(&self, location: &str) -> bool {
        self.client
            .head(location)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn size(&self, location: &str) -> Result<u64> {
        let response = self
            .client
            .head(location)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("HTTP HEAD request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::NotFound(location.to_string()));
        }

        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::Internal("missing Content-Length header".to_string()))
    }

    async fn read_bytes(&self, location: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let mut request = self.client.get(location);
        if let Some(r) = &range {
            request = request.header(reqwest::header::RANGE, Self::range_header(r)?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Internal(format!("HTTP GET request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(Error::InvalidRange(location.to_string()));
        }
        if !status.is_success() {
            return Err(Error::NotFound(location.to_string()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("failed to read HTTP response: {}", e)))?;
        Self::fit_to_range(status, body, range.as_ref())
    }

    fn local_path(&self, _location: &str) -> Option<PathBuf> {
        None
    }
}
