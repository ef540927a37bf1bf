use std::io::Write;

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::runtime::Runtime;
use tracing::info;

use super::ArtifactSink;

/// Uploads artifacts to an S3 bucket.
///
/// Holds its own single-threaded Tokio runtime so callers stay synchronous.
/// Must not be used from inside another runtime.
pub struct S3Sink {
    runtime: Runtime,
    client: aws_sdk_s3::Client,
    bucket: String,
    key_prefix: String,
    gzip: bool,
}

impl S3Sink {
    /// Builds a client from the standard AWS environment configuration.
    pub fn from_env(bucket: impl Into<String>, key_prefix: impl Into<String>, gzip: bool) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("starting S3 runtime")?;
        let config = runtime.block_on(aws_config::load_from_env());
        let client = aws_sdk_s3::Client::new(&config);

        let bucket = bucket.into();
        info!(bucket = %bucket, gzip, "S3 upload enabled");
        Ok(Self {
            runtime,
            client,
            bucket,
            key_prefix: key_prefix.into(),
            gzip,
        })
    }

    fn key(&self, name: &str) -> String {
        let prefix = self.key_prefix.trim_matches('/');
        let mut key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        if self.gzip {
            key.push_str(".gz");
        }
        key
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

impl ArtifactSink for S3Sink {
    #[tracing::instrument(skip_all, fields(bucket = %self.bucket, name = %name))]
    fn put(&self, name: &str, content_type: &str, bytes: &[u8]) -> Result<String> {
        let key = self.key(name);
        let body = if self.gzip { gzip(bytes)? } else { bytes.to_vec() };

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body));
        if self.gzip {
            request = request.content_encoding("gzip");
        }

        self.runtime
            .block_on(request.send())
            .with_context(|| format!("uploading s3://{}/{key}", self.bucket))?;

        info!(key = %key, "Artifact uploaded");
        Ok(format!("s3://{}/{key}", self.bucket))
    }
}
