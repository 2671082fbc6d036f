//! S3-compatible blob backend.
//!
//! Thin translation onto the AWS SDK: every method maps to exactly one
//! S3 call. Works against AWS proper or any S3-compatible endpoint
//! (MinIO and friends) via `endpoint` + static credentials.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

use super::{BlobError, BlobResult, BlobStore, PartTag};
use crate::config::S3Config;

pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from config and make sure the bucket exists.
    pub async fn new(cfg: &S3Config) -> BlobResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "file-vault-config",
            ));
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let conf = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(conf);

        let store = Self {
            client,
            bucket: cfg.bucket.clone(),
        };
        store.ensure_bucket().await;
        Ok(store)
    }

    /// Best-effort bucket creation for fresh endpoints.
    async fn ensure_bucket(&self) {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return;
        }
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => info!("created bucket `{}`", self.bucket),
            Err(err) => debug!(
                "could not create bucket `{}`: {}",
                self.bucket,
                DisplayErrorContext(err)
            ),
        }
    }
}

fn backend_err<E, R>(err: aws_sdk_s3::error::SdkError<E, R>) -> BlobError
where
    aws_sdk_s3::error::SdkError<E, R>: std::error::Error + 'static,
{
    BlobError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, key: &str, data: Bytes) -> BlobResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        response_filename: &str,
        ttl: Duration,
    ) -> BlobResult<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|err| BlobError::Backend(err.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(format!(
                "attachment; filename=\"{}\"",
                response_filename.replace('"', "")
            ))
            .presigned(presigning)
            .await
            .map_err(backend_err)?;
        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> BlobResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|err| BlobError::Backend(err.to_string()))
            })
            .collect::<BlobResult<Vec<_>>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|err| BlobError::Backend(err.to_string()))?;
        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn create_multipart(
        &self,
        key: &str,
        labels: &[(String, String)],
    ) -> BlobResult<String> {
        let mut request = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key);
        for (name, value) in labels {
            request = request.metadata(name, value);
        }
        let output = request.send().await.map_err(backend_err)?;
        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| BlobError::Backend("create multipart returned no upload id".into()))
    }

    async fn upload_part(
        &self,
        key: &str,
        session: &str,
        part_number: i32,
        data: Bytes,
    ) -> BlobResult<String> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(backend_err)?;
        output
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| BlobError::Backend("upload part returned no tag".into()))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        session: &str,
        parts: &[PartTag],
    ) -> BlobResult<()> {
        let completed = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.tag.as_str())
                    .build()
            })
            .collect::<Vec<_>>();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, session: &str) -> BlobResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session)
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
