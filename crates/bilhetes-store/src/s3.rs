use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;

use crate::{content_type_for_key, ObjectStore, StoreConfig, StoreError};

pub struct S3Store {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let endpoint = config.endpoint_url.clone().unwrap_or_default();
        let region = Region::Custom {
            region: config.region.clone().unwrap_or_else(|| "us-east-1".into()),
            endpoint: endpoint.clone(),
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Internal(format!("credentials: {e}")))?;

        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| StoreError::Internal("bucket name required".into()))?;

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StoreError::Internal(format!("bucket: {e}")))?;
        bucket.set_path_style();

        // Path-style bucket URL unless a public prefix (CDN, proxy) is configured.
        let public_base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/{bucket_name}", endpoint.trim_end_matches('/')))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bucket,
            public_base_url,
        })
    }
}

fn map_s3_error(e: S3Error) -> StoreError {
    StoreError::Internal(format!("s3: {e}"))
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let content_type = content_type_for_key(key);
        self.bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(map_s3_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let response = self.bucket.get_object(key).await.map_err(map_s3_error)?;
        if response.status_code() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if response.status_code() >= 400 {
            return Err(StoreError::Internal(format!(
                "s3 get {}: status {}",
                key,
                response.status_code()
            )));
        }
        Ok(Bytes::from(response.to_vec()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.bucket.delete_object(key).await.map_err(map_s3_error)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let results = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(map_s3_error)?;

        let mut keys: Vec<String> = results
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            endpoint_url: Some("http://localhost:9000/".into()),
            region: Some("sa-east-1".into()),
            bucket: Some("imagens".into()),
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_bucket_produces_error() {
        let config = StoreConfig {
            bucket: None,
            ..config()
        };
        let err = S3Store::new(&config).unwrap_err();
        assert!(err.to_string().contains("bucket name required"));
    }

    #[test]
    fn public_url_defaults_to_path_style_bucket() {
        let store = S3Store::new(&config()).unwrap();
        assert_eq!(
            store.public_url("tickets/a/1-x.png"),
            "http://localhost:9000/imagens/tickets/a/1-x.png"
        );
    }

    #[test]
    fn public_url_honours_override() {
        let store = S3Store::new(&StoreConfig {
            public_base_url: Some("https://cdn.example.com/".into()),
            ..config()
        })
        .unwrap();
        assert_eq!(
            store.public_url("tickets/a/1-x.png"),
            "https://cdn.example.com/tickets/a/1-x.png"
        );
    }

    // -- Integration (requires a running S3-compatible server) --

    #[tokio::test]
    #[ignore]
    async fn s3_put_get_delete() {
        let config = StoreConfig::from_env();
        assert!(config.is_s3(), "S3 not configured");
        let store = S3Store::new(&config).unwrap();
        let key = "integration-test/1-roundtrip.png";

        store.put(key, Bytes::from("png bytes")).await.unwrap();
        assert_eq!(store.get(key).await.unwrap().as_ref(), b"png bytes");

        store.delete(key).await.unwrap();
        assert!(matches!(
            store.get(key).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
