use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|_| anyhow!("Invalid API key value"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| anyhow!("Invalid authorization token value"))?,
            );
        }

        Ok(headers)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Conflict: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        let response = self.execute(method, path, auth_token, body, None).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let response = self.execute(method, path, auth_token, body, extra_headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// For provider endpoints that answer 204 (logout, recover).
    pub async fn request_no_content(&self, method: Method, path: &str,
                                    auth_token: Option<&str>, body: Option<Value>)
                                    -> Result<()> {
        self.execute(method, path, auth_token, body, None).await?;
        Ok(())
    }

    /// Insert rows and get the created representation back.
    pub async fn insert_returning<T>(&self, path: &str, auth_token: Option<&str>,
                                     body: Value) -> Result<T>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        self.request_with_headers(Method::POST, path, auth_token, Some(body), Some(headers)).await
    }

    /// Upsert keyed on the primary key, returning the stored representation.
    pub async fn upsert_returning<T>(&self, path: &str, auth_token: Option<&str>,
                                     body: Value) -> Result<T>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        self.request_with_headers(Method::POST, path, auth_token, Some(body), Some(headers)).await
    }

    /// Patch matching rows and get the updated representation back.
    pub async fn update_returning<T>(&self, path: &str, auth_token: Option<&str>,
                                     body: Value) -> Result<T>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        self.request_with_headers(Method::PATCH, path, auth_token, Some(body), Some(headers)).await
    }

    /// Delete matching rows. A row that is already gone is not an error:
    /// the expiry sweep and user actions may race on the same meeting.
    pub async fn delete(&self, path: &str, auth_token: Option<&str>) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Deleting {}", url);

        let headers = self.get_headers(auth_token)?;
        let response = self.client.delete(&url).headers(headers).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Delete target already gone: {}", path);
            return Ok(());
        }
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(anyhow!("API error ({}): {}", status, error_text));
        }

        Ok(())
    }

    /// Request authorized with the service-role key, for work that runs
    /// outside any user session (the meeting expiry sweep).
    pub async fn service_request<T>(&self, method: Method, path: &str,
                                    body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        if self.service_role_key.is_empty() {
            return Err(anyhow!("Service role key is not configured"));
        }
        let key = self.service_role_key.clone();
        self.request(method, path, Some(key.as_str()), body).await
    }

    pub async fn service_delete(&self, path: &str) -> Result<()> {
        if self.service_role_key.is_empty() {
            return Err(anyhow!("Service role key is not configured"));
        }
        let key = self.service_role_key.clone();
        self.delete(path, Some(key.as_str())).await
    }

    /// Upload raw bytes to a storage bucket. Overwrites any existing object
    /// under the same key (re-applications replace the old license image).
    pub async fn upload_object(&self, bucket: &str, object: &str,
                               bytes: Vec<u8>, content_type: &str,
                               auth_token: &str) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, object);
        debug!("Uploading object to {}", url);

        let response = self.client.post(&url)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", auth_token))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Storage upload error ({}): {}", status, error_text);
            return Err(anyhow!("Storage upload error ({}): {}", status, error_text));
        }

        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL for an uploaded storage object.
    pub fn public_object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, object)
    }
}
