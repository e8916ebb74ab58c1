//! Content sources: template, file, and HTTP fetch.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use courier_core::error::{CourierError, Result};
use courier_core::traits::ContentSource;
use courier_core::types::{Payload, Recipient};

/// Renders a template per recipient. Placeholders: `{name}`, `{channel}`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, recipient: &Recipient) -> String {
        self.template
            .replace("{name}", &recipient.name)
            .replace("{channel}", recipient.channel.as_deref().unwrap_or(""))
    }
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::new("Hello, {name}")
    }
}

#[async_trait]
impl ContentSource<Recipient, String> for TemplateSource {
    async fn get_content(&self, scheduled: &Recipient) -> Result<String> {
        Ok(self.render(scheduled))
    }
}

/// Same file contents for every item. Read once, at construction.
#[derive(Debug, Clone)]
pub struct FileSource {
    content: String,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CourierError::content(format!("cannot read {}: {e}", path.display())))?;
        tracing::debug!("📄 Loaded content from {} ({} bytes)", path.display(), content.len());
        Ok(Self { content })
    }
}

#[async_trait]
impl<S: Payload> ContentSource<S, String> for FileSource {
    async fn get_content(&self, _scheduled: &S) -> Result<String> {
        Ok(self.content.clone())
    }
}

type Customize<S> = Arc<dyn Fn(&S, reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send + Sync>;
type Transform<C> = Arc<dyn Fn(reqwest::Response) -> BoxFuture<'static, Result<C>> + Send + Sync>;

/// Fetches content over HTTP.
///
/// Plain `GET` unless [`with_request`](Self::with_request) shapes the
/// request per item (method, query, headers, body). By default the response
/// body is the content and a non-2xx status is an error;
/// [`with_response`](Self::with_response) replaces that step.
pub struct FetchSource<S, C = String> {
    url: String,
    client: reqwest::Client,
    customize: Option<Customize<S>>,
    transform: Transform<C>,
    _scheduled: PhantomData<fn(&S)>,
}

impl<S: Payload> FetchSource<S, String> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            customize: None,
            transform: Arc::new(|resp: reqwest::Response| text_body(resp).boxed()),
            _scheduled: PhantomData,
        }
    }
}

impl<S: Payload, C: Payload> FetchSource<S, C> {
    /// Use a preconfigured client (proxies, TLS, default headers).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_request(
        mut self,
        customize: impl Fn(&S, reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send + Sync + 'static,
    ) -> Self {
        self.customize = Some(Arc::new(customize));
        self
    }

    /// Turn the response into content. The transform sees every response,
    /// error statuses included.
    pub fn with_response<D, F, Fut>(self, transform: F) -> FetchSource<S, D>
    where
        D: Payload,
        F: Fn(reqwest::Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<D>> + Send + 'static,
    {
        FetchSource {
            url: self.url,
            client: self.client,
            customize: self.customize,
            transform: Arc::new(move |resp: reqwest::Response| transform(resp).boxed()),
            _scheduled: PhantomData,
        }
    }
}

async fn text_body(resp: reqwest::Response) -> Result<String> {
    let url = resp.url().to_string();
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| CourierError::Http(format!("reading {url} failed: {e}")))?;
    if !status.is_success() {
        return Err(CourierError::content(format!("{url} returned {status}: {body}")));
    }
    Ok(body)
}

#[async_trait]
impl<S: Payload, C: Payload> ContentSource<S, C> for FetchSource<S, C> {
    async fn get_content(&self, scheduled: &S) -> Result<C> {
        let mut request = self.client.get(&self.url).timeout(Duration::from_secs(30));
        if let Some(customize) = &self.customize {
            request = customize(scheduled, request);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| CourierError::Http(format!("fetch {} failed: {e}", self.url)))?;
        (self.transform)(resp).await
    }
}
