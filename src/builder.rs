use std::{fmt, sync::Arc, time::Duration};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{
    ClientOptions, InspectResponse, Logger, PrepareRequest, ReqwestTransport, RestClient,
    RestError, Result, Transport,
};

/// Fluent configuration for a [`RestClient`].
///
/// Everything is set here, before the client exists; the built client is
/// immutable and can be cloned and shared across tasks.
#[derive(Default)]
pub struct ClientBuilder {
    options: ClientOptions,
    base_url: Option<String>,
    headers: Vec<(String, String)>,
    logger: Option<Arc<dyn Logger>>,
    pre_send: Option<Arc<dyn PrepareRequest>>,
    post_receive: Option<Arc<dyn InspectResponse>>,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("base_url", &self.base_url)
            .field("headers", &header_names)
            .field("logger", &self.logger.is_some())
            .field("pre_send", &self.pre_send.is_some())
            .field("post_receive", &self.post_receive.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from environment configuration.
    ///
    /// Reads `RESTWIRE_BASE_URL` in addition to the variables read by
    /// [`ClientOptions::from_env`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use restwire::ClientBuilder;
    ///
    /// let client = ClientBuilder::from_env()
    ///     .expect("invalid RESTWIRE_* env vars")
    ///     .build()
    ///     .expect("client must build");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut builder = Self::new().options(ClientOptions::from_env()?);
        if let Ok(base_url) = std::env::var("RESTWIRE_BASE_URL") {
            if !base_url.trim().is_empty() {
                builder = builder.base_url(base_url.trim());
            }
        }
        Ok(builder)
    }

    /// Replaces timeout and retry settings wholesale.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Default deadline for calls made without a request context.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Adds a default header, replacing any earlier value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Base that relative request URLs are resolved against.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    /// Base delay for exponential backoff between attempts.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.options.retry_backoff_ms = duration_to_millis(backoff);
        self
    }

    pub fn pre_send(mut self, hook: impl PrepareRequest + 'static) -> Self {
        self.pre_send = Some(Arc::new(hook));
        self
    }

    pub fn post_receive(mut self, hook: impl InspectResponse + 'static) -> Self {
        self.post_receive = Some(Arc::new(hook));
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<RestClient> {
        let base_url = self.base_url.as_deref().map(parse_base_url).transpose()?;
        let headers = build_header_map(&self.headers)?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(RestError::Transport)?),
        };

        Ok(RestClient::from_parts(
            transport,
            base_url,
            headers,
            self.options,
            self.logger,
            self.pre_send,
            self.post_receive,
        ))
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|err| RestError::invalid_url(raw, err))?;
    if url.cannot_be_a_base() {
        return Err(RestError::invalid_url(raw, "url cannot be used as a base"));
    }
    Ok(url)
}

fn build_header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| RestError::InvalidHeader {
                name: name.clone(),
                reason: err.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| RestError::InvalidHeader {
            name: name.clone(),
            reason: err.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
