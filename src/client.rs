use std::{fmt, sync::Arc};

use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::{
    ClientBuilder, ClientOptions, Decode, InspectResponse, Logger, PrepareRequest, Reply, Request,
    RequestContext, Response, RestError, Result, Transport, TransportRequest, TransportResponse,
};

#[derive(Clone)]
/// JSON HTTP client with base URL resolution, default headers, retries and
/// hooks.
///
/// Built once through [`ClientBuilder`] and immutable afterwards; clones
/// share the same transport and hooks.
pub struct RestClient {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    headers: HeaderMap,
    options: ClientOptions,
    logger: Option<Arc<dyn Logger>>,
    pre_send: Option<Arc<dyn PrepareRequest>>,
    post_receive: Option<Arc<dyn InspectResponse>>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.keys().map(|name| name.as_str()).collect();
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("headers", &header_names)
            .field("options", &self.options)
            .field("logger", &self.logger.is_some())
            .field("pre_send", &self.pre_send.is_some())
            .field("post_receive", &self.post_receive.is_some())
            .finish()
    }
}

impl RestClient {
    /// Creates a client with default options and the `reqwest` transport.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        base_url: Option<Url>,
        headers: HeaderMap,
        options: ClientOptions,
        logger: Option<Arc<dyn Logger>>,
        pre_send: Option<Arc<dyn PrepareRequest>>,
        post_receive: Option<Arc<dyn InspectResponse>>,
    ) -> Self {
        Self {
            transport,
            base_url,
            headers,
            options,
            logger,
            pre_send,
            post_receive,
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a GET request and decodes the response into `O`.
    pub async fn get<O: Decode>(
        &self,
        ctx: Option<&RequestContext>,
        url: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<Reply<O>> {
        self.execute::<(), O>(ctx, Method::GET, url, None, headers)
            .await
    }

    /// Sends `body` as JSON with POST and decodes the response into `O`.
    pub async fn post<B, O>(
        &self,
        ctx: Option<&RequestContext>,
        url: &str,
        body: &B,
        headers: Option<&HeaderMap>,
    ) -> Result<Reply<O>>
    where
        B: Serialize + ?Sized,
        O: Decode,
    {
        self.execute(ctx, Method::POST, url, Some(body), headers)
            .await
    }

    /// Sends `body` as JSON with PUT and decodes the response into `O`.
    pub async fn put<B, O>(
        &self,
        ctx: Option<&RequestContext>,
        url: &str,
        body: &B,
        headers: Option<&HeaderMap>,
    ) -> Result<Reply<O>>
    where
        B: Serialize + ?Sized,
        O: Decode,
    {
        self.execute(ctx, Method::PUT, url, Some(body), headers)
            .await
    }

    /// Sends a DELETE request and decodes the response into `O`.
    pub async fn delete<O: Decode>(
        &self,
        ctx: Option<&RequestContext>,
        url: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<Reply<O>> {
        self.execute::<(), O>(ctx, Method::DELETE, url, None, headers)
            .await
    }

    /// Runs the full request pipeline.
    ///
    /// Network failures and non-2xx statuses are retried up to
    /// `max_retries` times with exponential backoff. Hook, serialization,
    /// body read and decode failures end the call immediately, as do
    /// cancellation and an expired deadline.
    ///
    /// Without `ctx`, the call gets a deadline of the configured timeout.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use restwire::{Json, Method, RestClient};
    ///
    /// # async fn run() -> restwire::Result<()> {
    /// let client = RestClient::builder()
    ///     .base_url("https://api.example.com")
    ///     .build()?;
    /// let reply = client
    ///     .execute::<(), Json<serde_json::Value>>(None, Method::GET, "/items/1", None, None)
    ///     .await?;
    /// println!("{:?}", reply.output);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<B, O>(
        &self,
        ctx: Option<&RequestContext>,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Reply<O>>
    where
        B: Serialize + ?Sized,
        O: Decode,
    {
        let context = match ctx {
            Some(ctx) => ctx.clone(),
            None => RequestContext::with_timeout(self.options.timeout()),
        };
        let url = self.resolve_url(url)?;
        let headers = self.merge_headers(headers);
        let encoded = body
            .map(|body| serde_json::to_vec(body).map(Bytes::from))
            .transpose()
            .map_err(RestError::Serialization)?;

        let mut request = Request {
            method,
            url,
            headers,
            body: None,
            context,
        };

        let payload = match &self.pre_send {
            Some(hook) => {
                let view = encoded
                    .as_deref()
                    .map(serde_json::from_slice::<JsonValue>)
                    .transpose()
                    .map_err(RestError::Serialization)?;
                request.body = view.clone();
                hook.prepare_request(&mut request)
                    .map_err(RestError::PreSendHook)?;

                // Untouched bodies go out exactly as encoded from `B`.
                if request.body == view {
                    encoded
                } else {
                    request
                        .body
                        .as_ref()
                        .map(|body| serde_json::to_vec(body).map(Bytes::from))
                        .transpose()
                        .map_err(RestError::Serialization)?
                }
            }
            None => encoded,
        };
        if payload.is_some() && !request.headers.contains_key(header::CONTENT_TYPE) {
            request.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let attempts = self.options.max_retries.saturating_add(1);
        let mut last_response: Option<Box<Response>> = None;
        let mut attempt = 0usize;
        loop {
            request.context.check()?;
            self.log(format_args!(
                "Request: {} {} (attempt {})",
                request.method,
                request.url,
                attempt + 1
            ));

            let transport_request = TransportRequest {
                method: request.method.clone(),
                url: request.url.clone(),
                headers: request.headers.clone(),
                body: payload.clone(),
                timeout: request.context.remaining(),
            };

            let outcome = request
                .context
                .run(self.transport.send(transport_request))
                .await?;
            let failure = match outcome {
                Err(err) => {
                    self.log(format_args!("Request failed: {err}"));
                    RestError::Network(err)
                }
                Ok(transport_response) => {
                    let mut response = self
                        .read_response(&request, transport_response)
                        .await?;

                    if let Some(hook) = &self.post_receive {
                        if let Err(source) = hook.inspect_response(&mut response) {
                            return Err(RestError::PostReceiveHook {
                                source,
                                response: Box::new(response),
                            });
                        }
                    }

                    if response.is_success() {
                        return match O::decode(&response.body) {
                            Ok(output) => Ok(Reply { response, output }),
                            Err(source) => Err(RestError::Decode {
                                source,
                                response: Box::new(response),
                            }),
                        };
                    }

                    let failure = RestError::HttpStatus {
                        status: response.status.as_u16(),
                        body: String::from_utf8_lossy(&response.body).into_owned(),
                    };
                    self.log(format_args!("Request failed: {failure}"));
                    last_response = Some(Box::new(response));
                    failure
                }
            };

            if attempt + 1 >= attempts {
                return Err(RestError::ExhaustedRetries {
                    attempts,
                    last: Box::new(failure),
                    response: last_response,
                });
            }

            self.wait_before_retry(&request.context, attempt).await?;
            attempt += 1;
        }
    }

    async fn read_response(
        &self,
        request: &Request,
        transport_response: TransportResponse,
    ) -> Result<Response> {
        let TransportResponse {
            status,
            headers,
            mut meta,
            body,
        } = transport_response;

        let body = request
            .context
            .run(body.read())
            .await?
            .map_err(|source| RestError::Io {
                source,
                status: status.as_u16(),
            })?;

        if meta.url.is_none() {
            meta.url = Some(request.url.clone());
        }

        Ok(Response {
            status,
            headers,
            body,
            meta,
        })
    }

    fn resolve_url(&self, raw: &str) -> Result<Url> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(raw).map_err(|err| RestError::invalid_url(raw, err)),
                None => Err(RestError::invalid_url(
                    raw,
                    "relative url requires a configured base url",
                )),
            },
            Err(err) => Err(RestError::invalid_url(raw, err)),
        }
    }

    fn merge_headers(&self, overrides: Option<&HeaderMap>) -> HeaderMap {
        let mut merged = self.headers.clone();
        if let Some(overrides) = overrides {
            for name in overrides.keys() {
                merged.remove(name);
                for value in overrides.get_all(name) {
                    merged.append(name.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Sends a line to the configured logger, or to `tracing` when none is
    /// set, so a `TracingLogger` does not emit every line twice.
    fn log(&self, args: fmt::Arguments<'_>) {
        match &self.logger {
            Some(logger) => logger.log(args),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("{}", args);
            }
        }
    }

    /// Waits `retry_backoff_ms * 2^attempt` before the next attempt, giving
    /// up early if the context is cancelled or expires meanwhile.
    async fn wait_before_retry(&self, context: &RequestContext, attempt: usize) -> Result<()> {
        let delay = self.options.backoff_delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying request after {} ms", delay.as_millis());

        if delay.is_zero() {
            return Ok(());
        }
        context.run(tokio::time::sleep(delay)).await
    }
}
