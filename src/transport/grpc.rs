use super::{AnimateTransport, ChannelSecurity, InboundStream, OutboundStream};
use crate::error::{A2f2dError, Result};
use crate::proto::audio2_face2_d_service_client::Audio2Face2DServiceClient;
use futures_util::{StreamExt, stream};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::{Code, Status};

/// `Animate` over a tonic HTTP/2 channel.
pub struct GrpcTransport {
    client: Audio2Face2DServiceClient<Channel>,
    target: String,
}

impl GrpcTransport {
    /// Connect to `target` (`host:port` or a full URI).
    ///
    /// No call is made yet; a server that accepts the connection but never
    /// answers is only noticed once the session reads the inbound stream.
    pub async fn connect(target: &str, security: &ChannelSecurity) -> Result<Self> {
        let endpoint = endpoint(target, security)?;
        tracing::info!(target, security = %security.mode(), "Connecting");

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| A2f2dError::Connect {
                target: target.to_string(),
                message: error_chain(&e),
            })?;

        tracing::debug!(target, "Channel established");
        Ok(Self {
            client: Audio2Face2DServiceClient::new(channel),
            target: target.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AnimateTransport for GrpcTransport {
    async fn open(&mut self, outbound: OutboundStream) -> Result<InboundStream> {
        let mut client = self.client.clone();

        // The call future resolves only after response headers arrive, which
        // may need request data first. Polling it lazily from the inbound
        // stream lets the session keep feeding the upload meanwhile.
        let call = async move {
            client
                .animate(tonic::Request::new(outbound))
                .await
                .map(tonic::Response::into_inner)
        };

        let inbound = stream::once(call).flat_map(|started| match started {
            Ok(responses) => responses.left_stream(),
            Err(status) => stream::iter(std::iter::once(Err(dead_channel_as_unavailable(status))))
                .right_stream(),
        });

        Ok(Box::pin(inbound))
    }

    fn name(&self) -> &str {
        &self.target
    }
}

/// Build the endpoint URI and TLS settings for `security`.
fn endpoint(target: &str, security: &ChannelSecurity) -> Result<Endpoint> {
    let scheme = match security {
        ChannelSecurity::Disabled => "http",
        _ => "https",
    };
    let uri = if target.contains("://") {
        target.to_string()
    } else {
        format!("{}://{}", scheme, target)
    };

    let invalid = |message: String| A2f2dError::ConfigInvalidValue {
        key: "target".to_string(),
        message,
    };

    let endpoint = Channel::from_shared(uri.clone())
        .map_err(|e| invalid(format!("'{}' is not a valid URI: {}", uri, e)))?;

    let tls = match security {
        ChannelSecurity::Disabled => return Ok(endpoint),
        ChannelSecurity::ServerAuth { root_cert } => {
            ClientTlsConfig::new().ca_certificate(Certificate::from_pem(root_cert))
        }
        ChannelSecurity::MutualAuth {
            root_cert,
            client_cert,
            client_key,
        } => ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(root_cert))
            .identity(Identity::from_pem(client_cert, client_key)),
    };

    endpoint
        .tls_config(tls)
        .map_err(|e| invalid(format!("TLS setup failed: {}", error_chain(&e))))
}

/// The generated client reports a channel that can no longer take calls as
/// `Unknown` with no source. That is a transport failure, not a server one.
fn dead_channel_as_unavailable(status: Status) -> Status {
    if status.code() == Code::Unknown && status.message().starts_with("Service was not ready") {
        Status::unavailable(status.message().to_string())
    } else {
        status
    }
}

/// `Display` of `err` followed by each source, colon separated.
///
/// tonic's transport errors say little on their own; the cause is in the
/// source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
