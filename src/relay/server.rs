use super::RelayFeed;
use crate::error::{A2f2dError, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures_util::StreamExt;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const INDEX_HTML: &str = include_str!("index.html");

/// Local HTTP server for the browser relay.
///
/// `GET /` serves a page that plays `/video`; `GET /video` streams the MP4
/// to the first client. Any other path is a 400.
pub struct RelayServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RelayServer {
    /// Bind `addr` and start serving in the background.
    pub async fn start(addr: SocketAddr, feed: RelayFeed) -> Result<Self> {
        let bind_error = |e: std::io::Error| A2f2dError::RelayBind {
            port: addr.port(),
            message: e.to_string(),
        };
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router(feed)).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Browser relay stopped");
            }
        });

        tracing::info!("Browser relay on http://{}", addr);
        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for open ones to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Browser relay task ended abnormally");
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}

fn router(feed: RelayFeed) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video", get(video))
        .fallback(bad_request)
        .with_state(feed)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn video(State(feed): State<RelayFeed>) -> Response {
    match feed.claim() {
        Some(stream) => {
            tracing::info!("Browser connected to video stream");
            let body = Body::from_stream(stream.map(Ok::<_, Infallible>));
            ([(header::CONTENT_TYPE, "video/mp4")], body).into_response()
        }
        None => (StatusCode::CONFLICT, "video stream already claimed").into_response(),
    }
}

async fn bad_request() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "bad request")
}
